// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Runner tests driving real WASI guests written in WAT.

use std::path::PathBuf;

use super::*;
use tempfile::TempDir;

/// Write a WAT guest next to the sandbox and hand back its path.
/// `Module::new` accepts WAT text directly.
fn guest(dir: &TempDir, wat: &str) -> PathBuf {
    let path = dir.path().join("module.wat");
    std::fs::write(&path, wat).expect("write guest");
    path
}

fn data_dir(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("data");
    std::fs::create_dir_all(&path).expect("create data dir");
    path
}

const EXIT_7: &str = r#"
(module
  (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
  (memory (export "memory") 1)
  (func (export "_start") (call $exit (i32.const 7))))
"#;

const RETURN_NORMALLY: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "_start")))
"#;

const WRITE_STDOUT_STDERR: &str = r#"
(module
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 16) "TO_STDOUT")
  (data (i32.const 32) "TO_STDERR")
  (func (export "_start")
    (i32.store (i32.const 0) (i32.const 16))
    (i32.store (i32.const 4) (i32.const 9))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 8)))
    (i32.store (i32.const 0) (i32.const 32))
    (i32.store (i32.const 4) (i32.const 9))
    (drop (call $fd_write (i32.const 2) (i32.const 0) (i32.const 1) (i32.const 8)))))
"#;

const ECHO_STDIN: &str = r#"
(module
  (import "wasi_snapshot_preview1" "fd_read"
    (func $fd_read (param i32 i32 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (func (export "_start")
    ;; read up to 256 bytes of stdin into offset 1024
    (i32.store (i32.const 0) (i32.const 1024))
    (i32.store (i32.const 4) (i32.const 256))
    (drop (call $fd_read (i32.const 0) (i32.const 0) (i32.const 1) (i32.const 8)))
    ;; echo the bytes read back to stdout
    (i32.store (i32.const 4) (i32.load (i32.const 8)))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 8)))))
"#;

/// Prints the raw argv buffer (NUL separated) then the raw environ buffer.
const DUMP_ARGS_ENV: &str = r#"
(module
  (import "wasi_snapshot_preview1" "args_sizes_get"
    (func $args_sizes_get (param i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "args_get"
    (func $args_get (param i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "environ_sizes_get"
    (func $environ_sizes_get (param i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "environ_get"
    (func $environ_get (param i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (func $dump (param $buf i32) (param $len i32)
    (i32.store (i32.const 0) (local.get $buf))
    (i32.store (i32.const 4) (local.get $len))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 8))))
  (func (export "_start")
    ;; argv pointers at 1024, argv data at 4096
    (drop (call $args_sizes_get (i32.const 16) (i32.const 20)))
    (drop (call $args_get (i32.const 1024) (i32.const 4096)))
    (call $dump (i32.const 4096) (i32.load (i32.const 20)))
    ;; environ pointers at 2048, environ data at 8192
    (drop (call $environ_sizes_get (i32.const 16) (i32.const 20)))
    (drop (call $environ_get (i32.const 2048) (i32.const 8192)))
    (call $dump (i32.const 8192) (i32.load (i32.const 20)))))
"#;

/// Creates `out.txt` in the preopened root and writes a marker into it.
const WRITE_PREOPEN_FILE: &str = r#"
(module
  (import "wasi_snapshot_preview1" "path_open"
    (func $path_open (param i32 i32 i32 i32 i32 i64 i64 i32 i32) (result i32)))
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (memory (export "memory") 1)
  (data (i32.const 64) "out.txt")
  (data (i32.const 128) "hello-from-wasi")
  (func (export "_start")
    ;; open fd 3 (first preopen) / out.txt with CREAT|TRUNC and fd_write rights
    (drop (call $path_open
      (i32.const 3) (i32.const 0) (i32.const 64) (i32.const 7)
      (i32.const 9) (i64.const 64) (i64.const 0) (i32.const 0) (i32.const 32)))
    (i32.store (i32.const 0) (i32.const 128))
    (i32.store (i32.const 4) (i32.const 15))
    (drop (call $fd_write (i32.load (i32.const 32)) (i32.const 0) (i32.const 1) (i32.const 8)))))
"#;

const TRAP_UNREACHABLE: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "_start") (unreachable)))
"#;

const NO_START_EXPORT: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "other")))
"#;

#[tokio::test]
async fn proc_exit_code_is_returned() {
    let dir = TempDir::new().unwrap();
    let module = guest(&dir, EXIT_7);
    let data = data_dir(&dir);

    let code = run_wasi_module(&module, &[], &BTreeMap::new(), None, &data, None, None)
        .await
        .unwrap();
    assert_eq!(code, 7);
}

#[tokio::test]
async fn normal_return_maps_to_exit_zero() {
    let dir = TempDir::new().unwrap();
    let module = guest(&dir, RETURN_NORMALLY);
    let data = data_dir(&dir);

    let code = run_wasi_module(&module, &[], &BTreeMap::new(), None, &data, None, None)
        .await
        .unwrap();
    assert_eq!(code, 0);
}

#[tokio::test]
async fn stdout_and_stderr_are_written_to_files() {
    let dir = TempDir::new().unwrap();
    let module = guest(&dir, WRITE_STDOUT_STDERR);
    let data = data_dir(&dir);
    let stdout = data.join("logs/stdout.log");
    let stderr = data.join("logs/stderr.log");

    run_wasi_module(
        &module,
        &[],
        &BTreeMap::new(),
        None,
        &data,
        Some(&stdout),
        Some(&stderr),
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read_to_string(&stdout).unwrap(), "TO_STDOUT");
    assert_eq!(std::fs::read_to_string(&stderr).unwrap(), "TO_STDERR");
}

#[tokio::test]
async fn without_target_files_output_is_discarded() {
    let dir = TempDir::new().unwrap();
    let module = guest(&dir, WRITE_STDOUT_STDERR);
    let data = data_dir(&dir);

    let code = run_wasi_module(&module, &[], &BTreeMap::new(), None, &data, None, None)
        .await
        .unwrap();
    assert_eq!(code, 0);
    // Nothing new appears in the sandbox.
    assert_eq!(std::fs::read_dir(&data).unwrap().count(), 0);
}

#[tokio::test]
async fn stdin_is_piped_from_file() {
    let dir = TempDir::new().unwrap();
    let module = guest(&dir, ECHO_STDIN);
    let data = data_dir(&dir);
    let stdin = dir.path().join("stdin.bin");
    std::fs::write(&stdin, b"line1\nline2").unwrap();
    let stdout = data.join("stdout.log");

    run_wasi_module(
        &module,
        &[],
        &BTreeMap::new(),
        Some(&stdin),
        &data,
        Some(&stdout),
        None,
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(&stdout).unwrap(), b"line1\nline2");
}

#[tokio::test]
async fn argv_and_env_reach_the_guest() {
    let dir = TempDir::new().unwrap();
    let module = guest(&dir, DUMP_ARGS_ENV);
    let data = data_dir(&dir);
    let stdout = data.join("stdout.log");

    let argv = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let env = BTreeMap::from([("FOO".to_string(), "bar".to_string())]);

    run_wasi_module(&module, &argv, &env, None, &data, Some(&stdout), None)
        .await
        .unwrap();

    let dumped = std::fs::read(&stdout).unwrap();
    // argv buffer: NUL-terminated strings back to back
    assert!(dumped.windows(6).any(|w| w == b"a\0b\0c\0"));
    assert!(dumped.windows(8).any(|w| w == b"FOO=bar\0"));
}

#[tokio::test]
async fn guest_writes_into_the_preopened_root() {
    let dir = TempDir::new().unwrap();
    let module = guest(&dir, WRITE_PREOPEN_FILE);
    let data = data_dir(&dir);

    run_wasi_module(&module, &[], &BTreeMap::new(), None, &data, None, None)
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(data.join("out.txt")).unwrap(),
        "hello-from-wasi"
    );
}

#[tokio::test]
async fn runtime_trap_is_classified_as_trap() {
    let dir = TempDir::new().unwrap();
    let module = guest(&dir, TRAP_UNREACHABLE);
    let data = data_dir(&dir);

    let err = run_wasi_module(&module, &[], &BTreeMap::new(), None, &data, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WasmError::Trap(_)), "got {err:?}");
}

#[tokio::test]
async fn missing_start_export_is_a_setup_error() {
    let dir = TempDir::new().unwrap();
    let module = guest(&dir, NO_START_EXPORT);
    let data = data_dir(&dir);

    let err = run_wasi_module(&module, &[], &BTreeMap::new(), None, &data, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WasmError::Setup(_)), "got {err:?}");
}

#[tokio::test]
async fn invalid_module_bytes_are_a_setup_error() {
    let dir = TempDir::new().unwrap();
    let module = dir.path().join("bogus.wasm");
    std::fs::write(&module, b"definitely not wasm or wat").unwrap();
    let data = data_dir(&dir);

    let err = run_wasi_module(&module, &[], &BTreeMap::new(), None, &data, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WasmError::Setup(_)), "got {err:?}");
}

#[tokio::test]
async fn missing_module_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let data = data_dir(&dir);

    let err = run_wasi_module(
        &dir.path().join("ghost.wasm"),
        &[],
        &BTreeMap::new(),
        None,
        &data,
        None,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WasmError::Io(_)), "got {err:?}");
}
