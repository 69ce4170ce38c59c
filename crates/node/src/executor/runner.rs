// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! WASI module execution on a blocking worker.
//!
//! The guest sees `argv`/`env`, an optional stdin blob, and the sandbox
//! root preopened as `/`. Guest stdout/stderr are captured in memory and
//! written to the requested sandbox files after the run; without a target
//! file they are discarded.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::debug;
use wasmtime::{Engine, Linker, Module, Store};
use wasmtime_wasi::pipe::{MemoryInputPipe, MemoryOutputPipe};
use wasmtime_wasi::preview1::{self, WasiP1Ctx};
use wasmtime_wasi::{DirPerms, FilePerms, I32Exit, WasiCtxBuilder};

/// Cap on captured guest stdout/stderr.
const STDIO_CAPTURE_LIMIT: usize = 16 * 1024 * 1024;

/// How a WASI run can fail, beyond a nonzero exit code.
#[derive(Debug, Error)]
pub enum WasmError {
    /// Compile, link, instantiate, or WASI-config failure.
    #[error("wasm setup failed: {0}")]
    Setup(String),

    /// The module trapped at runtime (other than `proc_exit`).
    #[error("wasm trapped: {0}")]
    Trap(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Execute a WASI module and return its exit code.
///
/// A normal return maps to exit code 0; a `proc_exit` trap maps to its
/// code. Runs on a blocking worker so the event loop stays responsive.
#[allow(clippy::too_many_arguments)]
pub async fn run_wasi_module(
    wasm_path: &Path,
    argv: &[String],
    env: &BTreeMap<String, String>,
    stdin_path: Option<&Path>,
    data_dir: &Path,
    stdout_path: Option<&Path>,
    stderr_path: Option<&Path>,
) -> Result<i32, WasmError> {
    let wasm_bytes = tokio::fs::read(wasm_path).await?;
    let stdin_bytes = match stdin_path {
        Some(path) => Some(tokio::fs::read(path).await?),
        None => None,
    };

    debug!(module = %wasm_path.display(), "launching wasi module");

    let argv = argv.to_vec();
    let env: Vec<(String, String)> = env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    let preopen = data_dir.to_path_buf();
    let (exit_code, stdout, stderr) =
        tokio::task::spawn_blocking(move || run_sync(&wasm_bytes, &argv, &env, stdin_bytes, &preopen))
            .await
            .map_err(|err| WasmError::Setup(format!("execution worker died: {err}")))??;

    write_capture(stdout_path, stdout).await?;
    write_capture(stderr_path, stderr).await?;

    debug!(exit_code, "finished wasi module");
    Ok(exit_code)
}

async fn write_capture(target: Option<&Path>, captured: Vec<u8>) -> Result<(), WasmError> {
    let Some(target) = target else {
        return Ok(());
    };
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, captured).await?;
    Ok(())
}

/// Run the module synchronously once and classify the outcome.
fn run_sync(
    wasm_bytes: &[u8],
    argv: &[String],
    env: &[(String, String)],
    stdin_bytes: Option<Vec<u8>>,
    data_dir: &Path,
) -> Result<(i32, Vec<u8>, Vec<u8>), WasmError> {
    let setup = |err: wasmtime::Error| WasmError::Setup(err.to_string());

    let engine = Engine::default();
    let module = Module::new(&engine, wasm_bytes).map_err(setup)?;

    let mut linker: Linker<WasiP1Ctx> = Linker::new(&engine);
    preview1::add_to_linker_sync(&mut linker, |ctx| ctx).map_err(setup)?;

    let stdout = MemoryOutputPipe::new(STDIO_CAPTURE_LIMIT);
    let stderr = MemoryOutputPipe::new(STDIO_CAPTURE_LIMIT);

    let mut builder = WasiCtxBuilder::new();
    builder.args(argv);
    builder.envs(env);
    if let Some(bytes) = stdin_bytes {
        builder.stdin(MemoryInputPipe::new(bytes));
    }
    builder.stdout(stdout.clone());
    builder.stderr(stderr.clone());
    builder
        .preopened_dir(data_dir, "/", DirPerms::all(), FilePerms::all())
        .map_err(setup)?;

    let mut store = Store::new(&engine, builder.build_p1());
    let instance = linker.instantiate(&mut store, &module).map_err(setup)?;
    let start = instance
        .get_typed_func::<(), ()>(&mut store, "_start")
        .map_err(|_| WasmError::Setup("the module does not export a `_start` function".to_string()))?;

    let exit_code = match start.call(&mut store, ()) {
        Ok(()) => 0,
        Err(err) => match err.downcast_ref::<I32Exit>() {
            Some(I32Exit(code)) => *code,
            None => return Err(WasmError::Trap(err.to_string())),
        },
    };

    Ok((exit_code, stdout.contents().to_vec(), stderr.contents().to_vec()))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
