// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! WASI sandbox preparation and path-escape defense.
//!
//! Every user-supplied sandbox path is resolved against the job's `data/`
//! directory and rejected if it escapes. Paths that do not exist yet
//! (preparation) are normalized lexically; paths inspected after the run
//! (result collection) are canonicalized through the filesystem so a
//! symlink planted by the guest cannot point the collector outside the
//! sandbox.

use std::path::{Component, Path, PathBuf};

use drift_core::JobInfo;
use drift_storage::{Storage, StorageError};
use thiserror::Error;
use tracing::warn;

/// Errors from sandbox preparation. A path escape rejects the whole job
/// before any I/O uses the offending path.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("path escapes the sandbox root: {0:?}")]
    PathEscape(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A prepared per-job filesystem layout.
///
/// `data_dir` is the directory preopened as `/` for the guest; it is
/// canonicalized so descendant checks are exact.
#[derive(Debug)]
pub struct Sandbox {
    pub wasm_path: PathBuf,
    pub stdin_path: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub stdout_path: Option<PathBuf>,
    pub stderr_path: Option<PathBuf>,
}

/// Build the job directory: the module copy, the optional stdin blob, and
/// the `data/` sandbox root with all requested directories and input
/// files materialized.
pub(crate) async fn prepare(
    storage: &Storage,
    job: &JobInfo,
    job_dir: &Path,
) -> Result<Sandbox, SandboxError> {
    tokio::fs::create_dir_all(job_dir).await?;

    let wasm_path = job_dir.join("module.wasm");
    storage.copy_to_file(&job.wasm_module, &wasm_path).await?;

    let stdin_path = match &job.stdin_file {
        Some(name) => {
            let path = job_dir.join("stdin.bin");
            storage.copy_to_file(name, &path).await?;
            Some(path)
        }
        None => None,
    };

    let data_dir = job_dir.join("data");
    tokio::fs::create_dir_all(&data_dir).await?;
    let data_dir = tokio::fs::canonicalize(&data_dir).await?;

    // Validate every user-supplied path before touching the filesystem
    // with any of them.
    let dirs = job
        .dirs
        .iter()
        .map(|d| resolve_fresh(&data_dir, d))
        .collect::<Result<Vec<_>, _>>()?;
    let data_files = job
        .data
        .iter()
        .map(|(path, name)| Ok((resolve_fresh(&data_dir, path)?, name)))
        .collect::<Result<Vec<_>, SandboxError>>()?;
    let stdout_path = job.stdout_file.as_deref().map(|p| resolve_fresh(&data_dir, p)).transpose()?;
    let stderr_path = job.stderr_file.as_deref().map(|p| resolve_fresh(&data_dir, p)).transpose()?;

    for dir in dirs {
        tokio::fs::create_dir_all(&dir).await?;
    }

    for (path, name) in data_files {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        storage.copy_to_file(name, &path).await?;
    }

    for output in [&stdout_path, &stderr_path].into_iter().flatten() {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    Ok(Sandbox { wasm_path, stdin_path, data_dir, stdout_path, stderr_path })
}

/// Resolve a user path that may not exist yet: join it under `data_dir`,
/// fold `.`/`..` lexically, and require the result to stay inside.
pub(crate) fn resolve_fresh(data_dir: &Path, user_path: &str) -> Result<PathBuf, SandboxError> {
    let joined = data_dir.join(user_path.trim_start_matches('/'));
    let normalized = normalize(&joined);
    if normalized.starts_with(data_dir) {
        Ok(normalized)
    } else {
        Err(SandboxError::PathEscape(user_path.to_string()))
    }
}

/// Resolve a user path that should exist now, following symlinks.
/// `None` means skip: the path is missing or escapes the sandbox.
pub(crate) fn resolve_existing(data_dir: &Path, user_path: &str) -> Option<PathBuf> {
    let joined = data_dir.join(user_path.trim_start_matches('/'));
    let resolved = match std::fs::canonicalize(&joined) {
        Ok(path) => path,
        Err(err) => {
            warn!(path = user_path, error = %err, "result path does not resolve, skipping");
            return None;
        }
    };
    if resolved.starts_with(data_dir) {
        Some(resolved)
    } else {
        warn!(path = user_path, "result path escapes the sandbox root, skipping");
        None
    }
}

/// Lexical normalization: fold `.` and `..` without touching the
/// filesystem. `..` at the root stays at the root, so an escape below the
/// sandbox prefix is still visible to the caller's descendant check.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
