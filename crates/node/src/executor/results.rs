// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Result collection: ZIP packaging for the results receiver and
//! named-result extraction for the datastore group.
//!
//! Collection is forgiving: a listed path that is missing, escapes the
//! sandbox, or has the wrong kind is logged and skipped, never failing
//! the job. Packaging runs on a blocking worker.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::Path;

use drift_core::JobInfo;
use tracing::warn;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::sandbox::resolve_existing;
use super::ExecutorError;

/// Pack the job's `results` paths into `<job_dir>/results.zip` and return
/// its bytes, or `None` when the job names no results receiver. An empty
/// ZIP is valid.
pub(crate) async fn collect_results(
    job: &JobInfo,
    data_dir: &Path,
    job_dir: &Path,
) -> Result<Option<Vec<u8>>, ExecutorError> {
    if job.results_receiver.is_none() {
        return Ok(None);
    }

    let zip_path = job_dir.join("results.zip");
    let paths = job.results.clone();
    let data_dir = data_dir.to_path_buf();
    let pack_path = zip_path.clone();
    run_packaging(move || pack_results(&paths, &data_dir, &pack_path)).await?;

    Ok(Some(tokio::fs::read(&zip_path).await?))
}

/// Collect the job's `named_results`: a regular file contributes its
/// bytes, a directory is zipped in memory with arcnames relative to its
/// parent (preserving the top-level directory name).
pub(crate) async fn collect_named_results(
    job: &JobInfo,
    data_dir: &Path,
) -> Result<BTreeMap<String, Vec<u8>>, ExecutorError> {
    if job.named_results.is_empty() {
        return Ok(BTreeMap::new());
    }

    let named = job.named_results.clone();
    let data_dir = data_dir.to_path_buf();
    run_packaging(move || pack_named_results(&named, &data_dir)).await
}

async fn run_packaging<T, F>(pack: F) -> Result<T, ExecutorError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExecutorError> + Send + 'static,
{
    tokio::task::spawn_blocking(pack)
        .await
        .map_err(|err| ExecutorError::Io(std::io::Error::other(err)))?
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn pack_results(paths: &[String], data_dir: &Path, zip_path: &Path) -> Result<(), ExecutorError> {
    let file = std::fs::File::create(zip_path)?;
    let mut zip = ZipWriter::new(file);

    for path in paths {
        let Some(resolved) = resolve_existing(data_dir, path) else {
            continue;
        };
        if resolved.is_file() {
            add_file(&mut zip, &resolved, arcname(&resolved, data_dir))?;
        } else if resolved.is_dir() {
            add_dir_with_base(&mut zip, &resolved, data_dir)?;
        } else {
            warn!(path, "result path is neither file nor directory, skipping");
        }
    }

    zip.finish()?;
    Ok(())
}

fn pack_named_results(
    named: &BTreeMap<String, String>,
    data_dir: &Path,
) -> Result<BTreeMap<String, Vec<u8>>, ExecutorError> {
    let mut results = BTreeMap::new();

    for (path, name) in named {
        let Some(resolved) = resolve_existing(data_dir, path) else {
            continue;
        };
        if resolved.is_file() {
            results.insert(name.clone(), std::fs::read(&resolved)?);
        } else if resolved.is_dir() {
            // Arcnames relative to the parent keep the directory name as
            // the top-level entry of the archive.
            let base = resolved.parent().unwrap_or(data_dir).to_path_buf();
            let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
            add_dir_with_base(&mut zip, &resolved, &base)?;
            results.insert(name.clone(), zip.finish()?.into_inner());
        } else {
            warn!(path, "result path is neither file nor directory, skipping");
        }
    }

    Ok(results)
}

fn add_dir_with_base<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    dir: &Path,
    base: &Path,
) -> Result<(), ExecutorError> {
    // Symlinks are not followed; a guest-planted link cannot smuggle
    // files from outside the sandbox into the archive.
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|err| ExecutorError::Io(std::io::Error::other(err)))?;
        if entry.file_type().is_file() {
            add_file(zip, entry.path(), arcname(entry.path(), base))?;
        }
    }
    Ok(())
}

fn add_file<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    file: &Path,
    arcname: String,
) -> Result<(), ExecutorError> {
    zip.start_file(arcname, deflated())?;
    let mut reader = std::fs::File::open(file)?;
    std::io::copy(&mut reader, zip)?;
    Ok(())
}

fn arcname(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).to_string_lossy().into_owned()
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
