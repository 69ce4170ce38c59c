// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Content-addressed named-blob storage.
//!
//! Maps unique names to blobs stored under their SHA-1 digest, giving
//! deduplication for free: many names may share one blob file. The name
//! index persists as a JSON map at the database path; blobs live in a flat
//! directory keyed by digest. SHA-1 is a content address here, not a
//! security token — callers must not rely on collision resistance.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::collections::{BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Errors from storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("name {0:?} already taken")]
    NameTaken(String),

    #[error("no such name: {0:?}")]
    NoSuchName(String),

    #[error("corrupt name index: {0}")]
    CorruptIndex(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Async-safe named blob store with deduplication.
///
/// A single reader/writer lock protects the name index: lookups proceed in
/// parallel, mutations are exclusive. Orphan repair (removing index
/// entries whose blob file disappeared) detects under the read guard and
/// repairs under the write guard.
pub struct Storage {
    db_path: PathBuf,
    blob_dir: PathBuf,
    index: RwLock<HashMap<String, String>>,
}

impl Storage {
    /// Open (or create) a store.
    ///
    /// Creates the blob directory and the database's parent directory, and
    /// loads the existing name index if one is present.
    pub async fn open(db_path: impl Into<PathBuf>, blob_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let db_path = db_path.into();
        let blob_dir = blob_dir.into();

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::create_dir_all(&blob_dir).await?;

        let index = match tokio::fs::read(&db_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self { db_path, blob_dir, index: RwLock::new(index) })
    }

    /// Store `data` under `name`.
    ///
    /// The blob is written before the index row, so a crash cannot leave a
    /// name pointing at nothing. If a blob with the same digest already
    /// exists, only the index row is added.
    pub async fn store_data(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut index = self.index.write().await;

        if index.contains_key(name) {
            return Err(StorageError::NameTaken(name.to_string()));
        }

        let digest = hex::encode(Sha1::digest(data));
        let blob_path = self.blob_dir.join(&digest);

        if !tokio::fs::try_exists(&blob_path).await? {
            tokio::fs::write(&blob_path, data).await?;
        } else {
            debug!(name, digest, "blob already present, deduplicating");
        }

        index.insert(name.to_string(), digest);
        self.persist(&index).await
    }

    /// Load every entry whose name starts with `prefix`.
    ///
    /// Entries whose blob file has disappeared are dropped from the index
    /// before the call returns.
    pub async fn load_data(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let mut found = Vec::new();
        let mut disappeared = Vec::new();

        {
            let index = self.index.read().await;
            let mut entries: Vec<_> =
                index.iter().filter(|(name, _)| name.starts_with(prefix)).collect();
            entries.sort();

            for (name, digest) in entries {
                match tokio::fs::read(self.blob_dir.join(digest)).await {
                    Ok(bytes) => found.push((name.clone(), bytes)),
                    Err(err) if err.kind() == ErrorKind::NotFound => {
                        warn!(name, digest, "blob file missing, dropping index entry");
                        disappeared.push(name.clone());
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        if !disappeared.is_empty() {
            self.cleanup(&disappeared).await?;
        }

        Ok(found)
    }

    /// Which of `names` are not in the index.
    pub async fn find_missing(&self, names: &BTreeSet<String>) -> BTreeSet<String> {
        if names.is_empty() {
            return BTreeSet::new();
        }
        let index = self.index.read().await;
        names.iter().filter(|name| !index.contains_key(*name)).cloned().collect()
    }

    /// Copy the blob referenced by `name` (exact match) to `destination`.
    ///
    /// If the name resolves but its blob is gone, the stale entry is
    /// removed and the call fails with [`StorageError::NoSuchName`].
    pub async fn copy_to_file(&self, name: &str, destination: &Path) -> Result<(), StorageError> {
        let stale = {
            let index = self.index.read().await;
            let digest = index
                .get(name)
                .ok_or_else(|| StorageError::NoSuchName(name.to_string()))?;
            let source = self.blob_dir.join(digest);

            match tokio::fs::copy(&source, destination).await {
                Ok(_) => false,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    warn!(name, digest, "blob file missing, dropping index entry");
                    true
                }
                Err(err) => return Err(err.into()),
            }
        };

        if stale {
            self.cleanup(&[name.to_string()]).await?;
            return Err(StorageError::NoSuchName(name.to_string()));
        }
        Ok(())
    }

    /// Remove index entries for names whose blob files are missing.
    async fn cleanup(&self, names: &[String]) -> Result<(), StorageError> {
        let mut index = self.index.write().await;
        for name in names {
            index.remove(name);
        }
        self.persist(&index).await
    }

    /// Write the index atomically: temp file, then rename.
    async fn persist(&self, index: &HashMap<String, String>) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(index)?;
        let tmp = self.db_path.with_extension("db.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.db_path).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
