// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Datastore role: named-data PUT/GET over the storage engine.

use std::path::{Path, PathBuf};

use drift_core::Eid;
use drift_storage::{Storage, StorageError};
use drift_wire::{Bundle, BundleType, NodeType};
use tracing::{debug, error, info, warn};

use crate::node::{Node, NodeError};
use crate::INTAKE_TICK;

pub struct Datastore {
    node: Node,
    storage: Storage,
}

impl Datastore {
    /// Open a datastore rooted at `root`: the name index lives at
    /// `<root>/database.db`, blobs under `<root>/blobs/`.
    pub async fn open(
        id: Eid,
        socket_path: impl Into<PathBuf>,
        root: &Path,
    ) -> Result<Self, StorageError> {
        let storage = Storage::open(root.join("database.db"), root.join("blobs")).await?;
        Ok(Self { node: Node::new(id, NodeType::Datastore, socket_path), storage })
    }

    pub async fn run(&self) -> Result<(), NodeError> {
        info!("starting datastore");
        self.node.register().await?;
        self.intake_loop().await;
        Ok(())
    }

    async fn intake_loop(&self) {
        info!("starting bundle handler");
        loop {
            tokio::time::sleep(INTAKE_TICK).await;

            match self.node.fetch_bundles().await {
                Ok(bundles) => {
                    for bundle in bundles {
                        let replies = self.handle_bundle(&bundle).await;
                        self.node.send_bundles(replies).await;
                    }
                }
                Err(err) => error!(error = %err, "error fetching bundles"),
            }
        }
    }

    async fn handle_bundle(&self, bundle: &Bundle) -> Vec<Bundle> {
        debug!(kind = ?bundle.kind, source = %bundle.source, "handling bundle");
        if bundle.kind.is_discovery() {
            return self.node.handle_discovery(bundle).await;
        }
        if bundle.kind.is_named_data() {
            return self.handle_data(bundle).await;
        }
        warn!(kind = ?bundle.kind, "won't handle bundle");
        Vec::new()
    }

    /// Dispatch a named-data bundle.
    ///
    /// `NDATA_PUT` stores the payload under each listed name and answers
    /// with one confirmation bundle per name (`success=false` on a taken
    /// name). `NDATA_GET` answers with one bundle per stored entry whose
    /// name starts with a requested name. `NDATA_DEL` is reserved.
    async fn handle_data(&self, bundle: &Bundle) -> Vec<Bundle> {
        let names = bundle.named_data_list();
        if names.is_empty() {
            error!(kind = ?bundle.kind, "named-data bundle without names");
            return Vec::new();
        }

        let mut replies = Vec::new();
        match bundle.kind {
            BundleType::NdataPut => {
                for name in names {
                    let mut reply =
                        Bundle::new(BundleType::NdataPut, self.node.id.clone(), bundle.source.clone())
                            .with_named_data(name.clone());
                    if let Err(err) = self.storage.store_data(&name, &bundle.payload).await {
                        warn!(name, error = %err, "cannot store named data");
                        reply = reply.with_error(err.to_string());
                    }
                    replies.push(reply);
                }
            }
            BundleType::NdataGet => {
                for name in names {
                    match self.storage.load_data(&name).await {
                        Ok(entries) => {
                            for (entry_name, data) in entries {
                                replies.push(
                                    Bundle::new(
                                        BundleType::NdataGet,
                                        self.node.id.clone(),
                                        bundle.source.clone(),
                                    )
                                    .with_payload(data)
                                    .with_named_data(entry_name),
                                );
                            }
                        }
                        Err(err) => error!(name, error = %err, "cannot load named data"),
                    }
                }
            }
            _ => {
                // NDATA_DEL is reserved by tag but never used.
                error!(kind = ?bundle.kind, "ignoring named-data bundle");
            }
        }
        replies
    }
}

#[cfg(test)]
#[path = "datastore_tests.rs"]
mod tests;
