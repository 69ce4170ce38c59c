// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Client role: broker discovery with a persisted context, job queries,
//! and named-data put/get against a datastore.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use drift_core::{Eid, JobList};
use drift_wire::{Bundle, BundleType, NodeType};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::agent::AgentError;
use crate::discovery::Association;
use crate::node::{Node, NodeError};
use crate::INTAKE_TICK;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot read context file {path:?}: {source}")]
    ContextRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid context file {path:?}: {reason}")]
    ContextInvalid { path: PathBuf, reason: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("not associated with a broker")]
    NoBroker,

    #[error("malformed reply payload: {0}")]
    Payload(#[from] rmp_serde::decode::Error),

    #[error("remote replied with an error: {0}")]
    Remote(String),
}

/// Persisted client context. Records the associated broker once
/// discovery completes.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Context {
    broker: Option<Eid>,
}

#[derive(Debug)]
pub struct Client {
    node: Node,
    context_path: PathBuf,
}

impl Client {
    /// Create a client, restoring the broker association from the context
    /// file if one exists. A context file without a broker value is
    /// invalid.
    pub fn load(
        id: Eid,
        socket_path: impl Into<PathBuf>,
        context_path: impl Into<PathBuf>,
    ) -> Result<Self, ClientError> {
        let context_path = context_path.into();
        let mut node = Node::new(id, NodeType::Client, socket_path);

        match std::fs::read_to_string(&context_path) {
            Ok(raw) => {
                let context: Context = toml::from_str(&raw).map_err(|err| {
                    ClientError::ContextInvalid {
                        path: context_path.clone(),
                        reason: err.to_string(),
                    }
                })?;
                let broker = context.broker.ok_or_else(|| ClientError::ContextInvalid {
                    path: context_path.clone(),
                    reason: "missing broker address".to_string(),
                })?;
                node.association =
                    tokio::sync::RwLock::new(Association::with_broker(broker));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ClientError::ContextRead { path: context_path, source })
            }
        }

        Ok(Self { node, context_path })
    }

    pub fn context_path(&self) -> &Path {
        &self.context_path
    }

    /// Register with the agent and make sure a broker association exists,
    /// discovering one and persisting it if necessary.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.node.register().await?;

        if self.node.broker().await.is_some() {
            info!("already associated with broker");
            return Ok(());
        }

        info!("not associated with broker, waiting for announcement");
        self.find_broker().await?;

        info!("saving broker info");
        let context = Context { broker: self.node.broker().await };
        let raw = toml::to_string(&context)
            .map_err(|err| std::io::Error::new(ErrorKind::InvalidData, err))?;
        tokio::fs::write(&self.context_path, raw).await?;
        Ok(())
    }

    /// Poll for discovery bundles until the association is confirmed.
    async fn find_broker(&self) -> Result<(), ClientError> {
        while self.node.broker().await.is_none() {
            tokio::time::sleep(INTAKE_TICK).await;
            let bundles = self.node.fetch_bundles().await?;
            for bundle in bundles {
                if bundle.kind.is_discovery() {
                    let replies = self.node.handle_discovery(&bundle).await;
                    self.node.send_bundles(replies).await;
                }
            }
        }
        Ok(())
    }

    /// Ask the broker for its completed and queued jobs.
    pub async fn job_query(&self, submitter: &Eid) -> Result<JobList, ClientError> {
        info!("performing job query");
        let broker = self.node.broker().await.ok_or(ClientError::NoBroker)?;

        let query = Bundle::new(BundleType::JobQuery, self.node.id.clone(), broker)
            .with_submitter(submitter.clone());
        self.send_checked(query).await?;

        let reply = self.wait_reply(BundleType::JobList).await?;
        if !reply.success {
            return Err(ClientError::Remote(reply.error));
        }
        Ok(rmp_serde::from_slice(&reply.payload)?)
    }

    /// Fetch named data from a datastore. Returns the first matching
    /// entry as `(name, bytes)`.
    pub async fn data_get(
        &self,
        datastore: &Eid,
        name: &str,
    ) -> Result<(String, Vec<u8>), ClientError> {
        info!(name, "performing data get");
        let query = Bundle::new(BundleType::NdataGet, self.node.id.clone(), datastore.clone())
            .with_named_data(name.to_string());
        self.send_checked(query).await?;

        let reply = self.wait_reply(BundleType::NdataGet).await?;
        if !reply.success {
            return Err(ClientError::Remote(reply.error));
        }
        let name = reply.named_data_list().into_iter().next().unwrap_or_default();
        Ok((name, reply.payload))
    }

    /// Store named data on a datastore.
    pub async fn data_put(
        &self,
        datastore: &Eid,
        name: &str,
        data: Vec<u8>,
    ) -> Result<(), ClientError> {
        info!(name, "performing data put");
        let bundle = Bundle::new(BundleType::NdataPut, self.node.id.clone(), datastore.clone())
            .with_payload(data)
            .with_named_data(name.to_string());
        self.send_checked(bundle).await?;

        let reply = self.wait_reply(BundleType::NdataPut).await?;
        if !reply.success {
            return Err(ClientError::Remote(reply.error));
        }
        Ok(())
    }

    /// Send one bundle, surfacing an agent rejection as an error.
    async fn send_checked(&self, bundle: Bundle) -> Result<(), ClientError> {
        let reply = self.node.agent.send_bundle(bundle).await?;
        if !reply.success {
            error!(error = reply.error, "agent rejected bundle");
            return Err(ClientError::Remote(reply.error));
        }
        Ok(())
    }

    /// Poll the agent until a bundle of the wanted type arrives.
    async fn wait_reply(&self, wanted: BundleType) -> Result<Bundle, ClientError> {
        info!(kind = ?wanted, "waiting for reply");
        loop {
            tokio::time::sleep(INTAKE_TICK).await;
            let bundles = self.node.fetch_bundles().await?;
            for bundle in bundles {
                if bundle.kind == wanted {
                    return Ok(bundle);
                }
                debug!(kind = ?bundle.kind, "ignoring bundle while waiting");
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
