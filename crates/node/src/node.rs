// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Shared node base: agent access, association state, bundle plumbing.

use std::path::{Path, PathBuf};

use drift_core::Eid;
use drift_wire::{Bundle, NodeType};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::agent::{AgentClient, AgentError};
use crate::discovery::Association;

/// Errors that end a node role.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The agent socket was unreachable at registration time. Fatal: the
    /// process exits with a non-zero code.
    #[error("registration failed: {0}")]
    Register(#[source] AgentError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// State and plumbing common to every role. Roles compose this rather
/// than inherit it.
#[derive(Debug)]
pub struct Node {
    pub id: Eid,
    pub node_type: NodeType,
    pub agent: AgentClient,
    pub association: RwLock<Association>,
}

impl Node {
    pub fn new(id: Eid, node_type: NodeType, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            node_type,
            agent: AgentClient::new(socket_path),
            association: RwLock::new(Association::default()),
        }
    }

    pub fn socket_path(&self) -> &Path {
        self.agent.socket_path()
    }

    /// Register this node's endpoint with the agent. An unreachable socket
    /// is fatal.
    pub async fn register(&self) -> Result<(), NodeError> {
        info!(id = %self.id, node_type = %self.node_type, "registering with dtn agent");
        self.agent.register(&self.id).await.map_err(NodeError::Register)
    }

    /// Fetch the bundles queued for this node.
    pub async fn fetch_bundles(&self) -> Result<Vec<Bundle>, AgentError> {
        self.agent.fetch(&self.id, self.node_type).await
    }

    /// Send a batch of bundles, logging per-bundle agent errors.
    pub async fn send_bundles(&self, bundles: Vec<Bundle>) {
        for bundle in bundles {
            match self.agent.send_bundle(bundle).await {
                Ok(reply) if reply.success => {}
                Ok(reply) => error!(error = reply.error, "agent rejected bundle"),
                Err(err) => error!(error = %err, "error sending bundle to agent"),
            }
        }
    }

    /// Run one discovery bundle through the association state machine
    /// under the writer lock; returns the bundles to emit.
    pub async fn handle_discovery(&self, bundle: &Bundle) -> Vec<Bundle> {
        let mut assoc = self.association.write().await;
        assoc.observe(&self.id, self.node_type, bundle)
    }

    /// The confirmed broker, if any.
    pub async fn broker(&self) -> Option<Eid> {
        self.association.read().await.broker.clone()
    }
}
