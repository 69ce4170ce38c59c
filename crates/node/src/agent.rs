// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! RPC client for the DTN agent's stream socket.
//!
//! One request per connection: connect, send a single length-prefixed
//! message, read a single reply, close.

use std::path::{Path, PathBuf};

use drift_core::Eid;
use drift_wire::{
    decode, encode, read_frame, write_frame, Bundle, Message, NodeType, Reply, WireError,
};
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::{debug, error};

/// Errors from talking to the DTN agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("cannot reach dtn agent at {path:?}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("agent sent {got} where {expected} was expected")]
    UnexpectedReply { expected: &'static str, got: &'static str },
}

/// Client for the agent's request/reply socket.
#[derive(Debug, Clone)]
pub struct AgentClient {
    socket_path: PathBuf,
}

impl AgentClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into() }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one message and read its reply over a fresh connection.
    pub async fn request(&self, message: &Message) -> Result<Message, AgentError> {
        debug!(path = %self.socket_path.display(), "connecting to dtn agent");
        let mut stream =
            UnixStream::connect(&self.socket_path).await.map_err(|source| AgentError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;

        let bytes = encode(message)?;
        write_frame(&mut stream, &bytes).await?;

        let reply = read_frame(&mut stream).await?;
        Ok(decode(&reply)?)
    }

    /// Register an endpoint with the agent.
    ///
    /// A rejected registration is only logged — the agent may already know
    /// the endpoint. Connection errors propagate; an unreachable socket at
    /// registration time is fatal to the process (the caller exits).
    pub async fn register(&self, endpoint_id: &Eid) -> Result<(), AgentError> {
        let message = Message::Register { endpoint_id: endpoint_id.clone() };
        match self.request(&message).await? {
            Message::Reply(Reply { success: true, .. }) => Ok(()),
            Message::Reply(Reply { error, .. }) => {
                debug!(%endpoint_id, error, "agent rejected registration");
                Ok(())
            }
            other => Err(unexpected("REPLY", &other)),
        }
    }

    /// Fetch the bundles queued for an endpoint.
    ///
    /// A non-success reply is logged and yields an empty list.
    pub async fn fetch(&self, endpoint_id: &Eid, node_type: NodeType) -> Result<Vec<Bundle>, AgentError> {
        let message = Message::Fetch { endpoint_id: endpoint_id.clone(), node_type };
        match self.request(&message).await? {
            Message::FetchReply(reply) if reply.success => Ok(reply.bundles),
            Message::FetchReply(reply) => {
                error!(error = reply.error, "agent replied to fetch with an error");
                Ok(Vec::new())
            }
            other => Err(unexpected("FETCH_REPLY", &other)),
        }
    }

    /// Hand a bundle to the agent for routing.
    ///
    /// Failures are surfaced to the caller, including a non-success reply.
    pub async fn send_bundle(&self, bundle: Bundle) -> Result<Reply, AgentError> {
        match self.request(&Message::Create { bundle }).await? {
            Message::Reply(reply) => Ok(reply),
            other => Err(unexpected("REPLY", &other)),
        }
    }
}

fn unexpected(expected: &'static str, got: &Message) -> AgentError {
    let got = match got {
        Message::Reply(_) => "REPLY",
        Message::Register { .. } => "REGISTER",
        Message::Fetch { .. } => "FETCH",
        Message::FetchReply(_) => "FETCH_REPLY",
        Message::Create { .. } => "CREATE",
    };
    AgentError::UnexpectedReply { expected, got }
}
