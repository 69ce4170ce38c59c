// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Broker role: periodic announcements, peer discovery, job-list queries.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;

use drift_core::{Eid, JobList};
use drift_wire::{Bundle, BundleType, NodeType};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::node::{Node, NodeError};
use crate::INTAKE_TICK;

/// Peers and job bookkeeping behind the broker's state lock.
#[derive(Debug, Default)]
struct BrokerState {
    discovered: BTreeMap<NodeType, BTreeSet<Eid>>,
    completed_jobs: BTreeSet<String>,
    queued_jobs: VecDeque<String>,
}

pub struct Broker {
    node: Node,
    state: RwLock<BrokerState>,
}

impl Broker {
    pub fn new(id: Eid, socket_path: impl Into<PathBuf>) -> Self {
        let mut node = Node::new(id.clone(), NodeType::Broker, socket_path);
        // A broker is its own broker.
        node.association = RwLock::new(crate::discovery::Association::with_broker(id));
        Self { node, state: RwLock::new(BrokerState::default()) }
    }

    /// Register, then run the announcer, the bundle intake, and the
    /// (stub) scheduler until the process terminates.
    pub async fn run(&self) -> Result<(), NodeError> {
        info!("starting broker");
        self.node.register().await?;
        tokio::join!(self.announce_loop(), self.intake_loop(), self.schedule_loop());
        Ok(())
    }

    /// Every tick, announce this broker to the broadcast group. Send
    /// failures are logged and retried on the next tick.
    async fn announce_loop(&self) {
        info!("starting announcer");
        loop {
            tokio::time::sleep(INTAKE_TICK).await;

            let announcement =
                Bundle::new(BundleType::BrokerAnnounce, self.node.id.clone(), Eid::broadcast())
                    .with_node_type(NodeType::Broker);

            match self.node.agent.send_bundle(announcement).await {
                Ok(reply) if reply.success => debug!("sent announcement"),
                Ok(reply) => error!(error = reply.error, "agent rejected announcement"),
                Err(err) => error!(error = %err, "error sending announcement"),
            }
        }
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

    /// Reserved for future job routing. Takes the writer lock each tick
    /// and does nothing.
    async fn schedule_loop(&self) {
        info!("starting job scheduler");
        loop {
            tokio::time::sleep(INTAKE_TICK).await;
            let _state = self.state.write().await;
            debug!("running job scheduler");
        }
    }

    async fn handle_bundle(&self, bundle: &Bundle) -> Vec<Bundle> {
        if bundle.kind == BundleType::JobQuery {
            return match self.handle_job_query(bundle).await {
                Ok(reply) => vec![reply],
                Err(err) => {
                    error!(error = %err, "cannot answer job query");
                    Vec::new()
                }
            };
        }
        if bundle.kind.is_discovery() {
            return self.handle_discovery(bundle).await;
        }
        warn!(kind = ?bundle.kind, "won't handle bundle");
        Vec::new()
    }

    /// The broker half of discovery: record requesting peers and ack them,
    /// ignore announcements (its own and other brokers').
    async fn handle_discovery(&self, bundle: &Bundle) -> Vec<Bundle> {
        match bundle.kind {
            BundleType::BrokerAnnounce => {
                if bundle.source != self.node.id {
                    debug!(source = %bundle.source, "announcement from another broker");
                }
                Vec::new()
            }
            BundleType::BrokerRequest => {
                let Some(node_type) = bundle.node_type else {
                    warn!(source = %bundle.source, "broker request without node type");
                    return Vec::new();
                };
                let mut state = self.state.write().await;
                state.discovered.entry(node_type).or_default().insert(bundle.source.clone());
                info!(peer = %bundle.source, %node_type, "discovered node");
                vec![Bundle::new(BundleType::BrokerAck, self.node.id.clone(), bundle.source.clone())]
            }
            _ => {
                warn!(kind = ?bundle.kind, "won't handle discovery bundle");
                Vec::new()
            }
        }
    }

    /// Answer a `JOB_QUERY` with a `JOB_LIST` of completed and queued job
    /// names.
    async fn handle_job_query(&self, bundle: &Bundle) -> Result<Bundle, rmp_serde::encode::Error> {
        debug!(source = %bundle.source, "handling job query");
        let state = self.state.read().await;
        let jobs = JobList {
            completed: state.completed_jobs.iter().cloned().collect(),
            queued: state.queued_jobs.iter().cloned().collect(),
        };
        let payload = rmp_serde::to_vec_named(&jobs)?;

        let mut reply =
            Bundle::new(BundleType::JobList, self.node.id.clone(), bundle.source.clone())
                .with_payload(payload);
        if let Some(submitter) = &bundle.submitter {
            reply = reply.with_submitter(submitter.clone());
        }
        Ok(reply)
    }

    /// Discovered peers of one type, for inspection.
    pub async fn discovered(&self, node_type: NodeType) -> BTreeSet<Eid> {
        self.state.read().await.discovered.get(&node_type).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
