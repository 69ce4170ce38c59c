// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Broker-association state machine shared by all non-broker roles.
//!
//! Association is first-writer-wins and monotone: the first announcement
//! seen becomes the pending broker, the matching ack confirms it, and once
//! confirmed the association never changes for the process lifetime.

use drift_core::Eid;
use drift_wire::{Bundle, BundleType, NodeType};
use tracing::{debug, info, warn};

/// The two association slots of a non-broker node.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Association {
    /// Broker we sent a request to, awaiting its ack.
    pub pending: Option<Eid>,
    /// Confirmed broker. Never changes once set.
    pub broker: Option<Eid>,
}

impl Association {
    /// Start out already associated (brokers associate with themselves,
    /// clients may restore an association from their context file).
    pub fn with_broker(broker: Eid) -> Self {
        Self { pending: None, broker: Some(broker) }
    }

    pub fn is_associated(&self) -> bool {
        self.broker.is_some()
    }

    /// Feed one discovery bundle through the state machine, mutating the
    /// slots and returning the bundles to emit in response.
    ///
    /// Callers hold the node-state writer lock across this call.
    pub fn observe(&mut self, self_id: &Eid, node_type: NodeType, bundle: &Bundle) -> Vec<Bundle> {
        match bundle.kind {
            BundleType::BrokerAnnounce => {
                if self.pending.is_none() && self.broker.is_none() {
                    self.pending = Some(bundle.source.clone());
                    info!(broker = %bundle.source, "pending association with broker");
                    let request =
                        Bundle::new(BundleType::BrokerRequest, self_id.clone(), bundle.source.clone())
                            .with_node_type(node_type);
                    return vec![request];
                }
                debug!(broker = %bundle.source, "ignoring announcement, association in progress");
                Vec::new()
            }

            BundleType::BrokerAck => {
                if self.broker.is_some() {
                    debug!(broker = %bundle.source, "already associated, ignoring ack");
                } else if self.pending.as_ref() == Some(&bundle.source) {
                    self.broker = self.pending.take();
                    info!(broker = %bundle.source, "associated with broker");
                } else {
                    debug!(broker = %bundle.source, "ack from unknown broker, ignoring");
                }
                Vec::new()
            }

            other => {
                warn!(kind = ?other, "not a discovery bundle");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
