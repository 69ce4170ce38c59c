// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Bundles: the delivery units routed by the DTN agent.

use drift_core::Eid;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::tags::{BundleType, NodeType};
use crate::WireError;

/// The `named_data` field: a single name or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamedData {
    One(String),
    Many(Vec<String>),
}

impl NamedData {
    /// Normalize to a list (a scalar becomes a singleton).
    pub fn into_names(self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.clone().into_names()
    }
}

impl From<String> for NamedData {
    fn from(name: String) -> Self {
        Self::One(name)
    }
}

impl From<Vec<String>> for NamedData {
    fn from(names: Vec<String>) -> Self {
        Self::Many(names)
    }
}

/// An application bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub kind: BundleType,
    pub source: Eid,
    pub destination: Eid,
    pub payload: Vec<u8>,
    pub success: bool,
    pub error: String,
    /// Set on discovery bundles.
    pub node_type: Option<NodeType>,
    /// Set on job query/list bundles.
    pub submitter: Option<Eid>,
    /// Set on named-data bundles.
    pub named_data: Option<NamedData>,
}

impl Bundle {
    pub fn new(kind: BundleType, source: Eid, destination: Eid) -> Self {
        Self {
            kind,
            source,
            destination,
            payload: Vec::new(),
            success: true,
            error: String::new(),
            node_type: None,
            submitter: None,
            named_data: None,
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    pub fn with_submitter(mut self, submitter: Eid) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn with_named_data(mut self, named_data: impl Into<NamedData>) -> Self {
        self.named_data = Some(named_data.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = error.into();
        self
    }

    /// The `named_data` field normalized to a list; empty when absent.
    pub fn named_data_list(&self) -> Vec<String> {
        self.named_data.as_ref().map(NamedData::names).unwrap_or_default()
    }
}

fn default_true() -> bool {
    true
}

fn bytes_empty(b: &ByteBuf) -> bool {
    b.is_empty()
}

fn tag_zero(t: &u8) -> bool {
    *t == 0
}

/// On-the-wire shape of a bundle. Default-valued optional fields are
/// omitted when encoding.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RawBundle {
    #[serde(rename = "type")]
    pub kind: u8,
    pub source: Eid,
    pub destination: Eid,
    #[serde(default, skip_serializing_if = "bytes_empty")]
    pub payload: ByteBuf,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "tag_zero")]
    pub node_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter: Option<Eid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_data: Option<NamedData>,
}

impl From<&Bundle> for RawBundle {
    fn from(b: &Bundle) -> Self {
        Self {
            kind: b.kind.tag(),
            source: b.source.clone(),
            destination: b.destination.clone(),
            payload: ByteBuf::from(b.payload.clone()),
            success: b.success,
            error: b.error.clone(),
            node_type: b.node_type.map(NodeType::tag).unwrap_or(0),
            submitter: b.submitter.clone(),
            named_data: b.named_data.clone(),
        }
    }
}

impl TryFrom<RawBundle> for Bundle {
    type Error = WireError;

    fn try_from(raw: RawBundle) -> Result<Self, WireError> {
        let node_type = match raw.node_type {
            0 => None,
            tag => Some(NodeType::from_tag(tag)?),
        };
        Ok(Self {
            kind: BundleType::from_tag(raw.kind)?,
            source: raw.source,
            destination: raw.destination,
            payload: raw.payload.into_vec(),
            success: raw.success,
            error: raw.error,
            node_type,
            submitter: raw.submitter,
            named_data: raw.named_data,
        })
    }
}
