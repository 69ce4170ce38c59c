// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! The request/reply family exchanged with the DTN agent.

use drift_core::Eid;
use serde::{Deserialize, Serialize};

use crate::bundle::{Bundle, RawBundle};
use crate::tags::{MessageType, NodeType};
use crate::WireError;

/// Generic success/error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub success: bool,
    pub error: String,
}

impl Reply {
    pub fn ok() -> Self {
        Self { success: true, error: String::new() }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self { success: false, error: error.into() }
    }
}

/// Reply to a FETCH: the bundles queued for the requesting endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReply {
    pub success: bool,
    pub error: String,
    pub bundles: Vec<Bundle>,
}

impl FetchReply {
    pub fn ok(bundles: Vec<Bundle>) -> Self {
        Self { success: true, error: String::new(), bundles }
    }
}

/// A message to or from the DTN agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Reply(Reply),
    Register { endpoint_id: Eid },
    Fetch { endpoint_id: Eid, node_type: NodeType },
    FetchReply(FetchReply),
    Create { bundle: Bundle },
}

impl Message {
    pub fn kind(&self) -> MessageType {
        match self {
            Self::Reply(_) => MessageType::Reply,
            Self::Register { .. } => MessageType::Register,
            Self::Fetch { .. } => MessageType::Fetch,
            Self::FetchReply(_) => MessageType::FetchReply,
            Self::Create { .. } => MessageType::Create,
        }
    }
}

/// On-the-wire superset of every message shape. Which fields are required
/// depends on the `type` tag; [`decode`] enforces that.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    tag: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    endpoint_id: Option<Eid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    node_type: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bundles: Option<Vec<RawBundle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bundle: Option<RawBundle>,
}

/// Encode a message as a string-keyed MessagePack map.
pub fn encode(message: &Message) -> Result<Vec<u8>, WireError> {
    let tag = message.kind().tag();
    let raw = match message {
        Message::Reply(reply) => RawMessage {
            tag,
            success: Some(reply.success),
            error: Some(reply.error.clone()),
            ..RawMessage::default()
        },
        Message::Register { endpoint_id } => RawMessage {
            tag,
            endpoint_id: Some(endpoint_id.clone()),
            ..RawMessage::default()
        },
        Message::Fetch { endpoint_id, node_type } => RawMessage {
            tag,
            endpoint_id: Some(endpoint_id.clone()),
            node_type: Some(node_type.tag()),
            ..RawMessage::default()
        },
        Message::FetchReply(reply) => RawMessage {
            tag,
            success: Some(reply.success),
            error: Some(reply.error.clone()),
            bundles: Some(reply.bundles.iter().map(RawBundle::from).collect()),
            ..RawMessage::default()
        },
        Message::Create { bundle } => RawMessage {
            tag,
            bundle: Some(RawBundle::from(bundle)),
            ..RawMessage::default()
        },
    };
    Ok(rmp_serde::to_vec_named(&raw)?)
}

/// Decode a MessagePack map into a typed message.
pub fn decode(bytes: &[u8]) -> Result<Message, WireError> {
    let raw: RawMessage = rmp_serde::from_slice(bytes)?;
    let tag = raw.tag;
    let kind = MessageType::from_tag(tag)?;

    let require = |field: &'static str| WireError::MissingField { tag, field };

    match kind {
        MessageType::Reply => Ok(Message::Reply(Reply {
            success: raw.success.ok_or_else(|| require("success"))?,
            error: raw.error.unwrap_or_default(),
        })),
        MessageType::Register => Ok(Message::Register {
            endpoint_id: raw.endpoint_id.ok_or_else(|| require("endpoint_id"))?,
        }),
        MessageType::Fetch => Ok(Message::Fetch {
            endpoint_id: raw.endpoint_id.ok_or_else(|| require("endpoint_id"))?,
            node_type: NodeType::from_tag(raw.node_type.ok_or_else(|| require("node_type"))?)?,
        }),
        MessageType::FetchReply => {
            let bundles = raw
                .bundles
                .unwrap_or_default()
                .into_iter()
                .map(Bundle::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Message::FetchReply(FetchReply {
                success: raw.success.ok_or_else(|| require("success"))?,
                error: raw.error.unwrap_or_default(),
                bundles,
            }))
        }
        MessageType::Create => Ok(Message::Create {
            bundle: Bundle::try_from(raw.bundle.ok_or_else(|| require("bundle"))?)?,
        }),
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
