// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Wire protocol spoken with the local DTN agent.
//!
//! Framing: 8-byte length prefix (big-endian) + MessagePack payload.
//! Messages encode as string-keyed maps with an integer `type` tag;
//! bundles omit default-valued optional fields to save bytes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod bundle;
mod frame;
mod message;
mod tags;

pub use bundle::{Bundle, NamedData};
pub use frame::{read_frame, write_frame, MAX_FRAME_LEN};
pub use message::{decode, encode, FetchReply, Message, Reply};
pub use tags::{BundleType, MessageType, NodeType};

use drift_core::EidError;
use thiserror::Error;

/// Errors from framing, encoding, or decoding agent messages.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN}-byte limit")]
    Oversized(u64),

    #[error("malformed message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("cannot encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("unknown message tag: {0}")]
    UnknownMessageTag(u8),

    #[error("unknown bundle tag: {0}")]
    UnknownBundleTag(u8),

    #[error("unknown node tag: {0}")]
    UnknownNodeTag(u8),

    #[error("message tag {tag} is missing required field {field:?}")]
    MissingField { tag: u8, field: &'static str },

    #[error(transparent)]
    Eid(#[from] EidError),
}

#[cfg(test)]
mod property_tests;
