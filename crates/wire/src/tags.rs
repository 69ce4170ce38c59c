// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Integer tags fixed on the wire.

use crate::WireError;

/// Agent-message discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Reply = 1,
    Register = 2,
    Fetch = 3,
    FetchReply = 4,
    Create = 5,
}

impl MessageType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, WireError> {
        match tag {
            1 => Ok(Self::Reply),
            2 => Ok(Self::Register),
            3 => Ok(Self::Fetch),
            4 => Ok(Self::FetchReply),
            5 => Ok(Self::Create),
            other => Err(WireError::UnknownMessageTag(other)),
        }
    }
}

/// Role of a node, carried in FETCH requests and discovery bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum NodeType {
    Broker = 1,
    Executor = 2,
    Datastore = 3,
    Client = 4,
}

impl NodeType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, WireError> {
        match tag {
            1 => Ok(Self::Broker),
            2 => Ok(Self::Executor),
            3 => Ok(Self::Datastore),
            4 => Ok(Self::Client),
            other => Err(WireError::UnknownNodeTag(other)),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Broker => "broker",
            Self::Executor => "executor",
            Self::Datastore => "datastore",
            Self::Client => "client",
        };
        write!(f, "{name}")
    }
}

/// Application-level bundle discriminant.
///
/// Tag ranges: 1-10 broker discovery, 11-20 jobs, 21-30 named data.
/// `NDATA_DEL` (23) is reserved but never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BundleType {
    BrokerAnnounce = 1,
    BrokerRequest = 2,
    BrokerAck = 3,
    JobSubmit = 11,
    JobResult = 12,
    JobQuery = 13,
    JobList = 14,
    NdataPut = 21,
    NdataGet = 22,
    NdataDel = 23,
}

impl BundleType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, WireError> {
        match tag {
            1 => Ok(Self::BrokerAnnounce),
            2 => Ok(Self::BrokerRequest),
            3 => Ok(Self::BrokerAck),
            11 => Ok(Self::JobSubmit),
            12 => Ok(Self::JobResult),
            13 => Ok(Self::JobQuery),
            14 => Ok(Self::JobList),
            21 => Ok(Self::NdataPut),
            22 => Ok(Self::NdataGet),
            23 => Ok(Self::NdataDel),
            other => Err(WireError::UnknownBundleTag(other)),
        }
    }

    /// True for the broker-discovery family (announce/request/ack).
    pub fn is_discovery(self) -> bool {
        matches!(self, Self::BrokerAnnounce | Self::BrokerRequest | Self::BrokerAck)
    }

    /// True for the named-data family (put/get/del).
    pub fn is_named_data(self) -> bool {
        matches!(self, Self::NdataPut | Self::NdataGet | Self::NdataDel)
    }
}
