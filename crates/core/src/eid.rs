// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Bundle-protocol endpoint identifiers.
//!
//! Two concrete schemes are supported: `dtn://<node>/<service>` (with the
//! special null endpoint `dtn:none`) and `ipn:<node>.<service>`. An [`Eid`]
//! is stored in normalized string form and compares, hashes, and
//! serializes as that string.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The null endpoint, `dtn:none`.
const DTN_NONE: &str = "dtn:none";

/// Character class allowed in a `dtn` node name.
fn node_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // The pattern is a literal; compilation cannot fail.
        #[allow(clippy::unwrap_used)]
        let re = Regex::new(r"^[A-Za-z0-9._~!$&'()*+,;=-]+$").unwrap();
        re
    })
}

/// Errors from parsing or constructing an endpoint identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EidError {
    #[error("invalid endpoint id: {0:?}")]
    InvalidEid(String),
    #[error("invalid dtn node name: {0:?}")]
    InvalidNodeName(String),
    #[error("invalid ipn component: node={node} service={service}")]
    InvalidIpnComponent { node: i64, service: i64 },
}

/// A validated, normalized endpoint identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Eid(String);

impl Eid {
    /// Parse and normalize an EID from its string form.
    ///
    /// `dtn://host` normalizes to `dtn://host/`.
    pub fn parse(s: &str) -> Result<Self, EidError> {
        if s == DTN_NONE {
            return Ok(Self(DTN_NONE.to_string()));
        }

        if let Some(rest) = s.strip_prefix("dtn://") {
            let (node, service) = match rest.split_once('/') {
                Some((node, service)) => (node, service),
                None => (rest, ""),
            };
            return Self::dtn(node, service);
        }

        if let Some(rest) = s.strip_prefix("ipn:") {
            let (node, service) = rest
                .split_once('.')
                .ok_or_else(|| EidError::InvalidEid(s.to_string()))?;
            let node: i64 = node.parse().map_err(|_| EidError::InvalidEid(s.to_string()))?;
            let service: i64 =
                service.parse().map_err(|_| EidError::InvalidEid(s.to_string()))?;
            return Self::ipn(node, service);
        }

        Err(EidError::InvalidEid(s.to_string()))
    }

    /// Build a `dtn` EID from node and service parts.
    pub fn dtn(node: &str, service: &str) -> Result<Self, EidError> {
        if node == "none" || !node_name_re().is_match(node) {
            return Err(EidError::InvalidNodeName(node.to_string()));
        }
        Ok(Self(format!("dtn://{node}/{service}")))
    }

    /// Build a singleton `dtn` EID with an empty service part.
    pub fn dtn_node(node: &str) -> Result<Self, EidError> {
        Self::dtn(node, "")
    }

    /// Build an `ipn` EID. The node number must be ≥ 1, the service ≥ 0.
    pub fn ipn(node: i64, service: i64) -> Result<Self, EidError> {
        if node < 1 || service < 0 {
            return Err(EidError::InvalidIpnComponent { node, service });
        }
        Ok(Self(format!("ipn:{node}.{service}")))
    }

    /// The null endpoint, `dtn:none`.
    pub fn none() -> Self {
        Self(DTN_NONE.to_string())
    }

    /// The node part: the host name of a `dtn` EID, the node number of an
    /// `ipn` EID, `None` for the null endpoint.
    pub fn node(&self) -> Option<&str> {
        if let Some(rest) = self.0.strip_prefix("dtn://") {
            return rest.split('/').next();
        }
        if let Some(rest) = self.0.strip_prefix("ipn:") {
            return rest.split('.').next();
        }
        None
    }

    /// The service part (everything after the node).
    pub fn service(&self) -> Option<&str> {
        if let Some(rest) = self.0.strip_prefix("dtn://") {
            return rest.split_once('/').map(|(_, service)| service);
        }
        if let Some(rest) = self.0.strip_prefix("ipn:") {
            return rest.split_once('.').map(|(_, service)| service);
        }
        None
    }

    /// True if this is a multicast/group endpoint (service begins with `~`).
    pub fn is_group(&self) -> bool {
        self.service().is_some_and(|s| s.starts_with('~'))
    }

    /// True if this is the null endpoint.
    pub fn is_none(&self) -> bool {
        self.0 == DTN_NONE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Well-known multicast groups. The strings are fixed by the protocol.

    /// `dtn://rec.all/~` — every registered node.
    pub fn broadcast() -> Self {
        Self("dtn://rec.all/~".to_string())
    }

    /// `dtn://rec.broker/~` — all brokers.
    pub fn broker_group() -> Self {
        Self("dtn://rec.broker/~".to_string())
    }

    /// `dtn://rec.store/~` — all datastores.
    pub fn store_group() -> Self {
        Self("dtn://rec.store/~".to_string())
    }

    /// `dtn://rec.executor/~` — all executors.
    pub fn executor_group() -> Self {
        Self("dtn://rec.executor/~".to_string())
    }

    /// `dtn://rec.client/~` — all clients.
    pub fn client_group() -> Self {
        Self("dtn://rec.client/~".to_string())
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Eid {
    type Err = EidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Eid {
    type Error = EidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Eid> for String {
    fn from(eid: Eid) -> Self {
        eid.0
    }
}

impl AsRef<str> for Eid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Eid {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Eid {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "eid_tests.rs"]
mod tests;
