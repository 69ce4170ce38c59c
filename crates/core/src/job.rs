// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Job specifications and the container they travel in.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::caps::Capabilities;
use crate::eid::Eid;

/// Complete specification for a WebAssembly job execution request.
///
/// All filesystem paths (`dirs`, keys of `data` and `named_results`,
/// `stdout_file`, `stderr_file`, `results`) are sandbox paths, interpreted
/// relative to the directory preopened as `/` for the guest. Named
/// references (`wasm_module`, `stdin_file`, values of `data`) identify
/// blobs in the executor's cache or a datastore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    /// Named reference to the WebAssembly module to execute.
    pub wasm_module: String,
    /// Required system resources.
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Guest program arguments.
    #[serde(default)]
    pub argv: Vec<String>,
    /// Guest environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Named reference to stdin data, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin_file: Option<String>,
    /// Directories precreated in the sandbox before execution.
    #[serde(default)]
    pub dirs: Vec<String>,
    /// Sandbox path → named blob to materialize there before execution.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Sandbox path where guest stdout is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_file: Option<String>,
    /// Sandbox path where guest stderr is written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_file: Option<String>,
    /// Sandbox paths packed into one ZIP and sent to `results_receiver`.
    #[serde(default)]
    pub results: Vec<String>,
    /// Sandbox path → output name. Collected after execution, stored
    /// locally, and pushed to the datastore group. Directories are zipped.
    #[serde(default)]
    pub named_results: BTreeMap<String, String>,
    /// Endpoint to send the results ZIP to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_receiver: Option<Eid>,
}

impl JobInfo {
    pub fn new(wasm_module: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            wasm_module: wasm_module.into(),
            capabilities,
            ..Self::default()
        }
    }

    /// All named data this job needs before it can run: the module, the
    /// stdin blob if set, and every input file. Duplicates collapse.
    pub fn required_named_data(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        names.insert(self.wasm_module.clone());
        if let Some(stdin) = &self.stdin_file {
            names.insert(stdin.clone());
        }
        names.extend(self.data.values().cloned());
        names
    }
}

/// A job specification together with any input blobs the submitter chose
/// to ship inline. Names absent from `data` are fetched from the datastore
/// group before execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub metadata: JobInfo,
    #[serde(default)]
    pub data: BTreeMap<String, ByteBuf>,
}

impl Job {
    /// True if every named reference in the metadata ships inline.
    pub fn has_all_data(&self) -> bool {
        self.missing_data().is_empty()
    }

    /// Named references the executor will need to fetch from datastores.
    pub fn missing_data(&self) -> BTreeSet<String> {
        self.metadata
            .required_named_data()
            .into_iter()
            .filter(|name| !self.data.contains_key(name))
            .collect()
    }
}

/// Payload of a `JOB_LIST` bundle: the broker's view of job names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub completed: Vec<String>,
    #[serde(default)]
    pub queued: Vec<String>,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
