// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! Executor role: job admission, WASI sandboxing, execution, and result
//! publication.
//!
//! Two cooperative tasks share the state below: the bundle intake (which
//! admits jobs and stores arriving named data) and the scheduler (which
//! waits until a pending job has all inputs and fits the current system
//! capabilities, then runs it on a blocking worker). Every mutation of the
//! pending queue or the data cache wakes the scheduler, and the scheduler
//! rechecks the full runnability predicate after each wake.

mod results;
mod runner;
mod sandbox;

pub use runner::{run_wasi_module, WasmError};
pub use sandbox::SandboxError;

use std::collections::{BTreeMap, VecDeque};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use drift_core::{Capabilities, Eid, Job, JobInfo};
use drift_storage::{Storage, StorageError};
use drift_wire::{Bundle, BundleType, NodeType};
use thiserror::Error;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info, warn};

use crate::node::{Node, NodeError};
use crate::INTAKE_TICK;

/// Errors from a single job's pipeline. These never kill the executor:
/// the scheduler logs them, cleans the job directory, and resumes.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("malformed job payload: {0}")]
    Payload(#[from] rmp_serde::decode::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error(transparent)]
    Wasm(#[from] WasmError),

    #[error("cannot package results: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Executor {
    node: Node,
    storage: Storage,
    root_dir: PathBuf,
    /// FIFO of admitted jobs awaiting inputs or capacity.
    pending: RwLock<VecDeque<JobInfo>>,
    /// Signalled whenever the pending queue or the data cache changes.
    job_ready: Notify,
}

impl Executor {
    /// Open an executor rooted at `root`: storage lives beside the
    /// transient per-job directories.
    pub async fn open(
        id: Eid,
        socket_path: impl Into<PathBuf>,
        root: &Path,
    ) -> Result<Self, StorageError> {
        let storage = Storage::open(root.join("database.db"), root.join("blobs")).await?;
        Ok(Self {
            node: Node::new(id, NodeType::Executor, socket_path),
            storage,
            root_dir: root.to_path_buf(),
            pending: RwLock::new(VecDeque::new()),
            job_ready: Notify::new(),
        })
    }

    /// Register, then run the bundle intake and the scheduler until the
    /// process terminates.
    pub async fn run(&self) -> Result<(), NodeError> {
        info!("starting executor");
        self.node.register().await?;
        tokio::join!(self.intake_loop(), self.scheduler_loop());
        Ok(())
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

    async fn handle_bundle(&self, bundle: &Bundle) -> Vec<Bundle> {
        if bundle.kind.is_discovery() {
            return self.node.handle_discovery(bundle).await;
        }
        match bundle.kind {
            BundleType::JobSubmit => match self.admit_job(bundle).await {
                Ok(requests) => requests,
                Err(err) => {
                    error!(error = %err, "cannot admit job");
                    Vec::new()
                }
            },
            BundleType::NdataGet => {
                self.accept_data(bundle).await;
                Vec::new()
            }
            other => {
                warn!(kind = ?other, "won't handle bundle");
                Vec::new()
            }
        }
    }

    /// Admit a `JOB_SUBMIT` bundle: cache the inline data, queue the job,
    /// and request whatever named data is still missing from the
    /// datastore group. There is no submit ack.
    async fn admit_job(&self, bundle: &Bundle) -> Result<Vec<Bundle>, ExecutorError> {
        let job: Job = rmp_serde::from_slice(&bundle.payload)?;
        debug!(module = job.metadata.wasm_module, "received job bundle");

        for (name, data) in &job.data {
            match self.storage.store_data(name, data).await {
                Ok(()) => {}
                // Redelivered data is harmless; the cache already has it.
                Err(StorageError::NameTaken(name)) => debug!(name, "data already cached"),
                Err(err) => return Err(err.into()),
            }
        }

        let missing = self.storage.find_missing(&job.metadata.required_named_data()).await;

        self.pending.write().await.push_back(job.metadata);
        self.job_ready.notify_waiters();

        if missing.is_empty() {
            return Ok(Vec::new());
        }

        info!(?missing, "job is missing named data, requesting from datastores");
        let request = Bundle::new(BundleType::NdataGet, self.node.id.clone(), Eid::store_group())
            .with_named_data(missing.into_iter().collect::<Vec<_>>());
        Ok(vec![request])
    }

    /// Store named data arriving in an `NDATA_GET` reply and wake the
    /// scheduler.
    async fn accept_data(&self, bundle: &Bundle) {
        for name in bundle.named_data_list() {
            match self.storage.store_data(&name, &bundle.payload).await {
                Ok(()) => debug!(name, "cached named data"),
                Err(StorageError::NameTaken(name)) => debug!(name, "data already cached"),
                Err(err) => error!(name, error = %err, "cannot cache named data"),
            }
        }
        self.job_ready.notify_waiters();
    }

    /// Pop the first runnable job, rotating non-runnable heads to the tail
    /// so admission order is preserved across retries. `None` if nothing
    /// is runnable right now.
    async fn pop_runnable(&self) -> Option<JobInfo> {
        // Snapshot capabilities outside the queue lock; the probe blocks
        // for the CPU sampling interval.
        let current = match tokio::task::spawn_blocking(Capabilities::from_system).await {
            Ok(caps) => caps,
            Err(err) => {
                error!(error = %err, "capability probe failed");
                return None;
            }
        };

        let mut pending = self.pending.write().await;
        for _ in 0..pending.len() {
            let job = pending.pop_front()?;
            let missing = self.storage.find_missing(&job.required_named_data()).await;
            if missing.is_empty() && current.is_capable_of(&job.capabilities) {
                return Some(job);
            }
            pending.push_back(job);
        }
        None
    }

    /// Wait until a job is runnable, run it, repeat. A failed job is
    /// logged and never stops the loop.
    async fn scheduler_loop(&self) {
        info!("starting scheduler");
        loop {
            // Arm the wakeup before re-checking the predicate so a
            // notification between the check and the wait is not lost.
            let wakeup = self.job_ready.notified();
            match self.pop_runnable().await {
                Some(job) => {
                    if let Err(err) = self.execute(&job).await {
                        error!(module = job.wasm_module, error = %err, "job failed");
                    }
                    self.job_ready.notify_waiters();
                }
                None => wakeup.await,
            }
        }
    }

    /// Run one job in a fresh sandbox directory and publish its results.
    /// The job directory is removed unconditionally afterwards.
    async fn execute(&self, job: &JobInfo) -> Result<(), ExecutorError> {
        info!(module = job.wasm_module, "starting job");
        let job_dir = self.root_dir.join(format!("job-{}", nanoid::nanoid!()));

        let outcome = self.run_in_sandbox(job, &job_dir).await;

        if let Err(err) = tokio::fs::remove_dir_all(&job_dir).await {
            if err.kind() != ErrorKind::NotFound {
                warn!(job_dir = %job_dir.display(), error = %err, "cannot remove job directory");
            }
        }

        let (results, named_results) = outcome?;
        self.send_results(job, results).await;
        self.store_named_results(&named_results).await;
        self.send_named_results(&named_results).await;
        Ok(())
    }

    async fn run_in_sandbox(
        &self,
        job: &JobInfo,
        job_dir: &Path,
    ) -> Result<(Option<Vec<u8>>, BTreeMap<String, Vec<u8>>), ExecutorError> {
        let sandbox = sandbox::prepare(&self.storage, job, job_dir).await?;

        let exit_code = runner::run_wasi_module(
            &sandbox.wasm_path,
            &job.argv,
            &job.env,
            sandbox.stdin_path.as_deref(),
            &sandbox.data_dir,
            sandbox.stdout_path.as_deref(),
            sandbox.stderr_path.as_deref(),
        )
        .await?;
        info!(exit_code, "job finished");

        let results = results::collect_results(job, &sandbox.data_dir, job_dir).await?;
        let named_results = results::collect_named_results(job, &sandbox.data_dir).await?;
        Ok((results, named_results))
    }

    /// Ship the results ZIP to the receiver named by the job, if any.
    async fn send_results(&self, job: &JobInfo, results: Option<Vec<u8>>) {
        let Some(results) = results else {
            info!("no results to send");
            return;
        };
        let Some(receiver) = &job.results_receiver else {
            info!("no result receiver specified, skipping sending results");
            return;
        };

        let bundle = Bundle::new(BundleType::JobResult, self.node.id.clone(), receiver.clone())
            .with_payload(results);
        match self.node.agent.send_bundle(bundle).await {
            Ok(reply) if reply.success => {}
            Ok(reply) => error!(error = reply.error, "agent rejected results bundle"),
            Err(err) => error!(error = %err, "error sending results bundle"),
        }
    }

    /// Cache named results locally so later jobs on this node can use
    /// them without a datastore round-trip.
    async fn store_named_results(&self, results: &BTreeMap<String, Vec<u8>>) {
        for (name, data) in results {
            match self.storage.store_data(name, data).await {
                Ok(()) => {}
                Err(err) => warn!(name, error = %err, "cannot store named result"),
            }
        }
    }

    /// Publish named results to the datastore group, one `NDATA_PUT`
    /// bundle each.
    async fn send_named_results(&self, results: &BTreeMap<String, Vec<u8>>) {
        for (name, data) in results {
            let bundle = Bundle::new(BundleType::NdataPut, self.node.id.clone(), Eid::store_group())
                .with_payload(data.clone())
                .with_named_data(name.clone());
            match self.node.agent.send_bundle(bundle).await {
                Ok(reply) if reply.success => {}
                Ok(reply) => error!(name, error = reply.error, "agent rejected named result"),
                Err(err) => error!(name, error = %err, "error sending named result"),
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
