// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Drift Contributors

//! System capability requirements and snapshots.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

/// Required or available system resources for job scheduling.
///
/// `free_cpu_capacity` ranges from 0 to `cpu_cores * 100`: each core
/// contributes 100 units, so a 4-core system has a maximum capacity of 400.
/// Memory and disk space are in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub cpu_cores: u64,
    #[serde(default)]
    pub free_cpu_capacity: u64,
    #[serde(default)]
    pub free_memory: u64,
    #[serde(default)]
    pub free_disk_space: u64,
}

impl Capabilities {
    /// Snapshot the current system resources.
    ///
    /// Blocks for the CPU-usage sampling interval; call from a blocking
    /// context. The snapshot is best-effort and may be stale by the time a
    /// job actually starts.
    pub fn from_system() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu_cores = sys.cpus().len() as u64;
        let total_capacity = cpu_cores * 100;
        let used_capacity = (f64::from(sys.global_cpu_usage()) * cpu_cores as f64) as u64;
        let free_cpu_capacity = total_capacity.saturating_sub(used_capacity).min(total_capacity);

        let disks = Disks::new_with_refreshed_list();
        let free_disk_space = disks
            .list()
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .map(|d| d.available_space())
            .or_else(|| disks.list().iter().map(|d| d.available_space()).max())
            .unwrap_or(0);

        Self {
            cpu_cores,
            free_cpu_capacity,
            free_memory: sys.available_memory(),
            free_disk_space,
        }
    }

    /// True if this system satisfies every component of `required`.
    pub fn is_capable_of(&self, required: &Capabilities) -> bool {
        self.cpu_cores >= required.cpu_cores
            && self.free_cpu_capacity >= required.free_cpu_capacity
            && self.free_memory >= required.free_memory
            && self.free_disk_space >= required.free_disk_space
    }
}

#[cfg(test)]
#[path = "caps_tests.rs"]
mod tests;
