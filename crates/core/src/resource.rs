// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-host resource capacity and availability tracking.

use smol_str::SmolStr;

/// Static capacity of a host: core count, RAM in bytes, and per-core compute
/// speed in flops/s (every core on a host runs at the same rate).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostCapacity {
    pub cores: u32,
    pub ram_bytes: u64,
    pub flop_rate: f64,
}

/// Live free-resource counters for one host. Invariant: `0 <= free <=
/// capacity` must hold at every instant observed by any actor; this type
/// only exposes checked mutators so that invariant cannot be violated from
/// outside this module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostResources {
    capacity: HostCapacity,
    free_cores: u32,
    free_ram_bytes: u64,
}

impl HostResources {
    pub fn new(capacity: HostCapacity) -> Self {
        Self { capacity, free_cores: capacity.cores, free_ram_bytes: capacity.ram_bytes }
    }

    pub fn capacity(&self) -> HostCapacity {
        self.capacity
    }

    pub fn free_cores(&self) -> u32 {
        self.free_cores
    }

    pub fn free_ram_bytes(&self) -> u64 {
        self.free_ram_bytes
    }

    pub fn can_fit(&self, cores: u32, ram_bytes: u64) -> bool {
        self.free_cores >= cores && self.free_ram_bytes >= ram_bytes
    }

    /// Slack this host would have left after allocating `cores`/`ram_bytes`,
    /// used by the best-fit host-selection policy. `None` if it does not fit.
    pub fn slack(&self, cores: u32, ram_bytes: u64) -> Option<(u32, u64)> {
        if !self.can_fit(cores, ram_bytes) {
            return None;
        }
        Some((self.free_cores - cores, self.free_ram_bytes - ram_bytes))
    }

    /// Deduct `cores`/`ram_bytes` from the free pool. Returns `false`
    /// without mutating state if the allocation does not fit.
    #[must_use]
    pub fn allocate(&mut self, cores: u32, ram_bytes: u64) -> bool {
        if !self.can_fit(cores, ram_bytes) {
            return false;
        }
        self.free_cores -= cores;
        self.free_ram_bytes -= ram_bytes;
        true
    }

    /// Re-credit a previously allocated `cores`/`ram_bytes`, clamped to
    /// capacity so a double-release can never push availability above it.
    pub fn release(&mut self, cores: u32, ram_bytes: u64) {
        self.free_cores = (self.free_cores + cores).min(self.capacity.cores);
        self.free_ram_bytes = (self.free_ram_bytes + ram_bytes).min(self.capacity.ram_bytes);
    }
}

/// A named, ordered collection of hosts and their resources, as consumed by
/// a compute service. Ordered by host name for deterministic iteration
/// (platform-declaration order is not tracked since platform parsing is out
/// of scope; see `DESIGN.md`).
#[derive(Debug, Clone, Default)]
pub struct ResourceDescriptor {
    hosts: std::collections::BTreeMap<SmolStr, HostResources>,
}

impl ResourceDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_host(&mut self, name: impl Into<SmolStr>, capacity: HostCapacity) {
        self.hosts.insert(name.into(), HostResources::new(capacity));
    }

    pub fn remove_host(&mut self, name: &str) -> Option<HostResources> {
        self.hosts.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&HostResources> {
        self.hosts.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut HostResources> {
        self.hosts.get_mut(name)
    }

    /// Hosts in deterministic (lexicographic) order.
    pub fn hosts(&self) -> impl Iterator<Item = (&str, &HostResources)> {
        self.hosts.iter().map(|(name, res)| (name.as_str(), res))
    }

    pub fn max_cores_on_any_host(&self) -> u32 {
        self.hosts.values().map(|h| h.capacity().cores).max().unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
