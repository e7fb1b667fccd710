// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-selection policies for the bare-metal compute service's dispatch
//! loop: given a resource snapshot and a requested `(cores, ram)`, pick a
//! host that can fit it. Pluggable per the "scheduler as a strategy
//! function" design note; default is first-fit.

use hpcsim_core::ResourceDescriptor;
use smol_str::SmolStr;
use std::cell::Cell;

pub trait HostSelectionPolicy {
    /// Pick a host with at least `cores`/`ram_bytes` free, or `None` if no
    /// host currently fits.
    fn select(&self, resources: &ResourceDescriptor, cores: u32, ram_bytes: u64) -> Option<SmolStr>;

    fn name(&self) -> &'static str;
}

/// Scans hosts in their stable (lexicographic) order and takes the first
/// that fits.
#[derive(Debug, Default)]
pub struct FirstFit;

impl HostSelectionPolicy for FirstFit {
    fn select(&self, resources: &ResourceDescriptor, cores: u32, ram_bytes: u64) -> Option<SmolStr> {
        resources
            .hosts()
            .find(|(_, res)| res.can_fit(cores, ram_bytes))
            .map(|(name, _)| SmolStr::from(name))
    }

    fn name(&self) -> &'static str {
        "first-fit"
    }
}

/// Picks the host that would have the least slack left over, so large jobs
/// are not starved by small ones scattered across many hosts. Ties break on
/// smaller RAM slack, then on host name for determinism.
#[derive(Debug, Default)]
pub struct BestFit;

impl HostSelectionPolicy for BestFit {
    fn select(&self, resources: &ResourceDescriptor, cores: u32, ram_bytes: u64) -> Option<SmolStr> {
        resources
            .hosts()
            .filter_map(|(name, res)| res.slack(cores, ram_bytes).map(|slack| (name, slack)))
            .min_by(|(name_a, slack_a), (name_b, slack_b)| {
                slack_a.0.cmp(&slack_b.0).then_with(|| slack_a.1.cmp(&slack_b.1)).then_with(|| name_a.cmp(name_b))
            })
            .map(|(name, _)| SmolStr::from(name))
    }

    fn name(&self) -> &'static str {
        "best-fit"
    }
}

/// Resumes scanning from the host after the last one picked, wrapping
/// around. Starting index is fixed at construction so behavior stays
/// deterministic across runs built from the same seed.
#[derive(Debug)]
pub struct RoundRobin {
    next_index: Cell<usize>,
}

impl RoundRobin {
    pub fn new(start_index: usize) -> Self {
        Self { next_index: Cell::new(start_index) }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new(0)
    }
}

impl HostSelectionPolicy for RoundRobin {
    fn select(&self, resources: &ResourceDescriptor, cores: u32, ram_bytes: u64) -> Option<SmolStr> {
        let hosts: Vec<(&str, _)> = resources.hosts().collect();
        if hosts.is_empty() {
            return None;
        }
        let start = self.next_index.get() % hosts.len();
        for offset in 0..hosts.len() {
            let idx = (start + offset) % hosts.len();
            let (name, res) = &hosts[idx];
            if res.can_fit(cores, ram_bytes) {
                self.next_index.set((idx + 1) % hosts.len());
                return Some(SmolStr::from(*name));
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
