// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulation-wide configuration: the RNG seed, default host-selection
//! policy, and default per-action timeout threaded explicitly into the
//! compute service and job manager at construction time. Three plain
//! fields need no builder macro.

use crate::scheduler::{BestFit, FirstFit, HostSelectionPolicy, RoundRobin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostSelectionPolicyKind {
    FirstFit,
    BestFit,
    RoundRobin,
}

impl Default for HostSelectionPolicyKind {
    fn default() -> Self {
        Self::FirstFit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub default_host_selection_policy: HostSelectionPolicyKind,
    pub default_action_timeout_secs: Option<f64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { seed: 0, default_host_selection_policy: HostSelectionPolicyKind::default(), default_action_timeout_secs: None }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, crate::error::EngineError> {
        Ok(toml::from_str(text)?)
    }

    /// Build the configured default host-selection policy. `RoundRobin`'s
    /// starting offset is derived from the seed, so two configs with the
    /// same seed always start their scan at the same host.
    pub fn build_default_policy(&self) -> Box<dyn HostSelectionPolicy> {
        match self.default_host_selection_policy {
            HostSelectionPolicyKind::FirstFit => Box::new(FirstFit),
            HostSelectionPolicyKind::BestFit => Box::new(BestFit),
            HostSelectionPolicyKind::RoundRobin => {
                let start = StdRng::seed_from_u64(self.seed).gen::<usize>();
                Box::new(RoundRobin::new(start))
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
