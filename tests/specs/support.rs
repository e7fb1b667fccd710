// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scenario-test scaffolding: a one-line way to stand up a compute
//! service over a set of named hosts, wrapped in the [`Daemon`] lifecycle
//! control a `Stop` scenario needs.

use hpcsim_actor::{Daemon, SimKernel};
use hpcsim_core::{HostCapacity, ResourceDescriptor};
use hpcsim_engine::{ComputeService, FirstFit, HostSelectionPolicy, JobRegistry};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Spin up a compute service over `hosts` (name, core count), each with a
/// uniform 1 flop/s rate and no RAM accounting, under the given policy.
pub fn spawn_service(
    kernel: &SimKernel,
    name: &str,
    hosts: &[(&str, u32)],
    policy: Box<dyn HostSelectionPolicy>,
) -> (Daemon, JobRegistry) {
    let registry: JobRegistry = Rc::new(RefCell::new(HashMap::new()));
    let mut resources = ResourceDescriptor::new();
    for (host, cores) in hosts {
        resources.add_host(*host, HostCapacity { cores: *cores, ram_bytes: 0, flop_rate: 1.0 });
    }
    let service = ComputeService::new(kernel, name, resources, registry.clone(), policy, None);
    let daemon = Daemon::spawn(kernel, format!("{name}-host"), service);
    (daemon, registry)
}

/// [`spawn_service`] defaulted to first-fit, the policy every scenario but
/// the explicitly scheduler-focused ones needs.
pub fn first_fit_service(kernel: &SimKernel, name: &str, hosts: &[(&str, u32)]) -> (Daemon, JobRegistry) {
    spawn_service(kernel, name, hosts, Box::new(FirstFit))
}
