// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hpcsim_core::{HostCapacity, ResourceDescriptor};

fn three_hosts() -> ResourceDescriptor {
    let mut resources = ResourceDescriptor::new();
    resources.add_host("host-a", HostCapacity { cores: 2, ram_bytes: 1024, flop_rate: 1.0 });
    resources.add_host("host-b", HostCapacity { cores: 8, ram_bytes: 4096, flop_rate: 1.0 });
    resources.add_host("host-c", HostCapacity { cores: 4, ram_bytes: 2048, flop_rate: 1.0 });
    resources
}

#[test]
fn first_fit_takes_the_lexicographically_first_host_that_fits() {
    let resources = three_hosts();
    let picked = FirstFit.select(&resources, 3, 0).expect("host-b and host-c both fit");
    assert_eq!(picked, "host-b");
}

#[test]
fn first_fit_returns_none_when_nothing_fits() {
    let resources = three_hosts();
    assert!(FirstFit.select(&resources, 100, 0).is_none());
}

#[test]
fn best_fit_minimizes_leftover_cores() {
    let resources = three_hosts();
    // host-c (4 cores) leaves 1 core of slack for a 3-core request, vs 5 on host-b.
    let picked = BestFit.select(&resources, 3, 0).expect("some host fits");
    assert_eq!(picked, "host-c");
}

#[test]
fn round_robin_advances_past_the_last_pick_and_wraps() {
    let resources = three_hosts();
    let policy = RoundRobin::new(0);
    assert_eq!(policy.select(&resources, 1, 0).unwrap(), "host-a");
    assert_eq!(policy.select(&resources, 1, 0).unwrap(), "host-b");
    assert_eq!(policy.select(&resources, 1, 0).unwrap(), "host-c");
    assert_eq!(policy.select(&resources, 1, 0).unwrap(), "host-a");
}

#[test]
fn round_robin_skips_hosts_that_do_not_fit_without_losing_its_place() {
    let resources = three_hosts();
    let policy = RoundRobin::new(0);
    // host-a cannot take 5 cores; the scan should fall through to host-b and
    // leave the cursor just past it.
    assert_eq!(policy.select(&resources, 5, 0).unwrap(), "host-b");
    assert_eq!(policy.select(&resources, 1, 0).unwrap(), "host-c");
}
