// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Amdahl's law governs how many of a host's free cores a Compute action
//! actually uses, and therefore its makespan.

use crate::support::first_fit_service;
use async_trait::async_trait;
use hpcsim_actor::{ActorBody, ActorContext, SimKernel};
use hpcsim_core::ParallelModel;
use hpcsim_engine::JobManager;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

struct RunJob {
    jm: Rc<JobManager>,
    cores: u32,
    alpha: f64,
}

#[async_trait(?Send)]
impl ActorBody for RunJob {
    async fn run(&self, ctx: &ActorContext) {
        let job = self.jm.create_compound_job("amdahl");
        job.borrow_mut()
            .add_compute_action("compute", 100.0, 1, self.cores, 0, ParallelModel::Amdahl(self.alpha))
            .unwrap();
        self.jm.submit_job(ctx, "svc0", &job, BTreeMap::new()).await.unwrap();
        self.jm.wait_for_completion(ctx, &job).await.unwrap();
    }
}

#[yare::parameterized(
    fully_sequential = { 4, 0.0, 100.0 },
    fully_parallel = { 4, 1.0, 25.0 },
    partially_parallel = { 4, 0.3, 77.5 },
    single_core_ignores_alpha = { 1, 0.3, 100.0 },
)]
fn makespan_follows_amdahls_law(cores: u32, alpha: f64, expected_makespan: f64) {
    let kernel = SimKernel::new();
    let (_daemon, registry) = first_fit_service(&kernel, "svc0", &[("host-a", cores)]);
    let jm = Rc::new(JobManager::new(registry));
    hpcsim_actor::spawn(&kernel, "controller-host", RunJob { jm, cores, alpha });
    kernel.run_to_completion();

    assert_eq!(kernel.now(), expected_makespan);
}
