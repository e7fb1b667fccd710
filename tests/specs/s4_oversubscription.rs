// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three actions that each need every core a two-core host has, submitted
//! together, never run concurrently — the host is never oversubscribed, and
//! all three still eventually complete.

use crate::support::first_fit_service;
use async_trait::async_trait;
use hpcsim_actor::{ActorBody, ActorContext, SimKernel};
use hpcsim_core::{ActionState, ParallelModel};
use hpcsim_engine::{JobManager, SharedJob};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

struct Controller {
    jm: Rc<JobManager>,
    result: Rc<RefCell<Vec<SharedJob>>>,
}

#[async_trait(?Send)]
impl ActorBody for Controller {
    async fn run(&self, ctx: &ActorContext) {
        let mut jobs = Vec::new();
        for name in ["job-a", "job-b", "job-c"] {
            let job = self.jm.create_compound_job(name);
            job.borrow_mut().add_compute_action("work", 20.0, 2, 2, 0, ParallelModel::Amdahl(1.0)).unwrap();
            self.jm.submit_job(ctx, "svc0", &job, BTreeMap::new()).await.unwrap();
            jobs.push(job);
        }
        for job in &jobs {
            self.jm.wait_for_completion(ctx, job).await.unwrap();
        }
        *self.result.borrow_mut() = jobs;
    }
}

#[test]
fn a_two_core_host_never_runs_two_two_core_actions_at_once() {
    let kernel = SimKernel::new();
    let (_daemon, registry) = first_fit_service(&kernel, "svc0", &[("host-a", 2)]);
    let jm = Rc::new(JobManager::new(registry));
    let result = Rc::new(RefCell::new(Vec::new()));
    hpcsim_actor::spawn(&kernel, "controller-host", Controller { jm, result: result.clone() });
    kernel.run_to_completion();

    let jobs = result.borrow();
    assert_eq!(jobs.len(), 3, "all three jobs must have reached completion to be recorded");

    let mut intervals: Vec<(f64, f64)> = jobs
        .iter()
        .map(|job| {
            let job = job.borrow();
            assert_eq!(job.state(), hpcsim_core::JobState::Completed);
            let action = job.get_action("work").unwrap();
            assert_eq!(action.state(), ActionState::Completed);
            (action.start_date(), action.end_date())
        })
        .collect();
    intervals.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    // no two of the three 2-core actions ever overlap on a 2-core host
    for pair in intervals.windows(2) {
        let (_, end_first) = pair[0];
        let (start_second, _) = pair[1];
        assert!(start_second >= end_first, "overlapping intervals {pair:?} oversubscribe the host");
    }
    assert_eq!(kernel.now(), 30.0, "three serialized 10s-per-job runs at full parallelism finish at t=30");
}
