// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A happens-before edge keeps a successor out of `ready_actions()` until its
//! predecessor has completed, serializing the two on a single-core host.

use crate::support::first_fit_service;
use async_trait::async_trait;
use hpcsim_actor::{ActorBody, ActorContext, SimKernel};
use hpcsim_core::ParallelModel;
use hpcsim_engine::JobManager;
use std::collections::BTreeMap;
use std::rc::Rc;

#[test]
fn a_dependent_action_waits_for_its_predecessor_to_finish() {
    let kernel = SimKernel::new();
    let (_daemon, registry) = first_fit_service(&kernel, "svc0", &[("host-a", 1)]);
    let jm = Rc::new(JobManager::new(registry));
    let job = jm.create_compound_job("a-then-b");
    {
        let mut job = job.borrow_mut();
        job.add_compute_action("a", 10.0, 1, 1, 0, ParallelModel::Amdahl(1.0)).unwrap();
        job.add_compute_action("b", 10.0, 1, 1, 0, ParallelModel::Amdahl(1.0)).unwrap();
        job.add_action_dependency("a", "b").unwrap();
    }

    struct Controller {
        jm: Rc<JobManager>,
        job: hpcsim_engine::SharedJob,
    }
    #[async_trait(?Send)]
    impl ActorBody for Controller {
        async fn run(&self, ctx: &ActorContext) {
            self.jm.submit_job(ctx, "svc0", &self.job, BTreeMap::new()).await.unwrap();
            self.jm.wait_for_completion(ctx, &self.job).await.unwrap();
        }
    }
    hpcsim_actor::spawn(&kernel, "controller-host", Controller { jm, job: job.clone() });
    kernel.run_to_completion();

    let job = job.borrow();
    let a = job.get_action("a").unwrap();
    let b = job.get_action("b").unwrap();
    assert_eq!(a.start_date(), 0.0);
    assert_eq!(a.end_date(), 10.0);
    assert_eq!(b.start_date(), 10.0);
    assert_eq!(b.end_date(), 20.0);
}
