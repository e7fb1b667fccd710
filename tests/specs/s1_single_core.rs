// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single Compute action on a single-core host completes in exactly the
//! virtual time its flop count implies.

use crate::support::first_fit_service;
use async_trait::async_trait;
use hpcsim_actor::{ActorBody, ActorContext, SimKernel};
use hpcsim_core::ParallelModel;
use hpcsim_engine::{JobManager, SimulationEvent};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

struct RunJob {
    jm: Rc<JobManager>,
    result: Rc<RefCell<Option<SimulationEvent>>>,
}

#[async_trait(?Send)]
impl ActorBody for RunJob {
    async fn run(&self, ctx: &ActorContext) {
        let job = self.jm.create_compound_job("single-compute");
        job.borrow_mut()
            .add_compute_action("compute", 100.0, 1, 1, 0, ParallelModel::Amdahl(1.0))
            .unwrap();
        self.jm.submit_job(ctx, "svc0", &job, BTreeMap::new()).await.unwrap();
        let event = self.jm.wait_for_completion(ctx, &job).await.unwrap();
        *self.result.borrow_mut() = Some(event);
    }
}

#[test]
fn a_single_core_compute_action_completes_at_its_flop_count() {
    let kernel = SimKernel::new();
    let (_daemon, registry) = first_fit_service(&kernel, "svc0", &[("host-a", 1)]);
    let jm = Rc::new(JobManager::new(registry));
    let result = Rc::new(RefCell::new(None));
    hpcsim_actor::spawn(&kernel, "controller-host", RunJob { jm, result: result.clone() });
    kernel.run_to_completion();

    assert_eq!(kernel.now(), 100.0);
    match result.borrow().clone().expect("job produced a terminal event") {
        SimulationEvent::CompoundJobCompleted { service, .. } => assert_eq!(service, "svc0"),
        other => panic!("expected completion, got {other:?}"),
    }
}
