// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A host going off mid-action fails that action with `HostError` and fails
//! its job; the same job definition resubmitted to a service backed by a
//! different host completes normally.

use crate::support::first_fit_service;
use async_trait::async_trait;
use hpcsim_actor::{ActorBody, ActorContext, SimKernel};
use hpcsim_core::{FailureCause, ParallelModel};
use hpcsim_engine::{JobManager, SimulationEvent};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// The job definition this scenario resubmits verbatim to a second service:
/// one long Compute action, fully sequential so the granted core count
/// doesn't matter to its makespan.
fn build_job(jm: &JobManager, name: &str) -> hpcsim_engine::SharedJob {
    let job = jm.create_compound_job(name);
    job.borrow_mut().add_compute_action("work", 1000.0, 1, 1, 0, ParallelModel::Amdahl(1.0)).unwrap();
    job
}

struct Outage {
    kernel: SimKernel,
    host: &'static str,
    at: f64,
}

#[async_trait(?Send)]
impl ActorBody for Outage {
    async fn run(&self, ctx: &ActorContext) {
        ctx.sleep(self.at).await;
        self.kernel.set_host_state(self.host, false);
    }
}

struct RunJob {
    jm: Rc<JobManager>,
    service: &'static str,
    job_name: &'static str,
    result: Rc<RefCell<Option<SimulationEvent>>>,
}

#[async_trait(?Send)]
impl ActorBody for RunJob {
    async fn run(&self, ctx: &ActorContext) {
        let job = build_job(&self.jm, self.job_name);
        self.jm.submit_job(ctx, self.service, &job, BTreeMap::new()).await.unwrap();
        let event = self.jm.wait_for_completion(ctx, &job).await.unwrap();
        *self.result.borrow_mut() = Some(event);
    }
}

#[test]
fn a_host_outage_fails_the_job_but_a_second_service_runs_the_same_definition_fine() {
    let kernel = SimKernel::new();
    let (_victim, victim_registry) = first_fit_service(&kernel, "svc-victim", &[("host-a", 1)]);
    let (_survivor, survivor_registry) = first_fit_service(&kernel, "svc-survivor", &[("host-b", 1)]);

    let jm_victim = Rc::new(JobManager::new(victim_registry));
    let jm_survivor = Rc::new(JobManager::new(survivor_registry));
    let victim_result = Rc::new(RefCell::new(None));
    let survivor_result = Rc::new(RefCell::new(None));

    hpcsim_actor::spawn(&kernel, "controller-host", Outage { kernel: kernel.clone(), host: "host-a", at: 10.0 });
    hpcsim_actor::spawn(
        &kernel,
        "controller-host",
        RunJob { jm: jm_victim, service: "svc-victim", job_name: "doomed", result: victim_result.clone() },
    );
    hpcsim_actor::spawn(
        &kernel,
        "controller-host",
        RunJob { jm: jm_survivor, service: "svc-survivor", job_name: "doomed", result: survivor_result.clone() },
    );
    kernel.run_to_completion();

    match victim_result.borrow().clone().expect("victim job produced a terminal event") {
        SimulationEvent::CompoundJobFailed { cause, .. } => {
            assert_eq!(cause, FailureCause::HostError { host: "host-a".into() });
        }
        other => panic!("expected the victim job to fail, got {other:?}"),
    }

    match survivor_result.borrow().clone().expect("survivor job produced a terminal event") {
        SimulationEvent::CompoundJobCompleted { service, .. } => assert_eq!(service, "svc-survivor"),
        other => panic!("expected the survivor job to complete, got {other:?}"),
    }
    assert_eq!(kernel.now(), 1000.0, "the survivor's full 1000-flop run determines the simulation's end time");
}
