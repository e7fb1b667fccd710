// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A graceful `Stop` drains in-flight work before the service exits; a
//! brutal `Stop` kills everything running right now and fails every job it
//! was running, immediately, with the cause the caller supplied.

use crate::support::first_fit_service;
use async_trait::async_trait;
use hpcsim_actor::{ActorBody, ActorContext, SimKernel};
use hpcsim_core::{ActionState, FailureCause, JobState, ParallelModel};
use hpcsim_engine::{ComputeServiceAnswer, ComputeServiceReply, ComputeServiceRequest, JobManager, SimulationEvent};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

fn two_action_job(jm: &JobManager) -> hpcsim_engine::SharedJob {
    let job = jm.create_compound_job("two-parallel-actions");
    job.borrow_mut().add_compute_action("a", 20.0, 1, 1, 0, ParallelModel::Amdahl(1.0)).unwrap();
    job.borrow_mut().add_compute_action("b", 20.0, 1, 1, 0, ParallelModel::Amdahl(1.0)).unwrap();
    job
}

struct SubmitThenStop {
    jm: Rc<JobManager>,
    graceful: bool,
    cause: Option<FailureCause>,
    job: hpcsim_engine::SharedJob,
    submit_result: Rc<RefCell<Option<SimulationEvent>>>,
    stop_reply_port: SmolStr,
    stop_result: Rc<RefCell<Option<ComputeServiceReply>>>,
}

#[async_trait(?Send)]
impl ActorBody for SubmitThenStop {
    async fn run(&self, ctx: &ActorContext) {
        self.jm.submit_job(ctx, "svc0", &self.job, BTreeMap::new()).await.unwrap();
        ctx.sleep(5.0).await;
        ctx.register_port(&self.stop_reply_port);
        ctx.put(
            "svc0",
            ComputeServiceRequest::Stop { graceful: self.graceful, cause: self.cause.clone(), reply_to: self.stop_reply_port.clone() },
        )
        .await
        .unwrap();
        let reply = ctx.get::<ComputeServiceReply>(&self.stop_reply_port).await.unwrap();
        *self.stop_result.borrow_mut() = Some(reply);
        let event = self.jm.wait_for_completion(ctx, &self.job).await.unwrap();
        *self.submit_result.borrow_mut() = Some(event);
    }
}

#[test]
fn a_graceful_stop_lets_both_actions_finish_before_the_service_exits() {
    let kernel = SimKernel::new();
    let (_daemon, registry) = first_fit_service(&kernel, "svc0", &[("host-a", 2)]);
    let jm = Rc::new(JobManager::new(registry));
    let job = two_action_job(&jm);
    let submit_result = Rc::new(RefCell::new(None));
    let stop_result = Rc::new(RefCell::new(None));
    hpcsim_actor::spawn(
        &kernel,
        "controller-host",
        SubmitThenStop {
            jm,
            graceful: true,
            cause: None,
            job: job.clone(),
            submit_result: submit_result.clone(),
            stop_reply_port: "stop-reply".into(),
            stop_result: stop_result.clone(),
        },
    );
    kernel.run_to_completion();

    assert_eq!(kernel.now(), 20.0, "graceful stop waits for both in-flight actions to reach t=20");
    match stop_result.borrow().clone().expect("stop produced a reply") {
        ComputeServiceReply::Answer(ComputeServiceAnswer::DaemonStopped) => {}
        other => panic!("expected DaemonStopped, got {other:?}"),
    }
    match submit_result.borrow().clone().expect("job produced a terminal event") {
        SimulationEvent::CompoundJobCompleted { .. } => {}
        other => panic!("expected the job to complete normally, got {other:?}"),
    }
    let job = job.borrow();
    assert_eq!(job.get_action("a").unwrap().state(), ActionState::Completed);
    assert_eq!(job.get_action("b").unwrap().state(), ActionState::Completed);
}

#[test]
fn a_brutal_stop_kills_every_in_flight_action_and_fails_the_job_immediately() {
    let kernel = SimKernel::new();
    let (_daemon, registry) = first_fit_service(&kernel, "svc0", &[("host-a", 2)]);
    let jm = Rc::new(JobManager::new(registry));
    let job = two_action_job(&jm);
    let submit_result = Rc::new(RefCell::new(None));
    let stop_result = Rc::new(RefCell::new(None));
    hpcsim_actor::spawn(
        &kernel,
        "controller-host",
        SubmitThenStop {
            jm,
            graceful: false,
            cause: Some(FailureCause::ServiceDown),
            job: job.clone(),
            submit_result: submit_result.clone(),
            stop_reply_port: "stop-reply".into(),
            stop_result: stop_result.clone(),
        },
    );
    kernel.run_to_completion();

    assert_eq!(kernel.now(), 5.0, "a brutal stop answers and fails the job immediately, not at the actions' natural end");
    match stop_result.borrow().clone().expect("stop produced a reply") {
        ComputeServiceReply::Answer(ComputeServiceAnswer::DaemonStopped) => {}
        other => panic!("expected DaemonStopped, got {other:?}"),
    }
    match submit_result.borrow().clone().expect("job produced a terminal event") {
        SimulationEvent::CompoundJobFailed { cause, .. } => assert_eq!(cause, FailureCause::ServiceDown),
        other => panic!("expected the job to fail with ServiceDown, got {other:?}"),
    }
    let job = job.borrow();
    assert_eq!(job.state(), JobState::Discontinued);
    assert_eq!(job.get_action("a").unwrap().state(), ActionState::Killed);
    assert_eq!(job.get_action("b").unwrap().state(), ActionState::Killed);
}
