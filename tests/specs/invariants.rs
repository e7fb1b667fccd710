// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property-based checks for the core execution invariants, plus two
//! non-property determinism/event-law checks run against concrete
//! scenarios: `proptest` for structural/combinatorial properties, plain
//! `#[test]`s for behavioral laws over a fixed scenario.

use crate::support::first_fit_service;
use async_trait::async_trait;
use hpcsim_actor::{ActorBody, ActorContext, SimKernel};
use hpcsim_core::{ActionState, CompoundJob, CoreError, ParallelModel};
use hpcsim_engine::{
    ComputeServiceAnswer, ComputeServiceReply, ComputeServiceRequest, JobManager, SharedJob, SimulationEvent,
};
use proptest::prelude::*;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

const ACTION_NAMES: [&str; 5] = ["n0", "n1", "n2", "n3", "n4"];

fn job_with_sleep_actions() -> CompoundJob {
    let mut job = CompoundJob::new("prop-job");
    for name in ACTION_NAMES {
        job.add_sleep_action(name, 1.0).unwrap();
    }
    job
}

fn all_edges(job: &CompoundJob) -> Vec<bool> {
    ACTION_NAMES
        .iter()
        .flat_map(|a| ACTION_NAMES.iter().map(move |b| (*a, *b)))
        .map(|(a, b)| job.has_action_dependency(a, b))
        .collect()
}

/// Reverse-BFS reachability over the job's *current* dependency edges, used
/// only as an independent check that the acyclicity invariant holds — does
/// not reuse `CompoundJob`'s own cycle check.
fn has_path(job: &CompoundJob, from: &str, to: &str) -> bool {
    // start from `from`'s direct successors so a `from == to` query only
    // reports true for an actual cycle back to the start, not trivially
    let mut frontier: Vec<String> =
        ACTION_NAMES.iter().filter(|n| job.has_action_dependency(from, n)).map(|n| n.to_string()).collect();
    let mut seen = std::collections::HashSet::new();
    while let Some(node) = frontier.pop() {
        if node == to {
            return true;
        }
        if !seen.insert(node.clone()) {
            continue;
        }
        for name in ACTION_NAMES {
            if job.has_action_dependency(&node, name) {
                frontier.push(name.to_string());
            }
        }
    }
    false
}

proptest! {
    /// SPEC invariant 2: the action DAG stays acyclic across any sequence of
    /// legal `addActionDependency` calls; an edge that would close a cycle
    /// is rejected and the DAG is left exactly as it was.
    #[test]
    fn dag_stays_acyclic_under_arbitrary_edge_sequences(
        edges in proptest::collection::vec((0usize..5, 0usize..5), 0..20)
    ) {
        let mut job = job_with_sleep_actions();
        for (p, c) in edges {
            let parent = ACTION_NAMES[p];
            let child = ACTION_NAMES[c];
            let would_cycle = p == c || has_path(&job, child, parent);
            let before = all_edges(&job);

            let result = job.add_action_dependency(parent, child);

            if would_cycle {
                prop_assert!(matches!(result, Err(CoreError::CyclicDependency { .. })));
                prop_assert_eq!(before, all_edges(&job), "a rejected edge must leave the DAG untouched");
            } else {
                prop_assert!(result.is_ok());
                for name in ACTION_NAMES {
                    prop_assert!(!has_path(&job, name, name), "adding a legal edge must never create a self-cycle");
                }
            }
        }
    }

    /// SPEC invariant 1 + 6: every action of a job run to completion on a
    /// host with exactly enough cores lands in a terminal state with
    /// `start_date <= end_date`, and the host's resources are fully
    /// released once the run ends.
    #[test]
    fn terminal_actions_have_ordered_dates_and_release_their_resources(
        flop_counts in proptest::collection::vec(1.0f64..50.0, 1..4)
    ) {
        let kernel = SimKernel::new();
        let cores = flop_counts.len() as u32;
        let (_daemon, registry) = first_fit_service(&kernel, "svc0", &[("host-a", cores)]);
        let jm = Rc::new(JobManager::new(registry));

        struct RunJob {
            jm: Rc<JobManager>,
            flops: Vec<f64>,
            job_slot: Rc<RefCell<Option<SharedJob>>>,
            resources_slot: Rc<RefCell<Option<ComputeServiceReply>>>,
        }
        #[async_trait(?Send)]
        impl ActorBody for RunJob {
            async fn run(&self, ctx: &ActorContext) {
                let job = self.jm.create_compound_job("indep-actions");
                for (i, flops) in self.flops.iter().enumerate() {
                    job.borrow_mut()
                        .add_compute_action(format!("a{i}"), *flops, 1, 1, 0, ParallelModel::Amdahl(1.0))
                        .unwrap();
                }
                *self.job_slot.borrow_mut() = Some(job.clone());
                self.jm.submit_job(ctx, "svc0", &job, BTreeMap::new()).await.unwrap();
                self.jm.wait_for_completion(ctx, &job).await.unwrap();

                let reply_port = "resource-check-reply";
                ctx.register_port(reply_port);
                ctx.put("svc0", ComputeServiceRequest::GetResourceInformation { reply_to: reply_port.into() })
                    .await
                    .unwrap();
                let reply = ctx.get::<ComputeServiceReply>(reply_port).await.unwrap();
                *self.resources_slot.borrow_mut() = Some(reply);
            }
        }
        let job_slot = Rc::new(RefCell::new(None));
        let resources_slot = Rc::new(RefCell::new(None));
        hpcsim_actor::spawn(
            &kernel,
            "controller-host",
            RunJob { jm, flops: flop_counts.clone(), job_slot: job_slot.clone(), resources_slot: resources_slot.clone() },
        );
        kernel.run_to_completion();

        let job = job_slot.borrow().clone().expect("the actor always builds and stores a job before yielding");
        let job = job.borrow();
        for action in job.actions() {
            if action.state().is_terminal() {
                prop_assert!(action.start_date() <= action.end_date());
            } else {
                prop_assert_eq!(action.state(), ActionState::NotReady);
                prop_assert_eq!(action.start_date(), -1.0);
            }
        }

        // every action used exactly one dedicated core for its whole life and
        // this host has exactly that many cores, so completion must fully
        // drain and then restore its free-core count
        match resources_slot.borrow().clone().expect("the actor always queries resources before finishing") {
            ComputeServiceReply::Answer(ComputeServiceAnswer::ResourceInformation(info)) => {
                let host = &info.hosts[0];
                prop_assert_eq!(host.free_cores, host.cores, "a finished job must fully release its host's cores");
            }
            other => prop_assert!(false, "expected a resource information reply, got {other:?}"),
        }
    }
}

#[test]
fn an_event_is_emitted_iff_every_action_of_the_job_reached_its_matching_state() {
    let kernel = SimKernel::new();
    let (_daemon, registry) = first_fit_service(&kernel, "svc0", &[("host-a", 1)]);
    let jm = Rc::new(JobManager::new(registry));

    struct RunJob {
        jm: Rc<JobManager>,
        result: Rc<RefCell<Option<SimulationEvent>>>,
    }
    #[async_trait(?Send)]
    impl ActorBody for RunJob {
        async fn run(&self, ctx: &ActorContext) {
            let job = self.jm.create_compound_job("single-action");
            job.borrow_mut().add_compute_action("a", 5.0, 1, 1, 0, ParallelModel::Amdahl(1.0)).unwrap();
            self.jm.submit_job(ctx, "svc0", &job, BTreeMap::new()).await.unwrap();
            let event = self.jm.wait_for_completion(ctx, &job).await.unwrap();
            *self.result.borrow_mut() = Some(event);
        }
    }
    let result = Rc::new(RefCell::new(None));
    hpcsim_actor::spawn(&kernel, "controller-host", RunJob { jm, result: result.clone() });
    kernel.run_to_completion();

    match result.borrow().clone().unwrap() {
        SimulationEvent::CompoundJobCompleted { .. } => {}
        other => panic!("a fully-completed job must emit CompoundJobCompleted, got {other:?}"),
    }
}

#[test]
fn two_independent_kernels_replay_the_same_scenario_identically() {
    fn run_once() -> (f64, ActionState, ActionState) {
        let kernel = SimKernel::new();
        let (_daemon, registry) = first_fit_service(&kernel, "svc0", &[("host-a", 1)]);
        let jm = Rc::new(JobManager::new(registry));
        let job = jm.create_compound_job("a-then-b");
        {
            let mut job = job.borrow_mut();
            job.add_compute_action("a", 7.0, 1, 1, 0, ParallelModel::Amdahl(1.0)).unwrap();
            job.add_compute_action("b", 3.0, 1, 1, 0, ParallelModel::Amdahl(1.0)).unwrap();
            job.add_action_dependency("a", "b").unwrap();
        }

        struct RunJob {
            jm: Rc<JobManager>,
            job: SharedJob,
        }
        #[async_trait(?Send)]
        impl ActorBody for RunJob {
            async fn run(&self, ctx: &ActorContext) {
                self.jm.submit_job(ctx, "svc0", &self.job, BTreeMap::new()).await.unwrap();
                self.jm.wait_for_completion(ctx, &self.job).await.unwrap();
            }
        }
        hpcsim_actor::spawn(&kernel, "controller-host", RunJob { jm, job: job.clone() });
        kernel.run_to_completion();

        let job = job.borrow();
        (kernel.now(), job.get_action("a").unwrap().state(), job.get_action("b").unwrap().state())
    }

    let first = run_once();
    let second = run_once();
    assert_eq!(first, second, "two independently constructed kernels must replay the same scenario identically");
}
