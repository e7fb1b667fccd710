// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bare-metal compute service: a single perpetual actor owning a pool
//! of hosts' free resources, dispatching each submitted job's ready actions
//! onto them via a pluggable [`HostSelectionPolicy`], and republishing every
//! job's terminal outcome to its submitter.

use crate::executor::{self, kill_port_for_action};
use crate::messages::{
    ActionExecutorDone, ComputeServiceAnswer, ComputeServiceReply, ComputeServiceRequest,
    HostResourceInformation, KillSignal, ResourceInformation, ServiceJobOutcome,
};
use crate::scheduler::HostSelectionPolicy;
use crate::{JobRegistry, SharedJob};
use async_trait::async_trait;
use hpcsim_actor::{ActorBody, ActorContext, SimKernel};
use hpcsim_core::{ActionId, FailureCause, JobId, JobState, ResourceDescriptor};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::HashMap;

struct RunningAction {
    job: JobId,
    host: SmolStr,
    cores: u32,
    ram_bytes: u64,
}

struct Submission {
    job: SharedJob,
    reply_to: SmolStr,
}

struct ServiceState {
    resources: ResourceDescriptor,
    order: Vec<JobId>,
    submissions: HashMap<JobId, Submission>,
    running: HashMap<ActionId, RunningAction>,
    stopping: bool,
    pending_stop_reply: Option<SmolStr>,
}

/// A bare-metal compute service: no batch queue, no time-sharing — every
/// dispatched action gets a dedicated allocation for its whole lifetime.
pub struct ComputeService {
    name: SmolStr,
    kernel: SimKernel,
    registry: JobRegistry,
    policy: Box<dyn HostSelectionPolicy>,
    default_timeout: Option<f64>,
    state: RefCell<ServiceState>,
}

impl ComputeService {
    pub fn new(
        kernel: &SimKernel,
        name: impl Into<SmolStr>,
        resources: ResourceDescriptor,
        registry: JobRegistry,
        policy: Box<dyn HostSelectionPolicy>,
        default_timeout: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            kernel: kernel.clone(),
            registry,
            policy,
            default_timeout,
            state: RefCell::new(ServiceState {
                resources,
                order: Vec::new(),
                submissions: HashMap::new(),
                running: HashMap::new(),
                stopping: false,
                pending_stop_reply: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Commport requests are sent here; it doubles as the address this
    /// service's own action executors report back to.
    pub fn port(&self) -> &str {
        &self.name
    }

    pub fn resource_snapshot(&self) -> ResourceInformation {
        let state = self.state.borrow();
        let hosts = state
            .resources
            .hosts()
            .map(|(name, res)| HostResourceInformation {
                host: name.into(),
                cores: res.capacity().cores,
                ram_bytes: res.capacity().ram_bytes,
                free_cores: res.free_cores(),
                free_ram_bytes: res.free_ram_bytes(),
            })
            .collect();
        ResourceInformation { hosts }
    }

    fn handle_submit(&self, ctx: &ActorContext, job_id: JobId, reply_to: SmolStr) {
        let job = self.registry.borrow().get(&job_id).cloned();
        let Some(job) = job else {
            tracing::warn!(service = %self.name, job = %job_id, "submitted job is unknown to this service");
            let _ = ctx.dput(
                &reply_to,
                ComputeServiceReply::Answer(ComputeServiceAnswer::SubmitCompoundJobAnswer {
                    success: false,
                    cause: Some(FailureCause::JobTypeNotSupported),
                }),
            );
            return;
        };
        {
            let mut j = job.borrow_mut();
            j.mark_running();
            let _ = j.refresh_ready_actions();
        }
        {
            let mut state = self.state.borrow_mut();
            state.order.push(job_id);
            state.submissions.insert(job_id, Submission { job, reply_to: reply_to.clone() });
        }
        tracing::info!(service = %self.name, job = %job_id, "job submitted");
        let _ = ctx.dput(
            &reply_to,
            ComputeServiceReply::Answer(ComputeServiceAnswer::SubmitCompoundJobAnswer { success: true, cause: None }),
        );
        self.dispatch();
    }

    fn handle_terminate(&self, ctx: &ActorContext, job_id: JobId, reply_to: SmolStr) {
        let job = self.state.borrow().submissions.get(&job_id).map(|s| s.job.clone());
        let Some(job) = job else {
            let _ = ctx.dput(
                &reply_to,
                ComputeServiceReply::Answer(ComputeServiceAnswer::TerminateCompoundJobAnswer {
                    success: false,
                    cause: Some(FailureCause::JobTypeNotSupported),
                }),
            );
            return;
        };
        tracing::info!(service = %self.name, job = %job_id, "terminating job on request");
        for action in job.borrow().actions() {
            if self.state.borrow().running.contains_key(&action.id()) {
                let _ =
                    ctx.dput(&kill_port_for_action(action.name()), KillSignal { cause: FailureCause::JobKilled });
            }
        }
        let _ = job.borrow_mut().kill(ctx.now());
        let submission = self.state.borrow_mut().submissions.remove(&job_id);
        self.state.borrow_mut().order.retain(|j| *j != job_id);
        if let Some(submission) = submission {
            let _ = ctx.dput(
                &submission.reply_to,
                ComputeServiceReply::Outcome(ServiceJobOutcome::CompoundJobFailed { job: job_id, cause: FailureCause::JobKilled }),
            );
        }
        let _ = ctx.dput(
            &reply_to,
            ComputeServiceReply::Answer(ComputeServiceAnswer::TerminateCompoundJobAnswer { success: true, cause: None }),
        );
    }

    fn handle_resource_information(&self, ctx: &ActorContext, reply_to: SmolStr) {
        let _ = ctx.dput(
            &reply_to,
            ComputeServiceReply::Answer(ComputeServiceAnswer::ResourceInformation(self.resource_snapshot())),
        );
    }

    fn handle_executor_done(&self, ctx: &ActorContext, done: ActionExecutorDone) {
        {
            let mut state = self.state.borrow_mut();
            state.running.remove(&done.action);
            if let Some(host) = state.resources.get_mut(&done.host) {
                host.release(done.cores, done.ram_bytes);
            }
        }
        let still_submitted = self.state.borrow().submissions.contains_key(&done.job);
        if still_submitted {
            self.progress_job(ctx, done.job);
        }
        self.dispatch();
    }

    /// Promote newly-ready actions and, if the job just reached a terminal
    /// state, republish its outcome and drop it from tracking. Calling this
    /// whenever one of its actions finishes is how a job's terminal state is
    /// discovered without polling.
    fn progress_job(&self, ctx: &ActorContext, job_id: JobId) {
        let job = match self.state.borrow().submissions.get(&job_id) {
            Some(s) => s.job.clone(),
            None => return,
        };
        let terminal = {
            let mut j = job.borrow_mut();
            let _ = j.refresh_ready_actions();
            j.recompute_terminal_state()
        };
        let Some(state) = terminal else {
            return;
        };
        let reply_to = self.state.borrow_mut().submissions.remove(&job_id).map(|s| s.reply_to);
        self.state.borrow_mut().order.retain(|j| *j != job_id);
        let Some(reply_to) = reply_to else {
            return;
        };
        let outcome = if state == JobState::Completed {
            ServiceJobOutcome::CompoundJobCompleted { job: job_id }
        } else {
            let cause = job
                .borrow()
                .actions()
                .iter()
                .find_map(|a| a.failure_cause().filter(|c| !c.is_cascade()).cloned())
                .unwrap_or(FailureCause::JobKilled);
            ServiceJobOutcome::CompoundJobFailed { job: job_id, cause }
        };
        tracing::info!(service = %self.name, job = %job_id, state = %state, "job reached a terminal state");
        let _ = ctx.dput(&reply_to, ComputeServiceReply::Outcome(outcome));
    }

    /// Conservative scan: walk jobs in submission order, and within each
    /// job its ready actions in name order, dispatching every one a host
    /// can currently fit. A job earlier in submission order never loses a
    /// host to one submitted later (no starvation by arrival order), but a
    /// later job can still fill capacity a host earlier in the scan leaves
    /// idle.
    fn dispatch(&self) {
        let jobs = self.state.borrow().order.clone();
        for job_id in jobs {
            let job = match self.state.borrow().submissions.get(&job_id) {
                Some(s) => s.job.clone(),
                None => continue,
            };
            let ready_names: Vec<SmolStr> =
                job.borrow().ready_actions().iter().map(|a| SmolStr::from(a.name())).collect();
            for name in ready_names {
                self.try_dispatch_one(job_id, &job, &name);
            }
        }
    }

    fn try_dispatch_one(&self, job_id: JobId, job: &SharedJob, name: &str) {
        let (min_cores, max_cores, min_ram) = {
            let job_ref = job.borrow();
            let Some(action) = job_ref.get_action(name) else { return };
            (action.min_num_cores(), action.max_num_cores(), action.min_ram_footprint())
        };
        let mut state = self.state.borrow_mut();
        let Some(host) = self.policy.select(&state.resources, min_cores, min_ram) else {
            return;
        };
        let cores = {
            let free = state.resources.get(&host).map(|r| r.free_cores()).unwrap_or(0);
            free.min(max_cores).max(min_cores)
        };
        let flop_rate = state.resources.get(&host).map(|r| r.capacity().flop_rate).unwrap_or(1.0);
        let allocated = state.resources.get_mut(&host).map(|r| r.allocate(cores, min_ram)).unwrap_or(false);
        if !allocated {
            return;
        }
        let action_id = job.borrow().get_action(name).map(|a| a.id());
        let Some(action_id) = action_id else {
            if let Some(res) = state.resources.get_mut(&host) {
                res.release(cores, min_ram);
            }
            return;
        };
        state.running.insert(action_id, RunningAction { job: job_id, host: host.clone(), cores, ram_bytes: min_ram });
        drop(state);
        tracing::info!(service = %self.name, job = %job_id, action = %name, host = %host, cores, "dispatching action");
        executor::spawn(
            &self.kernel,
            job.clone(),
            job_id,
            name,
            host,
            cores,
            min_ram,
            flop_rate,
            self.default_timeout,
            self.port(),
        );
    }

    /// Stop the service: graceful lets already-dispatched actions finish and
    /// simply stops accepting new submissions beyond those in flight;
    /// brutal kills every in-flight executor and discontinues every
    /// tracked job immediately.
    fn handle_stop(&self, ctx: &ActorContext, graceful: bool, cause: Option<FailureCause>, reply_to: SmolStr) -> bool {
        tracing::info!(service = %self.name, graceful, "stop requested");
        if !graceful {
            let job_ids: Vec<JobId> = self.state.borrow().order.clone();
            for job_id in &job_ids {
                let job = self.state.borrow().submissions.get(job_id).map(|s| s.job.clone());
                let Some(job) = job else { continue };
                for action in job.borrow().actions() {
                    if self.state.borrow().running.contains_key(&action.id()) {
                        let _ = ctx.dput(
                            &kill_port_for_action(action.name()),
                            KillSignal { cause: cause.clone().unwrap_or(FailureCause::ServiceDown) },
                        );
                    }
                }
                let _ = job.borrow_mut().discontinue(ctx.now());
                let reply = self.state.borrow().submissions.get(job_id).map(|s| s.reply_to.clone());
                if let Some(reply) = reply {
                    let _ = ctx.dput(
                        &reply,
                        ComputeServiceReply::Outcome(ServiceJobOutcome::CompoundJobFailed {
                            job: *job_id,
                            cause: cause.clone().unwrap_or(FailureCause::ServiceDown),
                        }),
                    );
                }
            }
            let mut state = self.state.borrow_mut();
            state.submissions.clear();
            state.order.clear();
            state.running.clear();
            let _ = ctx.dput(&reply_to, ComputeServiceReply::Answer(ComputeServiceAnswer::DaemonStopped));
            return true;
        }
        self.state.borrow_mut().stopping = true;
        let no_work_left = self.state.borrow().running.is_empty();
        if no_work_left {
            let _ = ctx.dput(&reply_to, ComputeServiceReply::Answer(ComputeServiceAnswer::DaemonStopped));
            true
        } else {
            // The last `ActionExecutorDone` to drain `running` to empty
            // answers this request instead; see `try_finish_pending_stop`.
            self.state.borrow_mut().pending_stop_reply = Some(reply_to);
            false
        }
    }

    /// After an executor reports in, check whether a graceful stop was
    /// waiting on exactly this drain to complete.
    fn try_finish_pending_stop(&self, ctx: &ActorContext) -> bool {
        if !self.state.borrow().stopping || !self.state.borrow().running.is_empty() {
            return false;
        }
        let Some(reply_to) = self.state.borrow_mut().pending_stop_reply.take() else {
            return false;
        };
        let _ = ctx.dput(&reply_to, ComputeServiceReply::Answer(ComputeServiceAnswer::DaemonStopped));
        true
    }
}

#[async_trait(?Send)]
impl ActorBody for ComputeService {
    async fn run(&self, ctx: &ActorContext) {
        ctx.register_port(&self.name);
        loop {
            let request = match ctx.get::<ComputeServiceRequest>(&self.name).await {
                Ok(request) => request,
                Err(_) => break,
            };
            let stop_now = match request {
                ComputeServiceRequest::SubmitCompoundJob { job, reply_to, .. } => {
                    self.handle_submit(ctx, job, reply_to);
                    false
                }
                ComputeServiceRequest::TerminateCompoundJob { job, reply_to } => {
                    self.handle_terminate(ctx, job, reply_to);
                    false
                }
                ComputeServiceRequest::GetResourceInformation { reply_to } => {
                    self.handle_resource_information(ctx, reply_to);
                    false
                }
                ComputeServiceRequest::ExecutorDone(done) => {
                    self.handle_executor_done(ctx, done);
                    self.try_finish_pending_stop(ctx)
                }
                ComputeServiceRequest::Stop { graceful, cause, reply_to } => {
                    self.handle_stop(ctx, graceful, cause, reply_to)
                }
            };
            if stop_now {
                break;
            }
        }
        tracing::info!(service = %self.name, "compute service stopped");
    }
}

#[cfg(test)]
#[path = "compute_service_tests.rs"]
mod tests;
