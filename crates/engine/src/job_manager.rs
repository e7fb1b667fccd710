// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job manager: the surface a controller actor actually calls —
//! `createCompoundJob`/`submitJob`/`terminateJob`/`forgetJob` — sitting on
//! top of the compute service's raw commport protocol. Validates
//! service-specific arguments synchronously before ever touching a
//! commport, and republishes a service's raw completion/failure
//! notification as a [`SimulationEvent`].

use crate::error::EngineError;
use crate::event::SimulationEvent;
use crate::messages::{ComputeServiceAnswer, ComputeServiceReply, ComputeServiceRequest, ServiceJobOutcome};
use crate::{JobRegistry, SharedJob};
use hpcsim_actor::ActorContext;
use hpcsim_core::{CompoundJob, JobId};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

#[derive(Clone)]
struct JobRecord {
    service: SmolStr,
    reply_port: SmolStr,
}

/// No service-specific submission arguments are recognized by this core's
/// one compute service kind, so any argument at all is rejected; a richer
/// service would widen this to a real allow-list.
fn validate_args(args: &BTreeMap<String, String>) -> Result<(), EngineError> {
    match args.keys().next() {
        Some(key) => Err(EngineError::UnknownArgument(key.as_str().into())),
        None => Ok(()),
    }
}

/// Owns the [`JobRegistry`] jobs are resolved through and, per job, which
/// service it was submitted to and which reply port carries its eventual
/// outcome.
pub struct JobManager {
    registry: JobRegistry,
    records: RefCell<HashMap<JobId, JobRecord>>,
}

impl JobManager {
    pub fn new(registry: JobRegistry) -> Self {
        Self { registry, records: RefCell::new(HashMap::new()) }
    }

    /// Create a new, empty, `NOT_SUBMITTED` job and register it so a
    /// compute service can later resolve it from the `JobId` a submission
    /// carries over the wire.
    pub fn create_compound_job(&self, name: impl Into<SmolStr>) -> SharedJob {
        let job = Rc::new(RefCell::new(CompoundJob::new(name)));
        let id = job.borrow().id();
        self.registry.borrow_mut().insert(id, job.clone());
        job
    }

    /// Drop a terminal job from tracking. Forgetting a job that has not yet
    /// reached a terminal state is a programming error left to the caller
    /// to avoid; this core does not validate it.
    pub fn forget_job(&self, job: &SharedJob) {
        let id = job.borrow().id();
        self.registry.borrow_mut().remove(&id);
        self.records.borrow_mut().remove(&id);
    }

    /// Submit `job` to the compute service listening on `service_port`.
    /// Validates `args` before sending anything, then blocks for the
    /// service's synchronous admission answer (not for the job's eventual
    /// completion — see [`JobManager::wait_for_completion`]).
    pub async fn submit_job(
        &self,
        ctx: &ActorContext,
        service_port: &str,
        job: &SharedJob,
        args: BTreeMap<String, String>,
    ) -> Result<(), EngineError> {
        validate_args(&args)?;
        job.borrow_mut().submit()?;
        let id = job.borrow().id();
        let reply_port: SmolStr = format!("__job-manager-reply__{id}").into();
        ctx.register_port(&reply_port);
        self.records
            .borrow_mut()
            .insert(id, JobRecord { service: service_port.into(), reply_port: reply_port.clone() });

        ctx.put(service_port, ComputeServiceRequest::SubmitCompoundJob { job: id, args, reply_to: reply_port.clone() })
            .await?;
        match ctx.get::<ComputeServiceReply>(&reply_port).await? {
            ComputeServiceReply::Answer(ComputeServiceAnswer::SubmitCompoundJobAnswer { success: true, .. }) => {
                tracing::info!(job = %id, service = %service_port, "job submitted");
                Ok(())
            }
            ComputeServiceReply::Answer(ComputeServiceAnswer::SubmitCompoundJobAnswer { success: false, cause }) => {
                tracing::warn!(job = %id, cause = ?cause, "service rejected job submission");
                self.records.borrow_mut().remove(&id);
                Err(EngineError::JobTypeNotSupported)
            }
            _ => Err(EngineError::JobTypeNotSupported),
        }
    }

    /// Ask `job`'s service to terminate it. Has no effect on a job this
    /// manager never submitted.
    pub async fn terminate_job(&self, ctx: &ActorContext, job: &SharedJob) -> Result<(), EngineError> {
        let id = job.borrow().id();
        let Some(record) = self.records.borrow().get(&id).cloned() else {
            return Err(EngineError::JobTypeNotSupported);
        };
        let reply_port: SmolStr = format!("__job-manager-terminate__{id}").into();
        ctx.register_port(&reply_port);
        ctx.put(&record.service, ComputeServiceRequest::TerminateCompoundJob { job: id, reply_to: reply_port.clone() })
            .await?;
        match ctx.get::<ComputeServiceReply>(&reply_port).await? {
            ComputeServiceReply::Answer(ComputeServiceAnswer::TerminateCompoundJobAnswer { success: true, .. }) => {
                tracing::info!(job = %id, "job terminated on request");
                Ok(())
            }
            _ => Err(EngineError::JobTypeNotSupported),
        }
    }

    /// Block until `job` reaches a terminal state, translating the
    /// service's raw [`ServiceJobOutcome`] into the [`SimulationEvent`] a
    /// controller actually wants to see. `job` must already have been
    /// submitted through this manager.
    pub async fn wait_for_completion(&self, ctx: &ActorContext, job: &SharedJob) -> Result<SimulationEvent, EngineError> {
        let id = job.borrow().id();
        let Some(record) = self.records.borrow().get(&id).cloned() else {
            return Err(EngineError::JobTypeNotSupported);
        };
        match ctx.get::<ComputeServiceReply>(&record.reply_port).await? {
            ComputeServiceReply::Outcome(ServiceJobOutcome::CompoundJobCompleted { job }) => {
                Ok(SimulationEvent::CompoundJobCompleted { job, service: record.service })
            }
            ComputeServiceReply::Outcome(ServiceJobOutcome::CompoundJobFailed { job, cause }) => {
                Ok(SimulationEvent::CompoundJobFailed { job, service: record.service, cause })
            }
            ComputeServiceReply::Answer(_) => Err(EngineError::JobTypeNotSupported),
        }
    }
}

#[cfg(test)]
#[path = "job_manager_tests.rs"]
mod tests;
