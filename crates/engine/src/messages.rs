// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bare-metal compute service's public message contract and the
//! internal `ActionExecutorDone` notification an action executor sends back
//! when its action reaches a terminal state.

use hpcsim_core::{ActionId, FailureCause, FileId, FileLocation, JobId};
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// A request to the compute service, carrying the commport the caller wants
/// the matching answer delivered to.
///
/// `ExecutorDone` is the one variant with no `reply_to`: it is the internal
/// notification an [`crate::executor::ActionExecutor`] sends back on this
/// same port, folded into the request enum so the service's whole lifetime
/// is a single-port receive loop rather than a `wait_any` over two ports.
#[derive(Clone)]
pub enum ComputeServiceRequest {
    SubmitCompoundJob {
        job: JobId,
        args: BTreeMap<String, String>,
        reply_to: SmolStr,
    },
    TerminateCompoundJob {
        job: JobId,
        reply_to: SmolStr,
    },
    GetResourceInformation {
        reply_to: SmolStr,
    },
    Stop {
        graceful: bool,
        cause: Option<FailureCause>,
        reply_to: SmolStr,
    },
    ExecutorDone(ActionExecutorDone),
}

#[derive(Debug, Clone)]
pub enum ComputeServiceAnswer {
    SubmitCompoundJobAnswer { success: bool, cause: Option<FailureCause> },
    TerminateCompoundJobAnswer { success: bool, cause: Option<FailureCause> },
    ResourceInformation(ResourceInformation),
    DaemonStopped,
}

/// Everything that can arrive on a submitter's own reply port: the
/// synchronous answer to whichever request it just made, or — later,
/// asynchronously — the raw completion/failure of a job it submitted.
#[derive(Debug, Clone)]
pub enum ComputeServiceReply {
    Answer(ComputeServiceAnswer),
    Outcome(ServiceJobOutcome),
}

/// A snapshot of one host's static capacity and live free counters, as
/// returned by `GetResourceInformation`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostResourceInformation {
    pub host: SmolStr,
    pub cores: u32,
    pub ram_bytes: u64,
    pub free_cores: u32,
    pub free_ram_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceInformation {
    pub hosts: Vec<HostResourceInformation>,
}

/// Sent by an action executor to the compute service's internal port
/// exactly once, when the action it was running reaches a terminal state.
#[derive(Debug, Clone)]
pub struct ActionExecutorDone {
    pub job: JobId,
    pub action: ActionId,
    pub host: SmolStr,
    pub cores: u32,
    pub ram_bytes: u64,
}

/// Raw, per-service completion/failure notification, later republished by
/// the job manager as a user-facing event.
#[derive(Debug, Clone)]
pub enum ServiceJobOutcome {
    CompoundJobCompleted { job: JobId },
    CompoundJobFailed { job: JobId, cause: FailureCause },
}

/// Storage-service request contract consumed (not implemented) by this
/// core: the executor issues these from File* action handlers and
/// translates the matching `FileOperationAnswer` into the action's terminal
/// state and cause.
#[derive(Debug, Clone)]
pub enum FileOperationRequest {
    Read { file: FileId, location: FileLocation, reply_to: SmolStr },
    Write { file: FileId, location: FileLocation, reply_to: SmolStr },
    Copy { file: FileId, src: FileLocation, dst: FileLocation, reply_to: SmolStr },
    Delete { file: FileId, location: FileLocation, reply_to: SmolStr },
    RegistryAdd { file: FileId, location: FileLocation, reply_to: SmolStr },
    RegistryDelete { file: FileId, location: FileLocation, reply_to: SmolStr },
}

#[derive(Debug, Clone)]
pub struct FileOperationAnswer {
    pub success: bool,
    pub cause: Option<FailureCause>,
}

/// Sent by the compute service to one action executor's private kill port
/// to terminate it cooperatively.
#[derive(Debug, Clone)]
pub struct KillSignal {
    pub cause: FailureCause,
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
