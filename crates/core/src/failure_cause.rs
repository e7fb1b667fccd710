// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The simulated-outcome failure taxonomy.
//!
//! Unlike [`crate::error::CoreError`], a `FailureCause` is never returned as
//! a Rust `Result::Err` in steady state — it is data carried on a terminal
//! [`crate::action::Action`] or [`crate::compound_job::CompoundJob`] state.

use smol_str::SmolStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureCause {
    /// The host an action was running on turned off mid-execution.
    HostError { host: SmolStr },
    /// A commport send/receive could not reach its destination.
    NetworkError,
    /// No host could satisfy the action's resource requirement.
    NotEnoughResources,
    /// A referenced file does not exist at the expected location.
    FileNotFound { file: SmolStr },
    /// A storage service is out of capacity.
    StorageFull { location: SmolStr },
    /// The service the action was submitted to is not running.
    ServiceDown,
    /// The service does not know how to run this kind of job.
    JobTypeNotSupported,
    /// A user-supplied lambda (Custom/MPI) panicked or returned an unexpected error.
    FatalFailure { message: SmolStr },
    /// The action's wall/virtual timeout elapsed before completion.
    OperationTimeout,
    /// A spawned compute thread terminated unexpectedly.
    ComputeThreadDied,
    /// The owning job or action was explicitly terminated.
    JobKilled,
    /// A predecessor of this action failed, so it was never attempted.
    ParentFailed { action: SmolStr },
}

crate::simple_display! {
    FailureCause {
        HostError(..) => "host error",
        NetworkError => "network error",
        NotEnoughResources => "not enough resources",
        FileNotFound(..) => "file not found",
        StorageFull(..) => "storage full",
        ServiceDown => "service down",
        JobTypeNotSupported => "job type not supported",
        FatalFailure(..) => "fatal failure",
        OperationTimeout => "operation timeout",
        ComputeThreadDied => "compute thread died",
        JobKilled => "job killed",
        ParentFailed(..) => "parent action failed",
    }
}

impl FailureCause {
    /// Whether this cause is itself a cascade from another action's failure,
    /// as opposed to a root cause worth reporting to the controller.
    pub fn is_cascade(&self) -> bool {
        matches!(self, FailureCause::ParentFailed { .. })
    }
}

#[cfg(test)]
#[path = "failure_cause_tests.rs"]
mod tests;
