// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous, programmer-facing errors.
//!
//! These are raised by DAG-mutation and submission APIs before any
//! simulated time elapses. They are distinct from [`crate::failure_cause::FailureCause`],
//! which is data attached to a terminal action/job state, not a `Result::Err`.

use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(SmolStr),

    #[error("adding dependency {child} -> {parent} would create a cycle")]
    CyclicDependency { parent: SmolStr, child: SmolStr },

    #[error("action {0:?} already exists in this job")]
    DuplicateActionName(SmolStr),

    #[error("action {0:?} not found in this job")]
    UnknownAction(SmolStr),

    #[error("job has already been submitted and its DAG is frozen")]
    JobAlreadySubmitted,

    #[error("job is not in a submittable state")]
    JobNotSubmittable,
}

impl CoreError {
    pub fn invalid_argument(msg: impl Into<SmolStr>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
