// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing events delivered to a controller's receive port. These are
//! what `JobManager` republishes from the raw service outcomes it receives;
//! a submitter never sees a `ComputeServiceAnswer` directly.

use hpcsim_core::{FailureCause, JobId};
use smol_str::SmolStr;

#[derive(Debug, Clone)]
pub enum SimulationEvent {
    CompoundJobCompleted {
        job: JobId,
        service: SmolStr,
    },
    CompoundJobFailed {
        job: JobId,
        service: SmolStr,
        cause: FailureCause,
    },
}

impl SimulationEvent {
    pub fn job(&self) -> JobId {
        match self {
            SimulationEvent::CompoundJobCompleted { job, .. } => *job,
            SimulationEvent::CompoundJobFailed { job, .. } => *job,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
