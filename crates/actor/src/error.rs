// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors at the commport / actor-lifecycle seam.
//!
//! These are the one place a "real" Rust error is produced inside the
//! simulation's steady state; the engine crate translates them into a
//! [`hpcsim_core::FailureCause`] at the action-executor boundary.

use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommError {
    #[error("destination host '{0}' is unreachable or powered off")]
    NetworkError(SmolStr),

    #[error("operation timed out after {0} (virtual) seconds")]
    Timeout(f64),

    #[error("the sending or receiving actor was killed mid-communication")]
    PeerKilled,

    #[error("no commport named '{0}' exists")]
    UnknownPort(SmolStr),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorError {
    #[error("actor '{0}' is already registered")]
    DuplicateActor(SmolStr),

    #[error("unknown host '{0}'")]
    UnknownHost(SmolStr),

    #[error("a lifesaver already exists for actor '{0}'")]
    DuplicateLifesaver(SmolStr),

    #[error(transparent)]
    Comm(#[from] CommError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
