// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hpcsim-core: the data model of a discrete-event simulation of
//! cyberinfrastructure — compound jobs, actions, files, and the resource
//! descriptors a compute service schedules them against.

pub mod macros;

pub mod action;
pub mod compound_job;
pub mod data_file;
pub mod error;
pub mod failure_cause;
pub mod file_location;
pub mod id;
pub mod parallel_model;
pub mod resource;

pub use action::{
    Action, ActionId, ActionKind, ActionState, CustomActionHandler, ExecutionAttempt, MpiActionHandler,
    MpiCollectives,
};
pub use compound_job::{CompoundJob, JobId, JobState};
pub use data_file::{DataFile, FileId, FileRegistry};
pub use error::CoreError;
pub use failure_cause::FailureCause;
pub use file_location::{sanitize_path, FileLocation};
pub use parallel_model::ParallelModel;
pub use resource::{HostCapacity, HostResources, ResourceDescriptor};
