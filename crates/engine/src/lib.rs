// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hpcsim-engine: the execution core built on top of [`hpcsim_actor`]'s
//! runtime and [`hpcsim_core`]'s data model — the action executor, the
//! bare-metal compute service, and the job manager a controller submits
//! compound jobs through.

pub mod compute_service;
pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod job_manager;
pub mod messages;
pub mod scheduler;

pub use compute_service::ComputeService;
pub use config::{HostSelectionPolicyKind, SimulationConfig};
pub use error::EngineError;
pub use event::SimulationEvent;
pub use executor::ActionExecutor;
pub use job_manager::JobManager;
pub use messages::{
    ActionExecutorDone, ComputeServiceAnswer, ComputeServiceReply, ComputeServiceRequest,
    FileOperationAnswer, FileOperationRequest, HostResourceInformation, KillSignal,
    ResourceInformation, ServiceJobOutcome,
};
pub use scheduler::{BestFit, FirstFit, HostSelectionPolicy, RoundRobin};

/// A compound job shared between the controller that built it, the compute
/// service dispatching its actions, and every executor currently running
/// one of them. Single-threaded cooperative scheduling means plain
/// `Rc<RefCell<_>>` is enough; nothing here ever crosses an `await` boundary
/// that would require `Send`.
pub type SharedJob = std::rc::Rc<std::cell::RefCell<hpcsim_core::CompoundJob>>;

/// Looks up a [`SharedJob`] by [`hpcsim_core::JobId`]. A `SubmitCompoundJob`
/// request only ever carries the id over the wire (a real commport message
/// cannot carry an `Rc`); the job manager populates this registry when it
/// creates a job, and the compute service resolves it from here.
pub type JobRegistry = std::rc::Rc<std::cell::RefCell<std::collections::HashMap<hpcsim_core::JobId, SharedJob>>>;
