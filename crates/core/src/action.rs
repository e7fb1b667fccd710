// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actions: the atomic, schedulable unit of work inside a [`crate::compound_job::CompoundJob`].

use crate::data_file::FileId;
use crate::define_id;
use crate::error::CoreError;
use crate::failure_cause::FailureCause;
use crate::file_location::FileLocation;
use crate::parallel_model::ParallelModel;
use async_trait::async_trait;
use smol_str::SmolStr;
use std::sync::Arc;

define_id! {
    /// Identifier of an [`Action`].
    pub struct ActionId("act-");
}

/// `NOT_READY -> READY -> STARTED -> {COMPLETED | FAILED | KILLED}`.
///
/// Terminal states are sticky: no transition out of `Completed`, `Failed`,
/// or `Killed` is ever valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    NotReady,
    Ready,
    Started,
    Completed,
    Failed,
    Killed,
}

impl ActionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionState::Completed | ActionState::Failed | ActionState::Killed)
    }
}

crate::simple_display! {
    ActionState {
        NotReady => "NOT_READY",
        Ready => "READY",
        Started => "STARTED",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Killed => "KILLED",
    }
}

/// One attempt at running an action: which host, how many cores, and when
/// it started/ended in virtual time.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionAttempt {
    pub host: SmolStr,
    pub cores_used: u32,
    pub start_date: f64,
    pub end_date: f64,
}

/// User-supplied behavior for [`ActionKind::Custom`]. `terminate` is invoked
/// if the action is killed mid-run; it defaults to a no-op.
pub trait CustomActionHandler: Send + Sync {
    fn execute(&self) -> Result<(), SmolStr>;

    fn terminate(&self) {}
}

/// Blocking MPI collectives available to an [`MpiActionHandler`] while it
/// runs, addressed implicitly by the rank that calls them.
#[async_trait(?Send)]
pub trait MpiCollectives {
    /// Suspend the calling rank until every rank of this action has also
    /// called `barrier`.
    async fn barrier(&self);

    /// Exchange one message per rank: `send[j]` is delivered to rank `j`,
    /// and the returned vector holds what every rank (including this one)
    /// sent, indexed by sender rank. Suspends until every rank has called
    /// `alltoall`.
    async fn alltoall(&self, send: Vec<SmolStr>) -> Vec<SmolStr>;
}

/// User-supplied behavior for [`ActionKind::Mpi`], run once per rank as its
/// own logical actor. Being scheduled is that rank's `MPI_Init`; returning
/// is its `MPI_Finalize`. `mpi.barrier()` and `mpi.alltoall()` are the
/// blocking collectives, ordered the same way across every rank that calls
/// them for a given action.
#[async_trait(?Send)]
pub trait MpiActionHandler: Send + Sync {
    async fn run(&self, rank: u32, num_processes: u32, mpi: &dyn MpiCollectives) -> Result<(), SmolStr>;
}

/// The ten concrete action variants.
#[derive(Clone)]
pub enum ActionKind {
    Compute {
        flops: f64,
        min_cores: u32,
        max_cores: u32,
        ram: u64,
        parallel_model: ParallelModel,
    },
    Sleep {
        duration: f64,
    },
    FileRead {
        file: FileId,
        location: FileLocation,
    },
    FileWrite {
        file: FileId,
        location: FileLocation,
    },
    FileCopy {
        file: FileId,
        src: FileLocation,
        dst: FileLocation,
    },
    FileDelete {
        file: FileId,
        location: FileLocation,
    },
    FileRegistryAdd {
        file: FileId,
        location: FileLocation,
    },
    FileRegistryDelete {
        file: FileId,
        location: FileLocation,
    },
    Custom {
        handler: Arc<dyn CustomActionHandler>,
    },
    Mpi {
        num_processes: u32,
        cores_per_process: u32,
        handler: Arc<dyn MpiActionHandler>,
    },
}

impl std::fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind_name())
    }
}

impl ActionKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ActionKind::Compute { .. } => "compute",
            ActionKind::Sleep { .. } => "sleep",
            ActionKind::FileRead { .. } => "file_read",
            ActionKind::FileWrite { .. } => "file_write",
            ActionKind::FileCopy { .. } => "file_copy",
            ActionKind::FileDelete { .. } => "file_delete",
            ActionKind::FileRegistryAdd { .. } => "file_registry_add",
            ActionKind::FileRegistryDelete { .. } => "file_registry_delete",
            ActionKind::Custom { .. } => "custom",
            ActionKind::Mpi { .. } => "mpi",
        }
    }

    pub fn min_num_cores(&self) -> u32 {
        match self {
            ActionKind::Compute { min_cores, .. } => *min_cores,
            ActionKind::Mpi { num_processes, cores_per_process, .. } => {
                num_processes * cores_per_process
            }
            _ => 1,
        }
    }

    pub fn max_num_cores(&self) -> u32 {
        match self {
            ActionKind::Compute { max_cores, .. } => *max_cores,
            ActionKind::Mpi { num_processes, cores_per_process, .. } => {
                num_processes * cores_per_process
            }
            _ => 1,
        }
    }

    pub fn min_ram_footprint(&self) -> u64 {
        match self {
            ActionKind::Compute { ram, .. } => *ram,
            _ => 0,
        }
    }
}

/// An atomic, named unit of work inside a compound job.
#[derive(Clone)]
pub struct Action {
    id: ActionId,
    name: SmolStr,
    kind: ActionKind,
    state: ActionState,
    history: Vec<ExecutionAttempt>,
    failure_cause: Option<FailureCause>,
}

impl Action {
    pub(crate) fn new(name: impl Into<SmolStr>, kind: ActionKind) -> Self {
        Self {
            id: ActionId::new(),
            name: name.into(),
            kind,
            state: ActionState::NotReady,
            history: Vec::new(),
            failure_cause: None,
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn failure_cause(&self) -> Option<&FailureCause> {
        self.failure_cause.as_ref()
    }

    pub fn history(&self) -> &[ExecutionAttempt] {
        &self.history
    }

    pub fn min_num_cores(&self) -> u32 {
        self.kind.min_num_cores()
    }

    pub fn max_num_cores(&self) -> u32 {
        self.kind.max_num_cores()
    }

    pub fn min_ram_footprint(&self) -> u64 {
        self.kind.min_ram_footprint()
    }

    /// Start date of the most recent attempt, or `-1.0` if the action has
    /// never started.
    pub fn start_date(&self) -> f64 {
        self.history.last().map(|a| a.start_date).unwrap_or(-1.0)
    }

    /// End date of the most recent attempt, or `-1.0` if the action has not
    /// reached a terminal state.
    pub fn end_date(&self) -> f64 {
        self.history.last().map(|a| a.end_date).unwrap_or(-1.0)
    }

    /// `NOT_READY -> READY`. Called by the owning job once every
    /// predecessor is `COMPLETED`.
    pub(crate) fn set_ready(&mut self) -> Result<(), CoreError> {
        if self.state != ActionState::NotReady {
            return Err(CoreError::invalid_argument(format!(
                "cannot ready action {} from state {}",
                self.name, self.state
            )));
        }
        self.state = ActionState::Ready;
        Ok(())
    }

    /// `READY -> STARTED`, recording a new execution attempt.
    pub fn start(&mut self, host: impl Into<SmolStr>, cores_used: u32, now: f64) -> Result<(), CoreError> {
        if self.state != ActionState::Ready {
            return Err(CoreError::invalid_argument(format!(
                "cannot start action {} from state {}",
                self.name, self.state
            )));
        }
        self.state = ActionState::Started;
        self.history.push(ExecutionAttempt { host: host.into(), cores_used, start_date: now, end_date: -1.0 });
        Ok(())
    }

    /// `STARTED -> COMPLETED`.
    pub fn complete(&mut self, now: f64) -> Result<(), CoreError> {
        self.terminate(ActionState::Completed, None, now)
    }

    /// `STARTED -> FAILED`, recording `cause`.
    pub fn fail(&mut self, cause: FailureCause, now: f64) -> Result<(), CoreError> {
        self.terminate(ActionState::Failed, Some(cause), now)
    }

    /// Any non-terminal state `-> FAILED`, used to cascade a predecessor's
    /// failure onto actions that will now never run.
    pub fn fail_not_ready(&mut self, cause: FailureCause, now: f64) -> Result<(), CoreError> {
        if self.state.is_terminal() {
            return Err(CoreError::invalid_argument(format!(
                "cannot cascade-fail action {} already in terminal state {}",
                self.name, self.state
            )));
        }
        self.state = ActionState::Failed;
        self.failure_cause = Some(cause);
        if self.history.last().map(|a| a.end_date) != Some(now) {
            self.history.push(ExecutionAttempt {
                host: SmolStr::default(),
                cores_used: 0,
                start_date: now,
                end_date: now,
            });
        }
        Ok(())
    }

    /// `STARTED -> KILLED`, recording `cause`.
    pub fn kill(&mut self, cause: FailureCause, now: f64) -> Result<(), CoreError> {
        self.terminate(ActionState::Killed, Some(cause), now)
    }

    fn terminate(&mut self, to: ActionState, cause: Option<FailureCause>, now: f64) -> Result<(), CoreError> {
        if self.state != ActionState::Started {
            return Err(CoreError::invalid_argument(format!(
                "cannot terminate action {} (-> {}) from state {}",
                self.name, to, self.state
            )));
        }
        self.state = to;
        self.failure_cause = cause;
        if let Some(attempt) = self.history.last_mut() {
            attempt.end_date = now;
        }
        Ok(())
    }

    /// Reset a terminated action back to `NOT_READY` so it can be retried
    /// inside a freshly resubmitted job. Used by controllers that rebuild a
    /// job definition after a host-failure cascade (see the reference
    /// end-to-end scenario for host failure recovery).
    pub fn reset_for_resubmission(&mut self) {
        self.state = ActionState::NotReady;
        self.failure_cause = None;
        self.history.clear();
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind.kind_name())
            .field("state", &self.state)
            .field("failure_cause", &self.failure_cause)
            .finish()
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
