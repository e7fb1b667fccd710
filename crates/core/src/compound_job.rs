// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compound jobs: a named, acyclic DAG of [`Action`]s.

use crate::action::{Action, ActionId, ActionKind, ActionState, CustomActionHandler, MpiActionHandler};
use crate::data_file::FileId;
use crate::define_id;
use crate::error::CoreError;
use crate::failure_cause::FailureCause;
use crate::file_location::FileLocation;
use crate::parallel_model::ParallelModel;
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

define_id! {
    /// Identifier of a [`CompoundJob`].
    pub struct JobId("job-");
}

/// `NOT_SUBMITTED -> PENDING -> RUNNING -> {COMPLETED | FAILED | KILLED | DISCONTINUED}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    NotSubmitted,
    Pending,
    Running,
    Completed,
    Failed,
    Killed,
    Discontinued,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Killed | JobState::Discontinued
        )
    }
}

crate::simple_display! {
    JobState {
        NotSubmitted => "NOT_SUBMITTED",
        Pending => "PENDING",
        Running => "RUNNING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Killed => "KILLED",
        Discontinued => "DISCONTINUED",
    }
}

/// A named DAG of actions. The job exclusively owns its actions; actions
/// never hold a pointer back to the job, only an index resolvable through
/// it, so the job's lifetime bounds the actions' lifetime by construction.
pub struct CompoundJob {
    id: JobId,
    name: SmolStr,
    actions: Vec<Action>,
    index_by_name: HashMap<SmolStr, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    state: JobState,
}

impl CompoundJob {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            id: JobId::new(),
            name: name.into(),
            actions: Vec::new(),
            index_by_name: HashMap::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            state: JobState::NotSubmitted,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn get_action(&self, name: &str) -> Option<&Action> {
        self.index_by_name.get(name).map(|&i| &self.actions[i])
    }

    pub fn get_action_mut(&mut self, name: &str) -> Option<&mut Action> {
        match self.index_by_name.get(name) {
            Some(&i) => Some(&mut self.actions[i]),
            None => None,
        }
    }

    /// Does a direct `parent -> child` edge exist? Unknown names report
    /// `false` rather than panicking.
    pub fn has_action_dependency(&self, parent: &str, child: &str) -> bool {
        let (Some(&p), Some(&c)) = (self.index_by_name.get(parent), self.index_by_name.get(child)) else {
            return false;
        };
        self.successors[p].contains(&c)
    }

    fn require_not_submitted(&self) -> Result<(), CoreError> {
        if self.state != JobState::NotSubmitted {
            return Err(CoreError::JobAlreadySubmitted);
        }
        Ok(())
    }

    fn add_action(&mut self, name: impl Into<SmolStr>, kind: ActionKind) -> Result<ActionId, CoreError> {
        self.require_not_submitted()?;
        let name = name.into();
        if self.index_by_name.contains_key(name.as_str()) {
            return Err(CoreError::DuplicateActionName(name));
        }
        let action = Action::new(name.clone(), kind);
        let id = action.id();
        let index = self.actions.len();
        self.index_by_name.insert(name, index);
        self.actions.push(action);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        Ok(id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_compute_action(
        &mut self,
        name: impl Into<SmolStr>,
        flops: f64,
        min_cores: u32,
        max_cores: u32,
        ram: u64,
        parallel_model: ParallelModel,
    ) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::Compute { flops, min_cores, max_cores, ram, parallel_model })
    }

    pub fn add_sleep_action(&mut self, name: impl Into<SmolStr>, duration: f64) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::Sleep { duration })
    }

    pub fn add_file_read_action(
        &mut self,
        name: impl Into<SmolStr>,
        file: FileId,
        location: FileLocation,
    ) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::FileRead { file, location })
    }

    pub fn add_file_write_action(
        &mut self,
        name: impl Into<SmolStr>,
        file: FileId,
        location: FileLocation,
    ) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::FileWrite { file, location })
    }

    pub fn add_file_copy_action(
        &mut self,
        name: impl Into<SmolStr>,
        file: FileId,
        src: FileLocation,
        dst: FileLocation,
    ) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::FileCopy { file, src, dst })
    }

    pub fn add_file_delete_action(
        &mut self,
        name: impl Into<SmolStr>,
        file: FileId,
        location: FileLocation,
    ) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::FileDelete { file, location })
    }

    pub fn add_file_registry_add_action(
        &mut self,
        name: impl Into<SmolStr>,
        file: FileId,
        location: FileLocation,
    ) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::FileRegistryAdd { file, location })
    }

    pub fn add_file_registry_delete_action(
        &mut self,
        name: impl Into<SmolStr>,
        file: FileId,
        location: FileLocation,
    ) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::FileRegistryDelete { file, location })
    }

    pub fn add_custom_action(
        &mut self,
        name: impl Into<SmolStr>,
        handler: Arc<dyn CustomActionHandler>,
    ) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::Custom { handler })
    }

    pub fn add_mpi_action(
        &mut self,
        name: impl Into<SmolStr>,
        num_processes: u32,
        cores_per_process: u32,
        handler: Arc<dyn MpiActionHandler>,
    ) -> Result<ActionId, CoreError> {
        self.add_action(name, ActionKind::Mpi { num_processes, cores_per_process, handler })
    }

    /// Add a happens-before edge `parent -> child`. Fails with
    /// [`CoreError::CyclicDependency`] if `child` can already reach `parent`
    /// through existing edges (which would close a cycle) and leaves the
    /// DAG unchanged in that case.
    pub fn add_action_dependency(&mut self, parent: &str, child: &str) -> Result<(), CoreError> {
        self.require_not_submitted()?;
        let p = *self
            .index_by_name
            .get(parent)
            .ok_or_else(|| CoreError::UnknownAction(parent.into()))?;
        let c = *self
            .index_by_name
            .get(child)
            .ok_or_else(|| CoreError::UnknownAction(child.into()))?;
        if p == c || self.can_reach(c, p) {
            return Err(CoreError::CyclicDependency { parent: parent.into(), child: child.into() });
        }
        self.successors[p].push(c);
        self.predecessors[c].push(p);
        Ok(())
    }

    /// Reverse-BFS reachability check: can `from` reach `to` by following
    /// existing successor edges?
    fn can_reach(&self, from: usize, to: usize) -> bool {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(from);
        queue.push_back(from);
        while let Some(node) = queue.pop_front() {
            if node == to {
                return true;
            }
            for &next in &self.successors[node] {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Promote every `NOT_READY` action whose predecessors are all
    /// `COMPLETED` to `READY`. Called by the owning service after any
    /// action completes.
    pub fn refresh_ready_actions(&mut self) -> Result<(), CoreError> {
        for index in 0..self.actions.len() {
            if self.actions[index].state() != ActionState::NotReady {
                continue;
            }
            let all_done = self.predecessors[index]
                .iter()
                .all(|&p| self.actions[p].state() == ActionState::Completed);
            if all_done {
                self.actions[index].set_ready()?;
            }
        }
        Ok(())
    }

    /// Every `READY` action, ordered by name for deterministic dispatch.
    pub fn ready_actions(&self) -> Vec<&Action> {
        let mut ready: Vec<&Action> =
            self.actions.iter().filter(|a| a.state() == ActionState::Ready).collect();
        ready.sort_by(|a, b| a.name().cmp(b.name()));
        ready
    }

    /// Cascade-fail every non-terminal successor (transitively) of `name`
    /// with [`FailureCause::ParentFailed`], because they can now never run.
    pub fn cascade_fail_successors(&mut self, name: &str, now: f64) -> Result<(), CoreError> {
        let Some(&start) = self.index_by_name.get(name) else {
            return Err(CoreError::UnknownAction(name.into()));
        };
        let mut queue: VecDeque<usize> = self.successors[start].iter().copied().collect();
        let mut seen: HashSet<usize> = HashSet::new();
        while let Some(index) = queue.pop_front() {
            if !seen.insert(index) {
                continue;
            }
            if !self.actions[index].state().is_terminal() {
                let cause = FailureCause::ParentFailed { action: name.into() };
                self.actions[index].fail_not_ready(cause, now)?;
            }
            queue.extend(self.successors[index].iter().copied());
        }
        Ok(())
    }

    /// `NOT_SUBMITTED -> PENDING`, freezing the DAG against further
    /// mutation.
    pub fn submit(&mut self) -> Result<(), CoreError> {
        self.require_not_submitted()?;
        self.state = JobState::Pending;
        Ok(())
    }

    /// `PENDING -> RUNNING`, idempotent once running.
    pub fn mark_running(&mut self) {
        if self.state == JobState::Pending {
            self.state = JobState::Running;
        }
    }

    /// Recompute the job's terminal state from its actions' states. Returns
    /// `Some(state)` the first time a terminal state is reached, `None`
    /// otherwise (including subsequent calls once already terminal).
    pub fn recompute_terminal_state(&mut self) -> Option<JobState> {
        if self.state.is_terminal() {
            return None;
        }
        if self.actions.iter().any(|a| a.state() == ActionState::Killed) {
            self.state = JobState::Killed;
            return Some(self.state);
        }
        if self.actions.iter().all(|a| a.state().is_terminal()) {
            let state = if self.actions.iter().all(|a| a.state() == ActionState::Completed) {
                JobState::Completed
            } else {
                JobState::Failed
            };
            self.state = state;
            return Some(state);
        }
        None
    }

    /// Force every non-terminal action to `KILLED` and the job itself to
    /// `KILLED`, used by explicit job termination.
    pub fn kill(&mut self, now: f64) -> Result<(), CoreError> {
        for action in &mut self.actions {
            if !action.state().is_terminal() {
                match action.state() {
                    ActionState::Started => {
                        action.kill(FailureCause::JobKilled, now)?;
                    }
                    _ => {
                        action.fail_not_ready(FailureCause::JobKilled, now)?;
                    }
                }
            }
        }
        self.state = JobState::Killed;
        Ok(())
    }

    /// Force every non-terminal action to `KILLED` and the job to
    /// `DISCONTINUED`, used when an owning service is stopped brutally
    /// while the job still has unfinished actions.
    pub fn discontinue(&mut self, now: f64) -> Result<(), CoreError> {
        self.kill(now)?;
        self.state = JobState::Discontinued;
        Ok(())
    }
}

impl std::fmt::Debug for CompoundJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompoundJob")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("num_actions", &self.actions.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "compound_job_tests.rs"]
mod tests;
