// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The action executor (C3): runs a single action against a `(host, cores,
//! ram)` allocation and reports back exactly once.
//!
//! Work always races against an external kill and, for Compute/Custom/MPI
//! actions, an optional timeout: whichever future resolves first decides
//! the action's terminal state and cause.

use crate::messages::{ActionExecutorDone, FileOperationAnswer, FileOperationRequest, KillSignal};
use crate::SharedJob;
use async_trait::async_trait;
use futures::FutureExt as _;
use hpcsim_actor::{ActorBody, ActorContext, ActorId, CommError, SimKernel};
use hpcsim_core::{ActionKind, CustomActionHandler, FailureCause, JobId, MpiActionHandler, MpiCollectives};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;
use std::sync::Arc;

fn watch_port_for(action: &str) -> SmolStr {
    SmolStr::from(format!("__hostwatch__{action}"))
}

fn kill_port_for(action: &str) -> SmolStr {
    SmolStr::from(format!("__kill__{action}"))
}

fn mpi_barrier_port(action: &str, rank: u32) -> SmolStr {
    SmolStr::from(format!("__mpi-barrier__{action}__{rank}__"))
}

fn mpi_alltoall_port(action: &str, rank: u32) -> SmolStr {
    SmolStr::from(format!("__mpi-alltoall__{action}__{rank}__"))
}

fn mpi_done_port(action: &str) -> SmolStr {
    SmolStr::from(format!("__mpi-done__{action}"))
}

/// Translate a commport failure into the outcome data carried on a terminal
/// action state: the one seam where a real `Result::Err` becomes simulated
/// data.
fn comm_error_to_cause(err: CommError) -> FailureCause {
    match err {
        CommError::NetworkError(host) => FailureCause::HostError { host },
        CommError::Timeout(_) => FailureCause::OperationTimeout,
        CommError::PeerKilled => FailureCause::ServiceDown,
        CommError::UnknownPort(port) => FailureCause::FatalFailure { message: port },
    }
}

enum RaceOutcome {
    Work(Result<(), FailureCause>),
    HostDown(SmolStr),
    Killed(FailureCause),
    TimedOut,
}

async fn run_file_op(
    ctx: &ActorContext,
    storage_service: &str,
    action_id: &str,
    build_request: impl FnOnce(SmolStr) -> FileOperationRequest,
) -> Result<(), FailureCause> {
    let reply_port = SmolStr::from(format!("__fileop-reply__{action_id}"));
    ctx.register_port(&reply_port);
    if let Err(err) = ctx.put(storage_service, build_request(reply_port.clone())).await {
        return Err(comm_error_to_cause(err));
    }
    match ctx.get::<FileOperationAnswer>(&reply_port).await {
        Ok(answer) if answer.success => Ok(()),
        Ok(answer) => Err(answer.cause.unwrap_or(FailureCause::FileNotFound { file: storage_service.into() })),
        Err(err) => Err(comm_error_to_cause(err)),
    }
}

async fn run_action_body(ctx: &ActorContext, kind: &ActionKind, action_id: &str, cores: u32, flop_rate: f64) -> Result<(), FailureCause> {
    match kind {
        ActionKind::Compute { flops, parallel_model, .. } => {
            let work = parallel_model.makespan(*flops, cores);
            ctx.compute(work, flop_rate).await;
            Ok(())
        }
        ActionKind::Sleep { duration } => {
            ctx.sleep(*duration).await;
            Ok(())
        }
        ActionKind::FileRead { file, location } => {
            let file = *file;
            let location = location.clone();
            run_file_op(ctx, location.storage_service(), action_id, move |reply_to| {
                FileOperationRequest::Read { file, location, reply_to }
            })
            .await
        }
        ActionKind::FileWrite { file, location } => {
            let file = *file;
            let location = location.clone();
            run_file_op(ctx, location.storage_service(), action_id, move |reply_to| {
                FileOperationRequest::Write { file, location, reply_to }
            })
            .await
        }
        ActionKind::FileCopy { file, src, dst } => {
            let file = *file;
            let src = src.clone();
            let dst = dst.clone();
            let service = src.storage_service().to_owned();
            run_file_op(ctx, &service, action_id, move |reply_to| {
                FileOperationRequest::Copy { file, src, dst, reply_to }
            })
            .await
        }
        ActionKind::FileDelete { file, location } => {
            let file = *file;
            let location = location.clone();
            run_file_op(ctx, location.storage_service(), action_id, move |reply_to| {
                FileOperationRequest::Delete { file, location, reply_to }
            })
            .await
        }
        ActionKind::FileRegistryAdd { file, location } => {
            let file = *file;
            let location = location.clone();
            run_file_op(ctx, location.storage_service(), action_id, move |reply_to| {
                FileOperationRequest::RegistryAdd { file, location, reply_to }
            })
            .await
        }
        ActionKind::FileRegistryDelete { file, location } => {
            let file = *file;
            let location = location.clone();
            run_file_op(ctx, location.storage_service(), action_id, move |reply_to| {
                FileOperationRequest::RegistryDelete { file, location, reply_to }
            })
            .await
        }
        ActionKind::Custom { handler } => run_custom(handler.as_ref()),
        ActionKind::Mpi { num_processes, handler, .. } => {
            run_mpi_action(ctx, action_id, *num_processes, handler).await
        }
    }
}

fn run_custom(handler: &dyn CustomActionHandler) -> Result<(), FailureCause> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| handler.execute())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(message)) => Err(FailureCause::FatalFailure { message }),
        Err(_) => Err(FailureCause::FatalFailure { message: "action handler panicked".into() }),
    }
}

/// Arrival state for one blocking barrier among an MPI action's ranks.
struct BarrierState {
    arrived: u32,
}

/// Arrival state and per-rank send buffers for one blocking all-to-all.
struct AlltoallState {
    arrived: u32,
    table: Vec<Vec<SmolStr>>,
}

/// How many ranks of an MPI action are still running, and the first
/// failure any of them reported (MPI semantics: one rank erroring aborts
/// the whole job, but every rank still gets to finalize).
struct MpiOutcome {
    remaining: u32,
    failure: Option<FailureCause>,
}

struct MpiRunDone(Option<FailureCause>);

/// [`MpiCollectives`] for one rank of one MPI action, implemented directly
/// on top of the same named-commport primitives every other actor uses:
/// `dput` to release waiters, `get` to block until released.
struct RankCollectives {
    ctx: ActorContext,
    action_id: SmolStr,
    rank: u32,
    num_processes: u32,
    barrier: Rc<RefCell<BarrierState>>,
    alltoall: Rc<RefCell<AlltoallState>>,
}

#[async_trait(?Send)]
impl MpiCollectives for RankCollectives {
    async fn barrier(&self) {
        let is_last = {
            let mut state = self.barrier.borrow_mut();
            state.arrived += 1;
            state.arrived == self.num_processes
        };
        if is_last {
            self.barrier.borrow_mut().arrived = 0;
            for rank in 0..self.num_processes {
                if rank != self.rank {
                    let _ = self.ctx.dput(&mpi_barrier_port(&self.action_id, rank), ());
                }
            }
            return;
        }
        let _ = self.ctx.get::<()>(&mpi_barrier_port(&self.action_id, self.rank)).await;
    }

    async fn alltoall(&self, send: Vec<SmolStr>) -> Vec<SmolStr> {
        let is_last = {
            let mut state = self.alltoall.borrow_mut();
            state.table[self.rank as usize] = send;
            state.arrived += 1;
            state.arrived == self.num_processes
        };
        if is_last {
            let table = {
                let mut state = self.alltoall.borrow_mut();
                state.arrived = 0;
                state.table.clone()
            };
            for rank in 0..self.num_processes {
                let column: Vec<SmolStr> = table.iter().map(|row| row[rank as usize].clone()).collect();
                if rank == self.rank {
                    continue;
                }
                let _ = self.ctx.dput(&mpi_alltoall_port(&self.action_id, rank), column);
            }
            return table.iter().map(|row| row[self.rank as usize].clone()).collect();
        }
        self.ctx.get::<Vec<SmolStr>>(&mpi_alltoall_port(&self.action_id, self.rank)).await.unwrap_or_default()
    }
}

/// One MPI rank, run as its own logical actor on the same host as every
/// other rank of the same action. Being scheduled is `MPI_Init`; reporting
/// back through `outcome`/`done_port` once every rank has returned is
/// `MPI_Finalize`.
struct MpiRankActor {
    handler: Arc<dyn MpiActionHandler>,
    action_id: SmolStr,
    rank: u32,
    num_processes: u32,
    barrier: Rc<RefCell<BarrierState>>,
    alltoall: Rc<RefCell<AlltoallState>>,
    outcome: Rc<RefCell<MpiOutcome>>,
    done_port: SmolStr,
}

#[async_trait(?Send)]
impl ActorBody for MpiRankActor {
    async fn run(&self, ctx: &ActorContext) {
        ctx.register_port(&mpi_barrier_port(&self.action_id, self.rank));
        ctx.register_port(&mpi_alltoall_port(&self.action_id, self.rank));
        let collectives = RankCollectives {
            ctx: ctx.clone(),
            action_id: self.action_id.clone(),
            rank: self.rank,
            num_processes: self.num_processes,
            barrier: self.barrier.clone(),
            alltoall: self.alltoall.clone(),
        };
        let result = AssertUnwindSafe(self.handler.run(self.rank, self.num_processes, &collectives)).catch_unwind().await;
        let cause = match result {
            Ok(Ok(())) => None,
            Ok(Err(message)) => Some(FailureCause::FatalFailure { message }),
            Err(_) => Some(FailureCause::ComputeThreadDied),
        };

        let mut outcome = self.outcome.borrow_mut();
        outcome.remaining -= 1;
        if outcome.failure.is_none() {
            outcome.failure = cause;
        }
        if outcome.remaining == 0 {
            let failure = outcome.failure.clone();
            drop(outcome);
            let _ = ctx.dput(&self.done_port, MpiRunDone(failure));
        }
    }
}

/// Run an `ActionKind::Mpi` action: spawn `num_processes` rank actors on
/// the calling actor's host, each executing `handler` with rank-addressed
/// blocking `MPI_Barrier`/`MPI_Alltoall`, and wait for every rank to reach
/// its `MPI_Finalize`.
async fn run_mpi_action(
    ctx: &ActorContext,
    action_id: &str,
    num_processes: u32,
    handler: &Arc<dyn MpiActionHandler>,
) -> Result<(), FailureCause> {
    let done_port = mpi_done_port(action_id);
    ctx.register_port(&done_port);

    let barrier = Rc::new(RefCell::new(BarrierState { arrived: 0 }));
    let alltoall = Rc::new(RefCell::new(AlltoallState { arrived: 0, table: vec![Vec::new(); num_processes as usize] }));
    let outcome = Rc::new(RefCell::new(MpiOutcome { remaining: num_processes, failure: None }));

    for rank in 0..num_processes {
        hpcsim_actor::spawn(
            ctx.kernel(),
            ctx.host(),
            MpiRankActor {
                handler: handler.clone(),
                action_id: SmolStr::from(action_id),
                rank,
                num_processes,
                barrier: barrier.clone(),
                alltoall: alltoall.clone(),
                outcome: outcome.clone(),
                done_port: done_port.clone(),
            },
        );
    }

    match ctx.get::<MpiRunDone>(&done_port).await {
        Ok(MpiRunDone(None)) => Ok(()),
        Ok(MpiRunDone(Some(cause))) => Err(cause),
        Err(err) => Err(comm_error_to_cause(err)),
    }
}

/// One allocation the executor was launched with. Mirrors the allocation
/// the compute service deducted before spawning it.
pub struct ActionExecutor {
    pub job: SharedJob,
    pub job_id: JobId,
    pub action_name: SmolStr,
    pub host: SmolStr,
    pub cores: u32,
    pub ram_bytes: u64,
    pub flop_rate: f64,
    pub timeout: Option<f64>,
    pub done_port: SmolStr,
}

#[async_trait(?Send)]
impl ActorBody for ActionExecutor {
    async fn run(&self, ctx: &ActorContext) {
        let now = ctx.now();
        let (min_cores, min_ram, kind) = {
            let job = self.job.borrow();
            #[allow(clippy::expect_used)]
            let action = job.get_action(&self.action_name).expect("action exists in its own job");
            (action.min_num_cores(), action.min_ram_footprint(), action.kind().clone())
        };

        if self.cores < min_cores || self.ram_bytes < min_ram {
            tracing::error!(action = %self.action_name, "allocation does not satisfy the action's resource floor");
            let mut job = self.job.borrow_mut();
            #[allow(clippy::expect_used)]
            let action = job.get_action_mut(&self.action_name).expect("action exists in its own job");
            let _ = action.fail_not_ready(
                FailureCause::FatalFailure { message: "Invalid resource specs".into() },
                now,
            );
            drop(job);
            self.notify_done(ctx);
            return;
        }

        {
            let mut job = self.job.borrow_mut();
            #[allow(clippy::expect_used)]
            let action = job.get_action_mut(&self.action_name).expect("action exists in its own job");
            if action.start(self.host.clone(), self.cores, now).is_err() {
                tracing::warn!(action = %self.action_name, "action was not READY when the executor started");
                drop(job);
                self.notify_done(ctx);
                return;
            }
        }
        tracing::info!(action = %self.action_name, host = %self.host, cores = self.cores, "action started");

        let watch_port = watch_port_for(self.action_name.as_str());
        ctx.register_port(&watch_port);
        let kill_port = kill_port_for(self.action_name.as_str());
        ctx.register_port(&kill_port);

        let outcome = self.race(ctx, &kind, &watch_port, &kill_port).await;

        let now = ctx.now();
        let mut job = self.job.borrow_mut();
        #[allow(clippy::expect_used)]
        let action = job.get_action_mut(&self.action_name).expect("action exists in its own job");
        let mut failed = false;
        match outcome {
            RaceOutcome::Work(Ok(())) => {
                let _ = action.complete(now);
                tracing::info!(action = %self.action_name, "action completed");
            }
            RaceOutcome::Work(Err(cause)) => {
                tracing::warn!(action = %self.action_name, cause = %cause, "action failed");
                let _ = action.fail(cause, now);
                failed = true;
            }
            RaceOutcome::HostDown(host) => {
                let cause = FailureCause::HostError { host };
                tracing::warn!(action = %self.action_name, cause = %cause, "action failed");
                let _ = action.fail(cause, now);
                failed = true;
            }
            RaceOutcome::Killed(cause) => {
                if let ActionKind::Custom { handler } = &kind {
                    handler.terminate();
                }
                tracing::warn!(action = %self.action_name, cause = %cause, "action killed");
                let _ = action.kill(cause, now);
                failed = true;
            }
            RaceOutcome::TimedOut => {
                tracing::warn!(action = %self.action_name, "action timed out");
                let _ = action.fail(FailureCause::OperationTimeout, now);
                failed = true;
            }
        }
        if failed {
            let _ = job.cascade_fail_successors(&self.action_name, now);
        }
        drop(job);
        self.notify_done(ctx);
    }
}

impl ActionExecutor {
    async fn race(&self, ctx: &ActorContext, kind: &ActionKind, watch_port: &str, kill_port: &str) -> RaceOutcome {
        let work = {
            let ctx = ctx.clone();
            let kind = kind.clone();
            let action_id = self.action_name.clone();
            let cores = self.cores;
            let flop_rate = self.flop_rate;
            Box::pin(async move { RaceOutcome::Work(run_action_body(&ctx, &kind, &action_id, cores, flop_rate).await) })
                as std::pin::Pin<Box<dyn std::future::Future<Output = RaceOutcome>>>
        };
        let host_down = {
            let ctx = ctx.clone();
            let watch_port = watch_port.to_owned();
            Box::pin(async move {
                match ctx.get::<Infallible>(&watch_port).await {
                    Err(CommError::NetworkError(host)) => RaceOutcome::HostDown(host),
                    _ => RaceOutcome::HostDown(ctx.host().into()),
                }
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = RaceOutcome>>>
        };
        let killed = {
            let ctx = ctx.clone();
            let kill_port = kill_port.to_owned();
            Box::pin(async move {
                match ctx.get::<KillSignal>(&kill_port).await {
                    Ok(signal) => RaceOutcome::Killed(signal.cause),
                    Err(_) => RaceOutcome::Killed(FailureCause::ServiceDown),
                }
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = RaceOutcome>>>
        };
        let mut candidates = vec![work, host_down, killed];
        if let Some(timeout) = self.timeout {
            let ctx = ctx.clone();
            candidates.push(Box::pin(async move {
                ctx.sleep(timeout).await;
                RaceOutcome::TimedOut
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = RaceOutcome>>>);
        }
        let (outcome, _index, _rest) = futures::future::select_all(candidates).await;
        outcome
    }

    fn notify_done(&self, ctx: &ActorContext) {
        let _ = ctx.dput(
            &self.done_port,
            ActionExecutorDone {
                job: self.job_id,
                action: {
                    let job = self.job.borrow();
                    #[allow(clippy::expect_used)]
                    let action = job.get_action(&self.action_name).expect("action exists");
                    action.id()
                },
                host: self.host.clone(),
                cores: self.cores,
                ram_bytes: self.ram_bytes,
            },
        );
    }
}

pub fn spawn(
    kernel: &SimKernel,
    job: SharedJob,
    job_id: JobId,
    action_name: impl Into<SmolStr>,
    host: impl Into<SmolStr>,
    cores: u32,
    ram_bytes: u64,
    flop_rate: f64,
    timeout: Option<f64>,
    done_port: impl Into<SmolStr>,
) -> ActorId {
    let host = host.into();
    hpcsim_actor::spawn(
        kernel,
        host.clone(),
        ActionExecutor {
            job,
            job_id,
            action_name: action_name.into(),
            host,
            cores,
            ram_bytes,
            flop_rate,
            timeout,
            done_port: done_port.into(),
        },
    )
}

pub fn kill_port_for_action(action_name: &str) -> SmolStr {
    kill_port_for(action_name)
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
