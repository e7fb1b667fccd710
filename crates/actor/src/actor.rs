// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-actor API surface: an [`ActorContext`] handed to every running
//! actor's body, and the [`ActorBody`] trait actors implement.

use crate::commport::{wait_any, CommHandle};
use crate::error::CommError;
use crate::reactor::ActorId;
use crate::sim_kernel::SimKernel;
use async_trait::async_trait;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// How an actor's lifecycle was ended: cooperatively, by its own body
/// noticing [`ActorContext::stop_requested`], or forcibly from the outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    Graceful,
    Brutal,
}

/// Shared cell through which a [`crate::daemon::Daemon`] asks an actor's
/// body to wind down. Cloning shares the same underlying request.
#[derive(Clone)]
pub(crate) struct ControlHandle {
    requested: Rc<RefCell<Option<StopMode>>>,
}

impl ControlHandle {
    fn new() -> Self {
        Self { requested: Rc::new(RefCell::new(None)) }
    }

    pub(crate) fn request(&self, mode: StopMode) {
        *self.requested.borrow_mut() = Some(mode);
    }

    fn get(&self) -> Option<StopMode> {
        *self.requested.borrow()
    }
}

/// What an actor does once it starts running, generalized over any payload
/// types it chooses to exchange on its commports.
#[async_trait(?Send)]
pub trait ActorBody {
    async fn run(&self, ctx: &ActorContext);
}

/// Handed to a running actor's [`ActorBody::run`]. Bundles the actor's
/// identity, host, and every operation it can perform against the kernel.
#[derive(Clone)]
pub struct ActorContext {
    kernel: SimKernel,
    id: ActorId,
    host: SmolStr,
    control: ControlHandle,
}

impl ActorContext {
    fn new(kernel: SimKernel, id: ActorId, host: impl Into<SmolStr>, control: ControlHandle) -> Self {
        Self { kernel, id, host: host.into(), control }
    }

    /// Non-blocking check for a pending [`Daemon::stop`](crate::daemon::Daemon::stop)
    /// or [`Daemon::kill`](crate::daemon::Daemon::kill) request. A well-behaved
    /// long-running actor body polls this between units of work and winds
    /// down voluntarily on `Some(StopMode::Graceful)`.
    pub fn stop_requested(&self) -> Option<StopMode> {
        self.control.get()
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    /// The kernel this actor runs on, for code that needs to spawn further
    /// actors (e.g. one logical actor per MPI rank) rather than just
    /// exchange messages.
    pub fn kernel(&self) -> &SimKernel {
        &self.kernel
    }

    pub fn now(&self) -> f64 {
        self.kernel.now()
    }

    /// Suspend the actor for `duration` seconds of virtual time.
    pub async fn sleep(&self, duration: f64) {
        let wake_at = self.now() + duration.max(0.0);
        self.kernel.schedule_timer(self.id, wake_at);
        SleepFuture { target: wake_at, context: self.clone() }.await;
    }

    /// Simulated compute, modeled as sleeping for `work / flop_rate` seconds
    /// (the minimal kernel performs no resource contention).
    pub async fn compute(&self, work: f64, flop_rate: f64) {
        debug_assert!(flop_rate > 0.0, "flop_rate must be positive");
        self.sleep(work / flop_rate).await;
    }

    /// Yield once to the scheduler without advancing virtual time.
    pub async fn yield_now(&self) {
        YieldFuture { yielded: false }.await
    }

    pub fn register_port(&self, port: &str) {
        self.kernel.register_port(port, self.host.as_str());
    }

    pub async fn put<M: 'static>(&self, port: &str, msg: M) -> Result<(), CommError> {
        self.kernel.put(self.id, port, msg).await
    }

    pub async fn get<M: 'static>(&self, port: &str) -> Result<M, CommError> {
        self.kernel.get(self.id, port).await
    }

    pub fn dput<M: 'static>(&self, port: &str, msg: M) -> Result<(), CommError> {
        self.kernel.dput(self.id, port, msg)
    }

    pub fn iput<M: 'static>(&self, port: &str, msg: M) -> CommHandle<()> {
        self.kernel.iput(self.id, port, msg)
    }

    pub fn iget<M: 'static>(&self, port: &str) -> CommHandle<M> {
        self.kernel.iget(self.id, port)
    }

    pub async fn wait_any<T>(&self, handles: Vec<CommHandle<T>>) -> (usize, Result<T, CommError>) {
        wait_any(handles).await
    }
}

struct SleepFuture {
    target: f64,
    context: ActorContext,
}

impl Future for SleepFuture {
    type Output = ();
    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.context.now() >= self.target {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

struct YieldFuture {
    yielded: bool,
}

impl Future for YieldFuture {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Spawn an [`ActorBody`] onto `kernel`, running on `host`, and return its
/// [`ActorId`].
pub fn spawn<B>(kernel: &SimKernel, host: impl Into<SmolStr>, body: B) -> ActorId
where
    B: ActorBody + 'static,
{
    spawn_controlled(kernel, host, body).0
}

/// Like [`spawn`], but also returns the [`ControlHandle`] a [`crate::daemon::Daemon`]
/// uses to request cooperative or brutal shutdown.
pub(crate) fn spawn_controlled<B>(kernel: &SimKernel, host: impl Into<SmolStr>, body: B) -> (ActorId, ControlHandle)
where
    B: ActorBody + 'static,
{
    let id = ActorId::new();
    let control = ControlHandle::new();
    let ctx = ActorContext::new(kernel.clone(), id, host, control.clone());
    kernel.spawn(
        id,
        Box::pin(async move {
            body.run(&ctx).await;
        }),
    );
    (id, control)
}

#[cfg(test)]
#[path = "actor_tests.rs"]
mod tests;
