// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The simulation kernel: ties the reactor, host on/off registry, and
//! commports together behind a single `Rc<RefCell<_>>` handle shared by every
//! actor running in one simulation.

use crate::commport::{dput as commport_dput, CommHandle, Envelope, GetFuture, PortState, PutFuture};
use crate::error::CommError;
use crate::reactor::{ActorId, Reactor};
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

pub(crate) struct KernelInner {
    pub(crate) reactor: Reactor,
    pub(crate) ports: HashMap<SmolStr, PortState>,
    pub(crate) hosts: HashMap<SmolStr, bool>,
}

impl KernelInner {
    fn new() -> Self {
        Self { reactor: Reactor::new(), ports: HashMap::new(), hosts: HashMap::new() }
    }

    pub(crate) fn port_host(&self, port: &str) -> Option<&str> {
        self.ports.get(port).map(|p| p.host.as_str())
    }

    pub(crate) fn is_host_on(&self, host: &str) -> bool {
        *self.hosts.get(host).unwrap_or(&true)
    }

    pub(crate) fn try_recv(&mut self, port: &str) -> Option<Envelope> {
        self.ports.get_mut(port).and_then(|p| p.queue.pop_front())
    }

    pub(crate) fn register_receiver(&mut self, port: &str, actor: ActorId) {
        if let Some(p) = self.ports.get_mut(port) {
            if !p.waiting_receivers.contains(&actor) {
                p.waiting_receivers.push_back(actor);
            }
        }
    }

    pub(crate) fn register_sender(&mut self, port: &str, actor: ActorId) {
        if let Some(p) = self.ports.get_mut(port) {
            if !p.pending_senders.contains(&actor) {
                p.pending_senders.push_back(actor);
            }
        }
    }

    pub(crate) fn push_envelope(&mut self, port: &str, envelope: Envelope) -> Result<(), CommError> {
        let receiver = {
            let p = self.ports.get_mut(port).ok_or_else(|| CommError::UnknownPort(port.into()))?;
            p.queue.push_back(envelope);
            p.waiting_receivers.pop_front()
        };
        if let Some(receiver) = receiver {
            self.reactor.wake(receiver);
        }
        Ok(())
    }

    fn register_port(&mut self, port: &str, host: &str) {
        self.ports.entry(port.into()).or_insert_with(|| PortState::new(host.into()));
    }

    fn set_host_state(&mut self, host: &str, on: bool) {
        self.hosts.insert(host.into(), on);
        if on {
            tracing::info!(%host, "host powered on");
            return;
        }
        let affected: Vec<ActorId> = self
            .ports
            .values()
            .filter(|p| p.host == host)
            .flat_map(|p| p.waiting_receivers.iter().copied().chain(p.pending_senders.iter().copied()))
            .collect();
        tracing::warn!(%host, woken = affected.len(), "host powered off");
        for actor in affected {
            self.reactor.wake(actor);
        }
    }
}

/// Public facade over the shared kernel state. Cheap to clone: every clone
/// shares the same underlying reactor, host registry, and commports.
#[derive(Clone)]
pub struct SimKernel {
    inner: Rc<RefCell<KernelInner>>,
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimKernel {
    pub fn new() -> Self {
        Self { inner: Rc::new(RefCell::new(KernelInner::new())) }
    }

    pub fn now(&self) -> f64 {
        self.inner.borrow().reactor.now()
    }

    /// Register `host` in the on/off registry. Hosts not yet registered are
    /// treated as powered on.
    pub fn add_host(&self, host: &str) {
        self.inner.borrow_mut().hosts.entry(host.into()).or_insert(true);
    }

    pub fn is_host_on(&self, host: &str) -> bool {
        self.inner.borrow().is_host_on(host)
    }

    /// Turn a host on or off. Turning a host off wakes every actor currently
    /// blocked sending to or receiving from a port hosted there, so their
    /// pending futures observe the failure on next poll.
    pub fn set_host_state(&self, host: &str, on: bool) {
        self.inner.borrow_mut().set_host_state(host, on);
    }

    /// Declare a commport owned by `host`. Idempotent.
    pub fn register_port(&self, port: &str, host: &str) {
        self.inner.borrow_mut().register_port(port, host);
    }

    pub fn spawn(&self, actor: ActorId, future: Pin<Box<dyn Future<Output = ()>>>) {
        self.inner.borrow_mut().reactor.spawn(actor, future);
    }

    pub fn kill_actor(&self, actor: ActorId) {
        tracing::debug!(%actor, "killing actor");
        self.inner.borrow_mut().reactor.kill(actor);
    }

    pub fn pause_actor(&self, actor: ActorId) {
        self.inner.borrow_mut().reactor.pause(actor);
    }

    pub fn resume_actor(&self, actor: ActorId) {
        self.inner.borrow_mut().reactor.resume(actor);
    }

    pub fn is_actor_alive(&self, actor: ActorId) -> bool {
        self.inner.borrow().reactor.is_alive(actor)
    }

    pub fn schedule_timer(&self, actor: ActorId, time: f64) {
        self.inner.borrow_mut().reactor.schedule_timer(actor, time);
    }

    pub fn run_to_completion(&self) {
        self.inner.borrow_mut().reactor.run_to_completion();
    }

    /// Poll every currently-ready actor once, to quiescence. Does not touch
    /// timers; a never-terminating daemon loop returns here as soon as it
    /// blocks on its next sleep or receive.
    pub fn drain_ready(&self) {
        self.inner.borrow_mut().reactor.drain_ready();
    }

    /// Jump the clock to the next pending timer and wake whatever it fires,
    /// without draining the resulting wake-ups. Returns `false` if there was
    /// no timer to advance to.
    pub fn advance_to_next_timer(&self) -> bool {
        self.inner.borrow_mut().reactor.advance_to_next_timer()
    }

    pub fn has_pending_work(&self) -> bool {
        self.inner.borrow().reactor.has_pending_work()
    }

    pub(crate) fn get<M: 'static>(&self, actor: ActorId, port: &str) -> GetFuture<M> {
        GetFuture::new(self.inner.clone(), actor, port.to_owned())
    }

    pub(crate) fn put<M: 'static>(&self, actor: ActorId, port: &str, msg: M) -> PutFuture<M> {
        PutFuture::new(self.inner.clone(), actor, port.to_owned(), msg)
    }

    pub(crate) fn dput<M: 'static>(&self, actor: ActorId, port: &str, msg: M) -> Result<(), CommError> {
        commport_dput(&self.inner, actor, port, msg)
    }

    pub(crate) fn iget<M: 'static>(&self, actor: ActorId, port: &str) -> CommHandle<M> {
        CommHandle::from_future(self.get(actor, port))
    }

    pub(crate) fn iput<M: 'static>(&self, actor: ActorId, port: &str, msg: M) -> CommHandle<()> {
        CommHandle::from_future(self.put(actor, port, msg))
    }
}

#[cfg(test)]
#[path = "sim_kernel_tests.rs"]
mod tests;
