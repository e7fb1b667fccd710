// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle control and the [`Lifesaver`] keepalive handle.

use crate::actor::{spawn_controlled, ActorBody, ControlHandle, StopMode};
use crate::error::ActorError;
use crate::reactor::ActorId;
use crate::sim_kernel::SimKernel;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// A controllable handle to a spawned actor. `suspend`/`resume` pause and
/// unpause scheduling without touching the actor's own state; `stop` asks
/// the body to wind down cooperatively, `kill` removes it immediately.
pub struct Daemon {
    kernel: SimKernel,
    actor: ActorId,
    control: ControlHandle,
}

impl Daemon {
    pub fn spawn<B>(kernel: &SimKernel, host: impl Into<SmolStr>, body: B) -> Self
    where
        B: ActorBody + 'static,
    {
        let (actor, control) = spawn_controlled(kernel, host, body);
        Self { kernel: kernel.clone(), actor, control }
    }

    pub fn id(&self) -> ActorId {
        self.actor
    }

    pub fn is_alive(&self) -> bool {
        self.kernel.is_actor_alive(self.actor)
    }

    pub fn suspend(&self) {
        self.kernel.pause_actor(self.actor);
    }

    pub fn resume(&self) {
        self.kernel.resume_actor(self.actor);
    }

    /// Ask the actor to stop on its own terms. It observes this the next
    /// time its body checks `ActorContext::stop_requested` and is expected
    /// to finish any in-flight work before returning.
    pub fn stop(&self) {
        tracing::info!(actor = %self.actor, "requesting graceful stop");
        self.control.request(StopMode::Graceful);
        self.kernel.resume_actor(self.actor);
    }

    /// Remove the actor immediately, bypassing cooperative shutdown
    /// entirely. Any in-flight action it owns is left to its caller to
    /// notice via the normal failure-cascade machinery.
    pub fn kill(&self) {
        tracing::warn!(actor = %self.actor, "killing daemon brutally");
        self.control.request(StopMode::Brutal);
        self.kernel.kill_actor(self.actor);
    }
}

/// Tracks which actors currently have an outstanding [`Lifesaver`]. A given
/// actor may only be kept alive by one lifesaver at a time.
#[derive(Clone, Default)]
pub struct LifesaverRegistry {
    held: Rc<RefCell<HashSet<ActorId>>>,
}

impl LifesaverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, actor: ActorId) -> bool {
        self.held.borrow().contains(&actor)
    }
}

/// Keeps a daemon alive for as long as this handle (or a move of it) is
/// held; dropping it releases the hold. Acquiring a second lifesaver for
/// the same actor while one is outstanding is an error.
pub struct Lifesaver {
    actor: ActorId,
    registry: Rc<RefCell<HashSet<ActorId>>>,
}

impl Lifesaver {
    pub fn new(daemon: &Daemon, registry: &LifesaverRegistry) -> Result<Self, ActorError> {
        let mut held = registry.held.borrow_mut();
        if !held.insert(daemon.actor) {
            return Err(ActorError::DuplicateLifesaver(daemon.actor.to_string().into()));
        }
        Ok(Self { actor: daemon.actor, registry: registry.held.clone() })
    }
}

impl Drop for Lifesaver {
    fn drop(&mut self) {
        self.registry.borrow_mut().remove(&self.actor);
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
