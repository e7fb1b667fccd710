// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The minimal deterministic single-threaded executor: a ready queue of
//! runnable actors and a virtual-time-ordered timer heap, FIFO at equal
//! timestamps.

use crate::clock::{Clock, SimClock};
use futures::task::ArcWake;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

hpcsim_core::define_id! {
    /// Identifier of a cooperatively scheduled actor.
    pub struct ActorId("acr-");
}

type BoxedFuture = Pin<Box<dyn Future<Output = ()>>>;

struct TimerEntry {
    time: f64,
    seq: u64,
    actor: ActorId,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    // `BinaryHeap` is a max-heap; reverse both comparisons to get a
    // min-heap ordered by (time, then insertion order for FIFO tie-break).
    fn cmp(&self, other: &Self) -> Ordering {
        match other.time.partial_cmp(&self.time) {
            Some(Ordering::Equal) | None => other.seq.cmp(&self.seq),
            Some(order) => order,
        }
    }
}

struct TaskWaker {
    actor: ActorId,
    ready: Arc<Mutex<VecDeque<ActorId>>>,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        let mut ready = arc_self.ready.lock();
        if !ready.contains(&arc_self.actor) {
            ready.push_back(arc_self.actor);
        }
    }
}

/// Owns every actor's future, the ready queue, the timer heap, and the
/// single virtual clock. Not `Send`/`Sync` on purpose: the whole simulation
/// runs on one thread.
pub struct Reactor {
    tasks: HashMap<ActorId, BoxedFuture>,
    wakers: HashMap<ActorId, Waker>,
    ready: Arc<Mutex<VecDeque<ActorId>>>,
    timers: BinaryHeap<TimerEntry>,
    timer_seq: u64,
    clock: SimClock,
    suspended: HashSet<ActorId>,
    pending_while_suspended: HashSet<ActorId>,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reactor {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            wakers: HashMap::new(),
            ready: Arc::new(Mutex::new(VecDeque::new())),
            timers: BinaryHeap::new(),
            timer_seq: 0,
            clock: SimClock::new(),
            suspended: HashSet::new(),
            pending_while_suspended: HashSet::new(),
        }
    }

    /// Stop polling `actor` until [`Reactor::resume`] is called, without
    /// touching its future or any in-flight state. Wake-ups that arrive
    /// while suspended are remembered, not dropped.
    pub fn pause(&mut self, actor: ActorId) {
        self.suspended.insert(actor);
    }

    /// Resume polling `actor`. If it was woken while suspended, it is
    /// re-queued immediately so it observes the resume without delay.
    pub fn resume(&mut self, actor: ActorId) {
        self.suspended.remove(&actor);
        if self.pending_while_suspended.remove(&actor) && self.tasks.contains_key(&actor) {
            self.ready.lock().push_back(actor);
        }
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn is_alive(&self, actor: ActorId) -> bool {
        self.tasks.contains_key(&actor)
    }

    pub fn spawn(&mut self, actor: ActorId, future: BoxedFuture) {
        let waker = futures::task::waker(Arc::new(TaskWaker { actor, ready: self.ready.clone() }));
        self.wakers.insert(actor, waker);
        self.tasks.insert(actor, future);
        self.ready.lock().push_back(actor);
    }

    /// Force-remove an actor's task and pending wake registration. Any
    /// outstanding timer entries for it are skipped lazily when popped.
    pub fn kill(&mut self, actor: ActorId) {
        self.tasks.remove(&actor);
        self.wakers.remove(&actor);
        self.suspended.remove(&actor);
        self.pending_while_suspended.remove(&actor);
    }

    /// Wake `actor` if it is still alive, re-enqueuing it onto the ready
    /// queue. Used both by timer expiry and by commport delivery/host-down
    /// notifications.
    pub fn wake(&self, actor: ActorId) {
        if let Some(waker) = self.wakers.get(&actor) {
            waker.wake_by_ref();
        }
    }

    pub fn schedule_timer(&mut self, actor: ActorId, time: f64) {
        let seq = self.timer_seq;
        self.timer_seq += 1;
        self.timers.push(TimerEntry { time, seq, actor });
    }

    /// Poll every actor currently in the ready queue, to quiescence. New
    /// wake-ups produced while polling (e.g. a delivered message waking its
    /// sender) are processed in the same pass.
    pub fn drain_ready(&mut self) {
        loop {
            let next = self.ready.lock().pop_front();
            let Some(actor) = next else { break };
            if self.suspended.contains(&actor) {
                self.pending_while_suspended.insert(actor);
                continue;
            }
            self.poll_actor(actor);
        }
    }

    fn poll_actor(&mut self, actor: ActorId) {
        let Some(waker) = self.wakers.get(&actor).cloned() else { return };
        let mut cx = Context::from_waker(&waker);
        let done = match self.tasks.get_mut(&actor) {
            Some(future) => matches!(future.as_mut().poll(&mut cx), Poll::Ready(())),
            None => return,
        };
        if done {
            self.tasks.remove(&actor);
            self.wakers.remove(&actor);
        }
    }

    /// If the ready queue is empty but timers remain, jump the clock to the
    /// next timer's time and wake every actor whose timer fires at exactly
    /// that instant. Returns `false` if there was nothing to advance to.
    #[allow(clippy::expect_used)]
    pub fn advance_to_next_timer(&mut self) -> bool {
        while let Some(top) = self.timers.peek() {
            if !self.tasks.contains_key(&top.actor) {
                self.timers.pop();
                continue;
            }
            let time = top.time;
            self.clock.advance_to(time);
            while let Some(top) = self.timers.peek() {
                if top.time > time {
                    break;
                }
                // just peeked this entry above; pop cannot be empty here.
                let entry = self.timers.pop().expect("peeked entry must pop");
                if self.tasks.contains_key(&entry.actor) {
                    self.wake(entry.actor);
                }
            }
            return true;
        }
        false
    }

    /// Run every spawned actor to completion: drain ready actors, and when
    /// nothing is runnable, jump to the next timer. Stops when no actor
    /// remains or no further progress is possible (a deadlock).
    pub fn run_to_completion(&mut self) {
        loop {
            self.drain_ready();
            if self.tasks.is_empty() {
                break;
            }
            if !self.advance_to_next_timer() {
                break;
            }
        }
    }

    pub fn has_pending_work(&self) -> bool {
        !self.tasks.is_empty()
    }
}

#[cfg(test)]
#[path = "reactor_tests.rs"]
mod tests;
