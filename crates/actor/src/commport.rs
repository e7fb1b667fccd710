// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named commports: blocking and asynchronous send/receive between actors.
//!
//! A commport delivers with zero simulated network latency (no contention
//! modeling); `put` still suspends the sender until the receiver has
//! consumed the message, matching the blocking contract.

use crate::error::CommError;
use crate::reactor::ActorId;
use crate::sim_kernel::KernelInner;
use smol_str::SmolStr;
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

#[derive(Default)]
pub(crate) struct PortState {
    pub(crate) host: SmolStr,
    pub(crate) queue: VecDeque<Envelope>,
    pub(crate) waiting_receivers: VecDeque<ActorId>,
    pub(crate) pending_senders: VecDeque<ActorId>,
}

impl PortState {
    pub(crate) fn new(host: SmolStr) -> Self {
        Self { host, ..Default::default() }
    }
}

pub(crate) struct Envelope {
    payload: Box<dyn Any>,
    sender: ActorId,
    ack: Rc<RefCell<bool>>,
}

/// Future returned by [`crate::actor::ActorContext::get`].
pub struct GetFuture<M> {
    kernel: Rc<RefCell<KernelInner>>,
    actor: ActorId,
    port: SmolStr,
    registered: bool,
    _marker: std::marker::PhantomData<M>,
}

impl<M> GetFuture<M> {
    pub(crate) fn new(kernel: Rc<RefCell<KernelInner>>, actor: ActorId, port: impl Into<SmolStr>) -> Self {
        Self { kernel, actor, port: port.into(), registered: false, _marker: std::marker::PhantomData }
    }
}

impl<M: 'static> Future for GetFuture<M> {
    type Output = Result<M, CommError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut inner = this.kernel.borrow_mut();
        let Some(host) = inner.port_host(&this.port).map(SmolStr::from) else {
            return Poll::Ready(Err(CommError::UnknownPort(this.port.clone())));
        };
        if !inner.is_host_on(&host) {
            return Poll::Ready(Err(CommError::NetworkError(host)));
        }
        if let Some(envelope) = inner.try_recv(&this.port) {
            *envelope.ack.borrow_mut() = true;
            inner.reactor.wake(envelope.sender);
            return match envelope.payload.downcast::<M>() {
                Ok(boxed) => Poll::Ready(Ok(*boxed)),
                Err(_) => Poll::Ready(Err(CommError::UnknownPort(this.port.clone()))),
            };
        }
        if !this.registered {
            inner.register_receiver(&this.port, this.actor);
            this.registered = true;
        }
        Poll::Pending
    }
}

/// Future returned by [`crate::actor::ActorContext::put`]. Resolves once the
/// receiver has consumed the message.
pub struct PutFuture<M> {
    kernel: Rc<RefCell<KernelInner>>,
    actor: ActorId,
    port: SmolStr,
    msg: Option<M>,
    ack: Rc<RefCell<bool>>,
    sent: bool,
}

impl<M> PutFuture<M> {
    pub(crate) fn new(kernel: Rc<RefCell<KernelInner>>, actor: ActorId, port: impl Into<SmolStr>, msg: M) -> Self {
        Self {
            kernel,
            actor,
            port: port.into(),
            msg: Some(msg),
            ack: Rc::new(RefCell::new(false)),
            sent: false,
        }
    }
}

impl<M: 'static> Future for PutFuture<M> {
    type Output = Result<(), CommError>;

    #[allow(clippy::expect_used)]
    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut inner = this.kernel.borrow_mut();
        let Some(host) = inner.port_host(&this.port).map(SmolStr::from) else {
            return Poll::Ready(Err(CommError::UnknownPort(this.port.clone())));
        };
        if !inner.is_host_on(&host) {
            return Poll::Ready(Err(CommError::NetworkError(host)));
        }
        if !this.sent {
            let envelope = Envelope {
                // msg is only ever None after the take() below; sent guards re-entry.
                payload: Box::new(this.msg.take().expect("PutFuture polled after completion")),
                sender: this.actor,
                ack: this.ack.clone(),
            };
            inner
                .push_envelope(&this.port, envelope)
                .expect("port existence already checked via port_host");
            inner.register_sender(&this.port, this.actor);
            this.sent = true;
            return Poll::Pending;
        }
        if *this.ack.borrow() {
            Poll::Ready(Ok(()))
        } else {
            Poll::Pending
        }
    }
}

/// Fire-and-forget send: the message still traverses the commport, but the
/// sender never waits for an acknowledgment.
pub fn dput<M: 'static>(kernel: &Rc<RefCell<KernelInner>>, actor: ActorId, port: &str, msg: M) -> Result<(), CommError> {
    let mut inner = kernel.borrow_mut();
    let host = inner.port_host(port).map(SmolStr::from).ok_or_else(|| CommError::UnknownPort(port.into()))?;
    if !inner.is_host_on(&host) {
        return Err(CommError::NetworkError(host));
    }
    let envelope = Envelope { payload: Box::new(msg), sender: actor, ack: Rc::new(RefCell::new(false)) };
    inner.push_envelope(port, envelope)
}

/// A handle to an in-flight asynchronous send (`iput`) or receive (`iget`),
/// returned uniformly so callers can mix them in [`wait_any`].
pub struct CommHandle<T> {
    inner: Pin<Box<dyn Future<Output = Result<T, CommError>>>>,
}

impl<T> CommHandle<T> {
    pub(crate) fn from_future(inner: impl Future<Output = Result<T, CommError>> + 'static) -> Self {
        Self { inner: Box::pin(inner) }
    }

    pub async fn wait(self) -> Result<T, CommError> {
        self.inner.await
    }
}

/// Wait for the first of several pending handles to complete, returning its
/// index and result. The remaining handles keep running in the background
/// (dropping them here simply stops polling them further).
pub async fn wait_any<T>(handles: Vec<CommHandle<T>>) -> (usize, Result<T, CommError>) {
    let futures: Vec<_> = handles.into_iter().map(|h| h.inner).collect();
    let (result, index, _remaining) = futures::future::select_all(futures).await;
    (index, result)
}

#[cfg(test)]
#[path = "commport_tests.rs"]
mod tests;
