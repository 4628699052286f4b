//! Signal contexts: the handler trait, the capability producers submit to,
//! and the owning handle whose drop dissolves the context.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::error::{SignalError, SignalResult};
use super::entrypoint::Shared;

/// Target of signal delivery. Called on the entrypoint's dispatch thread.
pub trait SignalHandler: Send + Sync {
    fn on_signal(&self);

    /// Deliver one signal through `gate`; returns whether `on_signal` ran.
    ///
    /// Handlers that take an outer lock before running (a guest context)
    /// override this to pass the gate only once they hold that lock. Closing
    /// the gate from inside the same lock then never waits on a delivery
    /// that is itself waiting for the lock.
    fn deliver(&self, gate: &DeliveryGate) -> bool {
        match gate.enter() {
            Some(_pass) => {
                self.on_signal();
                true
            }
            None => false,
        }
    }
}

// =============================================================================
// Delivery gate
// =============================================================================

struct GateState {
    open: bool,
    /// Threads currently past the gate, one entry per nesting level.
    active: Vec<ThreadId>,
}

/// Admission check for deliveries to one context.
///
/// ```text
/// deliver ── enter() ──► on_signal ── pass dropped ──┐
///               │ closed: skip                       │ notify
///               ▼                                    ▼
/// dissolve ── close() ── waits while another thread is past the gate
/// ```
///
/// `close` does not wait for passes held by the calling thread, so a handler
/// may dissolve its own context.
pub struct DeliveryGate {
    state: Mutex<GateState>,
    idle: Condvar,
}

impl DeliveryGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState { open: true, active: Vec::new() }),
            idle: Condvar::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// `None` once the gate is closed.
    pub fn enter(&self) -> Option<GatePass<'_>> {
        let mut state = self.state.lock();
        if !state.open {
            return None;
        }
        state.active.push(thread::current().id());
        Some(GatePass { gate: self, _not_send: PhantomData })
    }

    /// Refuse further passes, then wait for other threads' passes to drop.
    pub fn close(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        state.open = false;
        while state.active.iter().any(|t| *t != me) {
            self.idle.wait(&mut state);
        }
    }

    fn leave(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if let Some(pos) = state.active.iter().rposition(|t| *t == me) {
            state.active.swap_remove(pos);
        }
        drop(state);
        self.idle.notify_all();
    }
}

impl Default for DeliveryGate {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeliveryGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DeliveryGate")
            .field("open", &state.open)
            .field("active", &state.active.len())
            .finish()
    }
}

/// Held for the duration of one delivery. Bound to the entering thread.
pub struct GatePass<'a> {
    gate: &'a DeliveryGate,
    _not_send: PhantomData<*const ()>,
}

impl Drop for GatePass<'_> {
    fn drop(&mut self) {
        self.gate.leave();
    }
}

/// Identifies one signal context within its entrypoint. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub(super) u64);

impl ContextId {
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Capability to signal one context. Cheap to clone and hand to producers
/// (sessions, timers, exit notifiers). Does not keep the context alive.
#[derive(Clone)]
pub struct SignalContextCap {
    id: ContextId,
    ep: Weak<Shared>,
}

impl SignalContextCap {
    pub(super) fn new(id: ContextId, ep: Weak<Shared>) -> Self {
        Self { id, ep }
    }

    /// A capability that refers to nothing; every submit fails.
    pub fn invalid() -> Self {
        Self { id: ContextId(0), ep: Weak::new() }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Mark the context pending and wake its entrypoint.
    ///
    /// Fails with `ContextDissolved` once the owning registration is gone and
    /// with `EntrypointGone` after the entrypoint shut down.
    pub fn submit(&self) -> SignalResult<()> {
        let ep = self.ep.upgrade().ok_or(SignalError::EntrypointGone)?;
        ep.submit(self.id)
    }

    /// The context still exists.
    pub fn is_valid(&self) -> bool {
        self.ep.upgrade().is_some_and(|ep| ep.contains(self.id))
    }
}

impl fmt::Debug for SignalContextCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalContextCap").field("id", &self.id).finish()
    }
}

impl PartialEq for SignalContextCap {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.ep.ptr_eq(&other.ep)
    }
}

impl Eq for SignalContextCap {}

/// Owns a signal context. Dropping it dissolves the context.
///
/// Dropping closes the context's [`DeliveryGate`]: it waits for a delivery
/// already past the gate on another thread, and a delivery not yet past it
/// is skipped. Once the drop returns the handler will not run again.
pub struct ManagedContext {
    cap: SignalContextCap,
    gate: Arc<DeliveryGate>,
}

impl ManagedContext {
    pub(super) fn new(cap: SignalContextCap, gate: Arc<DeliveryGate>) -> Self {
        Self { cap, gate }
    }

    pub fn cap(&self) -> &SignalContextCap {
        &self.cap
    }

    pub fn id(&self) -> ContextId {
        self.cap.id
    }

    /// Gate shared with the entrypoint's slot for this context.
    pub fn gate(&self) -> &DeliveryGate {
        &self.gate
    }
}

impl Drop for ManagedContext {
    fn drop(&mut self) {
        if let Some(ep) = self.cap.ep.upgrade() {
            ep.dissolve(self.cap.id);
        }
        self.gate.close();
    }
}

impl fmt::Debug for ManagedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedContext").field("id", &self.cap.id).finish()
    }
}
