//! Entrypoint: owns signal contexts and dispatches pending ones.
//!
//! Producers submit to a context's capability; the entrypoint queues the
//! context once (further submits before delivery coalesce) and wakes its
//! dispatcher through a futex word:
//!
//! 1. `submit()` stores 1 into the wake word → `atomic_wait::wake_one`
//! 2. dispatcher swaps the word back to 0, drains the pending queue
//! 3. nothing pending → `atomic_wait::wait` on the word, 0% CPU
//!
//! Two ways to drive it:
//!
//! - [`Entrypoint::new`]: the host's own loop calls
//!   [`Entrypoint::dispatch_pending`] / [`Entrypoint::wait_and_dispatch`].
//! - [`Entrypoint::spawn`]: a named dispatch thread does the same and is
//!   stopped and joined on drop.
//!
//! Either way exactly one thread dispatches, so handlers never run
//! concurrently with each other.
//!
//! No entrypoint lock is held while a handler runs. Dissolving a context
//! coordinates with deliveries through the context's
//! [`DeliveryGate`](super::context::DeliveryGate) alone.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::EntrypointConfig;
use crate::error::{SignalError, SignalResult};
use super::context::{ContextId, DeliveryGate, ManagedContext, SignalContextCap, SignalHandler};

// =============================================================================
// Context slot
// =============================================================================

struct Slot {
    /// Taken on dissolve. Only locked to clone or take, never across a call.
    handler: Mutex<Option<Arc<dyn SignalHandler>>>,
    gate: Arc<DeliveryGate>,
    /// Submits since the last delivery.
    pending: AtomicU32,
}

// =============================================================================
// Shared state
// =============================================================================

pub(crate) struct Shared {
    name: String,
    max_contexts: usize,
    next_id: AtomicU64,
    contexts: Mutex<HashMap<ContextId, Arc<Slot>>>,
    queue: Mutex<VecDeque<ContextId>>,
    wake: AtomicU32,
    running: AtomicBool,
}

impl Shared {
    fn new(config: &EntrypointConfig) -> Self {
        Self {
            name: config.name.clone(),
            max_contexts: config.max_contexts,
            next_id: AtomicU64::new(1),
            contexts: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            wake: AtomicU32::new(0),
            running: AtomicBool::new(true),
        }
    }

    fn manage(self: &Arc<Self>, handler: Arc<dyn SignalHandler>) -> SignalResult<ManagedContext> {
        if !self.running.load(Ordering::Acquire) {
            return Err(SignalError::EntrypointGone);
        }

        let mut contexts = self.contexts.lock();
        if contexts.len() >= self.max_contexts {
            warn!(ep = %self.name, limit = self.max_contexts, "signal context table exhausted");
            return Err(SignalError::ContextsExhausted { limit: self.max_contexts });
        }

        let id = ContextId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let gate = Arc::new(DeliveryGate::new());
        contexts.insert(
            id,
            Arc::new(Slot {
                handler: Mutex::new(Some(handler)),
                gate: gate.clone(),
                pending: AtomicU32::new(0),
            }),
        );
        debug!(ep = %self.name, context = %id, live = contexts.len(), "signal context managed");

        let cap = SignalContextCap::new(id, Arc::downgrade(self));
        Ok(ManagedContext::new(cap, gate))
    }

    pub(crate) fn contains(&self, id: ContextId) -> bool {
        self.contexts.lock().contains_key(&id)
    }

    pub(crate) fn submit(&self, id: ContextId) -> SignalResult<()> {
        let slot = self
            .contexts
            .lock()
            .get(&id)
            .cloned()
            .ok_or(SignalError::ContextDissolved)?;

        let before = slot.pending.fetch_add(1, Ordering::AcqRel);
        if before == 0 {
            self.queue.lock().push_back(id);
        }
        trace!(ep = %self.name, context = %id, coalesced = before, "signal submitted");

        self.notify();
        Ok(())
    }

    /// Forget the context. The caller closes its gate afterwards.
    pub(crate) fn dissolve(&self, id: ContextId) {
        let Some(slot) = self.contexts.lock().remove(&id) else {
            return;
        };
        slot.handler.lock().take();
        debug!(ep = %self.name, context = %id, "signal context dissolved");
    }

    fn notify(&self) {
        self.wake.store(1, Ordering::Release);
        atomic_wait::wake_one(&self.wake);
    }

    /// Block until notified.
    fn wait_for_signal(&self) {
        while self.wake.swap(0, Ordering::AcqRel) == 0 {
            atomic_wait::wait(&self.wake, 0);
        }
    }

    /// Deliver one queued context: `None` when the queue was empty,
    /// `Some(false)` when the context went away before delivery.
    fn dispatch_one(&self) -> Option<bool> {
        let id = self.queue.lock().pop_front()?;

        // Dissolved between submit and now
        let Some(slot) = self.contexts.lock().get(&id).cloned() else {
            return Some(false);
        };

        let count = slot.pending.swap(0, Ordering::AcqRel);
        let handler = slot.handler.lock().clone();
        match handler {
            Some(handler) => {
                trace!(ep = %self.name, context = %id, count, "delivering signal");
                Some(handler.deliver(&slot.gate))
            }
            None => Some(false),
        }
    }

    /// Deliver what is queued right now; signals submitted by the handlers
    /// themselves wait for the next round.
    fn dispatch_available(&self) -> usize {
        let queued = self.queue.lock().len();
        let mut delivered = 0;
        for _ in 0..queued {
            match self.dispatch_one() {
                Some(true) => delivered += 1,
                Some(false) => {}
                None => break,
            }
        }
        delivered
    }

    fn run(&self) {
        debug!(ep = %self.name, "entrypoint dispatch thread started");
        while self.running.load(Ordering::Acquire) {
            self.dispatch_available();
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            self.wait_for_signal();
        }
        debug!(ep = %self.name, "entrypoint dispatch thread stopped");
    }
}

// =============================================================================
// Entrypoint
// =============================================================================

/// Signal dispatcher owning a table of signal contexts.
pub struct Entrypoint {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Entrypoint {
    /// Entrypoint driven by the caller's own loop.
    pub fn new(config: &EntrypointConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
            thread: None,
        }
    }

    /// Entrypoint with its own dispatch thread, named after `config.name`.
    pub fn spawn(config: &EntrypointConfig) -> SignalResult<Self> {
        let shared = Arc::new(Shared::new(config));
        let for_thread = shared.clone();

        let handle = thread::Builder::new()
            .name(config.name.clone())
            .spawn(move || for_thread.run())?;

        Ok(Self {
            shared,
            thread: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn is_threaded(&self) -> bool {
        self.thread.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Number of live signal contexts.
    pub fn context_count(&self) -> usize {
        self.shared.contexts.lock().len()
    }

    /// Register `handler` under a fresh signal context.
    pub fn manage(&self, handler: Arc<dyn SignalHandler>) -> SignalResult<ManagedContext> {
        self.shared.manage(handler)
    }

    /// Deliver every context pending right now, on the calling thread.
    /// Returns the number of deliveries.
    ///
    /// Only for entrypoints created with [`Entrypoint::new`]; a spawned
    /// entrypoint dispatches on its own thread and this returns 0.
    pub fn dispatch_pending(&self) -> usize {
        if self.is_threaded() {
            warn!(ep = %self.shared.name, "dispatch_pending called on a threaded entrypoint");
            return 0;
        }
        self.shared.dispatch_available()
    }

    /// Block until at least one delivery happened or the entrypoint stopped.
    pub fn wait_and_dispatch(&self) -> usize {
        if self.is_threaded() {
            warn!(ep = %self.shared.name, "wait_and_dispatch called on a threaded entrypoint");
            return 0;
        }
        loop {
            let delivered = self.shared.dispatch_available();
            if delivered > 0 || !self.is_running() {
                return delivered;
            }
            self.shared.wait_for_signal();
        }
    }

    /// Stop dispatching. Joins the dispatch thread unless called from it.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.notify();

        if let Some(handle) = self.thread.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!(ep = %self.shared.name, "entrypoint dispatch thread panicked");
            }
        }
    }
}

impl Drop for Entrypoint {
    fn drop(&mut self) {
        self.stop();
    }
}
