//! Local input session: in-process transport for the event buffer.
//!
//! Stands in for the host's real input session. Producers queue events and
//! poke the registered signal handler; the client calls `flush()`, which
//! copies the queued events into the fixed dataspace and reports how many
//! records the next [`EventSource::event_buffer`] covers.
//!
//! ```text
//! SessionProducer::submit ──► queue ──► sigh cap ──► entrypoint ──► client
//!                                                                    │
//!             EventBuffer<'_> ◄── dataspace[0..n] ◄── flush() ◄──────┘
//! ```
//!
//! The dataspace is allocated once and never reallocated, so its address
//! stays stable for the session's lifetime. The queue in front of it holds
//! at most [`QUEUE_DEPTH_FACTOR`] dataspaces worth of events; a producer
//! that outruns the client overwrites the oldest ones, like a ring.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::BridgeConfig;
use crate::signal::SignalContextCap;
use super::buffer::{EventBuffer, EventSource};
use super::event::EventRecord;

/// Client side of an input session.
pub trait InputSession: EventSource {
    /// Events are waiting to be flushed.
    fn pending(&self) -> bool;

    /// Move queued events into the dataspace; returns the number now readable.
    fn flush(&mut self) -> usize;

    /// Register the signal handler notified when events arrive.
    fn sigh(&self, cap: SignalContextCap);
}

/// Queue bound, in multiples of the dataspace capacity.
pub const QUEUE_DEPTH_FACTOR: usize = 4;

struct SessionShared {
    queue: Mutex<VecDeque<EventRecord>>,
    limit: usize,
    sigh: Mutex<Option<SignalContextCap>>,
}

/// In-process input session with a fixed-capacity dataspace.
pub struct LocalInputSession {
    dataspace: Box<[EventRecord]>,
    flushed: usize,
    shared: Arc<SessionShared>,
}

impl LocalInputSession {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            dataspace: vec![EventRecord::INVALID; capacity].into_boxed_slice(),
            flushed: 0,
            shared: Arc::new(SessionShared {
                queue: Mutex::new(VecDeque::new()),
                limit: capacity * QUEUE_DEPTH_FACTOR,
                sigh: Mutex::new(None),
            }),
        }
    }

    /// Session sized by `config.session_capacity`.
    pub fn with_config(config: &BridgeConfig) -> Self {
        Self::new(config.session_capacity)
    }

    /// Handle for the writing side.
    pub fn producer(&self) -> SessionProducer {
        SessionProducer { shared: self.shared.clone() }
    }

    /// Number of records the dataspace holds.
    pub fn capacity(&self) -> usize {
        self.dataspace.len()
    }

    /// Base address of the dataspace; stable for the session's lifetime.
    pub fn dataspace_ptr(&self) -> *const EventRecord {
        self.dataspace.as_ptr()
    }

    /// Events queued but not yet flushed.
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Most events the queue holds before overwriting.
    pub fn queue_limit(&self) -> usize {
        self.shared.limit
    }
}

impl EventSource for LocalInputSession {
    fn event_buffer(&self) -> EventBuffer<'_> {
        EventBuffer::new(&self.dataspace[..self.flushed])
    }
}

impl InputSession for LocalInputSession {
    fn pending(&self) -> bool {
        !self.shared.queue.lock().is_empty()
    }

    fn flush(&mut self) -> usize {
        let mut queue = self.shared.queue.lock();
        let n = queue.len().min(self.dataspace.len());
        for (slot, record) in self.dataspace.iter_mut().zip(queue.drain(..n)) {
            *slot = record;
        }
        self.flushed = n;
        trace!(flushed = n, left = queue.len(), "input session flushed");
        n
    }

    fn sigh(&self, cap: SignalContextCap) {
        debug!(context = ?cap.id(), "input session signal handler registered");
        *self.shared.sigh.lock() = Some(cap);
    }
}

/// Writing end of a [`LocalInputSession`].
#[derive(Clone)]
pub struct SessionProducer {
    shared: Arc<SessionShared>,
}

impl SessionProducer {
    /// Queue one event and notify the session's signal handler.
    pub fn submit(&self, event: impl Into<EventRecord>) {
        self.push(std::iter::once(event.into()));
        self.notify();
    }

    /// Queue several events, notifying once.
    pub fn submit_all<I>(&self, events: I)
    where
        I: IntoIterator,
        I::Item: Into<EventRecord>,
    {
        self.push(events.into_iter().map(Into::into));
        self.notify();
    }

    fn push(&self, records: impl Iterator<Item = EventRecord>) {
        let mut queue = self.shared.queue.lock();
        let mut overwritten = 0usize;
        for record in records {
            if queue.len() >= self.shared.limit {
                queue.pop_front();
                overwritten += 1;
            }
            queue.push_back(record);
        }
        drop(queue);

        if overwritten > 0 {
            debug!(overwritten, limit = self.shared.limit, "input session queue full, oldest events dropped");
        }
    }

    fn notify(&self) {
        let cap = self.shared.sigh.lock().clone();
        if let Some(cap) = cap {
            if let Err(e) = cap.submit() {
                debug!(error = %e, "input session notification dropped");
            }
        }
    }
}
