//! Input event model: the records shared between host and guest.
//!
//! # Architecture
//!
//! ```text
//! host drivers (already decoded)
//!        │
//!        ▼
//!   transport (session) ── writes ──► [EventRecord; N]   16 bytes each
//!                                        │
//!                              EventBuffer<'_> (borrowed view)
//!                                        │
//!                    ┌───────────────────┼────────────────────┐
//!                    │                   │                    │
//!              kind(index)      payload_as::<V>(index)   event(index) → Event
//! ```
//!
//! A record is `kind: u32` followed by three payload words; see
//! [`payload`] for the word layout of each kind. Readers either dispatch on
//! the kind and pull the matching payload (checked), or decode into the
//! [`Event`] sum type and `match` on it.

pub mod buffer;
pub mod event;
pub mod keycode;
pub mod payload;
pub mod session;

pub use buffer::{EventBuffer, EventSource, KindSet};
pub use event::{Event, EventKind, EventRecord, EVENT_RECORD_SIZE};
pub use keycode::Keycode;
pub use payload::{
    AbsoluteMotion, Codepoint, Payload, Press, RelativeMotion, Release, Touch, TouchId,
    TouchRelease, Wheel,
};
pub use session::{InputSession, LocalInputSession, SessionProducer, QUEUE_DEPTH_FACTOR};
