//! Signal bridge: OS notifications into guest callbacks.
//!
//! ```text
//! producer (session, timer, child exit, ...)
//!     │ cap.submit()
//!     ▼
//! Entrypoint ── pending queue ── futex wake ──► dispatch thread / host loop
//!                                                      │ on_signal()
//!                                                      ▼
//!                                           SignalRegistration
//!                                                      │ GuestContext::with_guest
//!                                                      ▼
//!                                         guest entry point(arg)
//! ```
//!
//! The entrypoint only holds a reference to the registration's handler; the
//! registration itself belongs to whoever created it, and dropping it is
//! the one way to stop deliveries.

pub mod bridge;
pub mod context;
pub mod entrypoint;
pub mod guest;

pub use bridge::SignalRegistration;
pub use context::{ContextId, DeliveryGate, GatePass, ManagedContext, SignalContextCap, SignalHandler};
pub use entrypoint::Entrypoint;
pub use guest::{
    install_guest_entry, installed_guest_entry, FnContext, GuestArg, GuestContext, GuestEntry,
    RuntimeContext, Unguarded,
};
