//! input-bridge: host side of a guest runtime's input and signal plumbing.
//!
//! This cdylib is loaded next to an embedded guest runtime. It defines the
//! input-event records the host's session writes into shared memory, and
//! forwards asynchronous OS signals into the guest's callback dispatch.
//!
//! # Architecture
//!
//! ```text
//! Host (OS services)                              Guest runtime
//! ──────────────────                              ─────────────
//! input session                                   reads records
//!   │ writes [EventRecord; N]                        ▲
//!   ▼                                                │ input_event_kind / _attr
//!  ┌──────────────────────────────────────────────────┐
//!  │        shared event buffer (16-byte records)      │
//!  └──────────────────────────────────────────────────┘
//!
//! signal producer ──► Entrypoint ──► SignalRegistration ──► guest entry(arg)
//!   cap.submit()        dispatch        GuestContext             (extern "C")
//! ```
//!
//! Rust callers use [`input`] and [`signal`] directly; the guest goes
//! through the `extern "C"` functions below.

pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod signal;

pub use config::{BridgeConfig, EntrypointConfig};
pub use error::{AccessError, ConfigError, SignalError};
pub use input::{Event, EventBuffer, EventKind, EventRecord, EventSource, Keycode};
pub use signal::{Entrypoint, GuestArg, SignalContextCap, SignalRegistration};

use std::ffi::c_void;
use std::ptr;
use std::sync::OnceLock;

use tracing::{info, warn};

use input::{InputSession, LocalInputSession};
use signal::GuestEntry;

// =============================================================================
// GLOBAL STATE
// =============================================================================

/// Process-wide entrypoint, started by `input_bridge_init()`.
static ENTRYPOINT: OnceLock<Entrypoint> = OnceLock::new();

/// Configuration accepted by `input_bridge_init()`.
static CONFIG: OnceLock<BridgeConfig> = OnceLock::new();

fn session_capacity() -> usize {
    CONFIG
        .get()
        .map_or(config::DEFAULT_SESSION_CAPACITY, |c| c.session_capacity)
}

// =============================================================================
// FFI EXPORTS: SETUP
// =============================================================================

/// Read the configuration from the environment, set up logging and start
/// the process-wide entrypoint.
///
/// Returns 0 on success, 1 if already initialized, 2 on a bad configuration,
/// 3 if the dispatch thread could not be started.
#[unsafe(no_mangle)]
pub extern "C" fn input_bridge_init() -> u32 {
    let config = BridgeConfig::from_env();
    logging::init(config.as_ref().ok().and_then(|c| c.log_filter.as_deref()));

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "input-bridge configuration rejected");
            return 2;
        }
    };
    let _ = CONFIG.set(config.clone());

    if ENTRYPOINT.get().is_some() {
        return 1;
    }

    match Entrypoint::spawn(&config.entrypoint) {
        Ok(ep) => match ENTRYPOINT.set(ep) {
            Ok(()) => {
                info!(ep = %config.entrypoint.name, max_contexts = config.entrypoint.max_contexts,
                    "input-bridge initialized");
                0
            }
            Err(_) => 1,
        },
        Err(e) => {
            warn!(error = %e, "failed to start entrypoint");
            3
        }
    }
}

/// Install the default log subscriber only. Returns 0 if this call installed
/// it, 1 otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn input_bridge_init_logging() -> u32 {
    if logging::init(None) { 0 } else { 1 }
}

// =============================================================================
// FFI EXPORTS: INPUT EVENTS
// =============================================================================

/// Kind discriminant of `ev`; `Invalid` (0) for null.
///
/// # Safety
/// `ev` must be null or point to a valid record.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn input_event_kind(ev: *const EventRecord) -> u32 {
    // SAFETY: null or valid per contract.
    match unsafe { ev.as_ref() } {
        Some(record) => record.kind() as u32,
        None => EventKind::Invalid as u32,
    }
}

/// Pointer to the three payload words of `ev`; null for null.
///
/// # Safety
/// `ev` must be null or point to a valid record. The result borrows from it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn input_event_attr(ev: *const EventRecord) -> *const u32 {
    // SAFETY: null or valid per contract.
    match unsafe { ev.as_ref() } {
        Some(record) => record.attr_words().as_ptr(),
        None => ptr::null(),
    }
}

/// Base of the session's event dataspace; null for null.
///
/// # Safety
/// `session` must be null or point to a live session.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn input_event_buffer(session: *const LocalInputSession) -> *const EventRecord {
    // SAFETY: null or live per contract.
    match unsafe { session.as_ref() } {
        Some(session) => session.dataspace_ptr(),
        None => ptr::null(),
    }
}

/// Create a local input session. A `capacity` of 0 selects the configured
/// session capacity. Free with `input_session_destroy`.
#[unsafe(no_mangle)]
pub extern "C" fn input_session_create(capacity: u32) -> *mut LocalInputSession {
    let capacity = match capacity {
        0 => session_capacity(),
        n => n as usize,
    };
    Box::into_raw(Box::new(LocalInputSession::new(capacity)))
}

/// # Safety
/// `session` must be null or come from `input_session_create`, and must not
/// be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn input_session_destroy(session: *mut LocalInputSession) {
    if session.is_null() {
        return;
    }
    // SAFETY: allocated by `input_session_create`, ownership returns here once.
    drop(unsafe { Box::from_raw(session) });
}

/// Queue one record on the session. 0 = queued, 1 = null argument.
///
/// # Safety
/// `session` must be null or point to a live session; `ev` must be null or
/// point to a valid record.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn input_session_submit(
    session: *const LocalInputSession,
    ev: *const EventRecord,
) -> u32 {
    // SAFETY: null or valid per contract.
    let (Some(session), Some(record)) = (unsafe { session.as_ref() }, unsafe { ev.as_ref() }) else {
        return 1;
    };
    session.producer().submit(*record);
    0
}

/// Have the session signal `reg` when events arrive. 0 = ok, 1 = null argument.
///
/// # Safety
/// `session` must be null or point to a live session; `reg` must be null or
/// a live registration from `signal_dispatcher_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn input_session_sigh(
    session: *const LocalInputSession,
    reg: *const SignalRegistration,
) -> u32 {
    // SAFETY: null or live per contract.
    let (Some(session), Some(reg)) = (unsafe { session.as_ref() }, unsafe { reg.as_ref() }) else {
        return 1;
    };
    session.sigh(reg.handle());
    0
}

/// Flush the session; returns the number of readable records.
///
/// # Safety
/// `session` must be null or point to a live session not borrowed elsewhere.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn input_session_flush(session: *mut LocalInputSession) -> u32 {
    // SAFETY: null or live and exclusive per contract.
    match unsafe { session.as_mut() } {
        Some(session) => session.flush() as u32,
        None => 0,
    }
}

// =============================================================================
// FFI EXPORTS: SIGNALS
// =============================================================================

/// Install the guest's signal entry point. 0 = ok, 1 = already installed,
/// 2 = null entry.
#[unsafe(no_mangle)]
pub extern "C" fn signal_install_entry(entry: Option<GuestEntry>) -> u32 {
    let Some(entry) = entry else {
        return 2;
    };
    match signal::install_guest_entry(entry) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Create a registration delivering to the installed entry point with `arg`.
/// A null `ep` selects the process-wide entrypoint. Returns null on failure.
///
/// # Safety
/// `ep` must be null or point to a live entrypoint that outlives the result.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn signal_dispatcher_create(
    ep: *const Entrypoint,
    arg: *mut c_void,
) -> *mut SignalRegistration {
    // SAFETY: null or live per contract.
    let ep = match unsafe { ep.as_ref() } {
        Some(ep) => ep,
        None => match ENTRYPOINT.get() {
            Some(ep) => ep,
            None => {
                warn!("signal_dispatcher_create before input_bridge_init");
                return ptr::null_mut();
            }
        },
    };

    match SignalRegistration::create(ep, GuestArg::from_ptr(arg)) {
        Ok(reg) => Box::into_raw(Box::new(reg)),
        Err(e) => {
            warn!(error = %e, "signal_dispatcher_create failed");
            ptr::null_mut()
        }
    }
}

/// Context id behind the registration's capability; 0 for null.
///
/// # Safety
/// `reg` must be null or come from `signal_dispatcher_create` and not yet
/// be destroyed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn signal_dispatcher_cap(reg: *const SignalRegistration) -> u64 {
    // SAFETY: null or live per contract.
    match unsafe { reg.as_ref() } {
        Some(reg) => reg.handle().id().raw(),
        None => 0,
    }
}

/// Fire the registration's own context. 0 = submitted, 1 = failed.
///
/// # Safety
/// Same as [`signal_dispatcher_cap`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn signal_dispatcher_submit(reg: *const SignalRegistration) -> u32 {
    // SAFETY: null or live per contract.
    let Some(reg) = (unsafe { reg.as_ref() }) else {
        return 1;
    };
    match reg.handle().submit() {
        Ok(()) => 0,
        Err(e) => {
            warn!(error = %e, "signal_dispatcher_submit failed");
            1
        }
    }
}

/// Destroy a registration. No delivery happens after this returns.
///
/// # Safety
/// `reg` must be null or come from `signal_dispatcher_create`, and must not
/// be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn signal_dispatcher_destroy(reg: *mut SignalRegistration) {
    if reg.is_null() {
        return;
    }
    // SAFETY: allocated by `signal_dispatcher_create`, ownership returns here once.
    drop(unsafe { Box::from_raw(reg) });
}
