//! Guest runtime boundary: opaque arguments, the entry point, and the
//! execution context the entry point must run in.

use std::cell::Cell;
use std::ffi::c_void;
use std::fmt;
use std::sync::{LazyLock, OnceLock};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use tracing::{debug, trace};

use crate::error::{SignalError, SignalResult};

// =============================================================================
// Opaque argument
// =============================================================================

/// Guest-side pointer, carried but never dereferenced on this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct GuestArg(usize);

impl GuestArg {
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    pub fn from_ptr(ptr: *mut c_void) -> Self {
        Self(ptr as usize)
    }

    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }

    #[inline]
    pub fn as_ptr(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

impl fmt::Display for GuestArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// =============================================================================
// Entry point
// =============================================================================

/// Guest callback. Must be re-entrant and must not unwind.
pub type GuestEntry = unsafe extern "C" fn(arg: *mut c_void);

/// Process-wide default entry point, installed once by the guest.
static GUEST_ENTRY: OnceLock<GuestEntry> = OnceLock::new();

/// Install the entry point used by [`super::SignalRegistration::create`].
pub fn install_guest_entry(entry: GuestEntry) -> SignalResult<()> {
    GUEST_ENTRY
        .set(entry)
        .map_err(|_| SignalError::EntryAlreadyInstalled)?;
    debug!("guest signal entry installed");
    Ok(())
}

pub fn installed_guest_entry() -> Option<GuestEntry> {
    GUEST_ENTRY.get().copied()
}

// =============================================================================
// Execution context
// =============================================================================

/// Scoped setup/teardown around a call into the guest.
///
/// Implementations tear down on every exit path, unwinding included.
pub trait GuestContext: Send + Sync {
    fn with_guest(&self, f: &mut dyn FnMut());
}

/// Serializes guest entry process-wide.
///
/// Nested entry from the thread that already holds the context is allowed,
/// so a guest callback may itself trigger another delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeContext;

static RUNTIME_LOCK: LazyLock<ReentrantMutex<()>> = LazyLock::new(|| ReentrantMutex::new(()));

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Held while the current thread is inside the guest.
struct Attached {
    _lock: ReentrantMutexGuard<'static, ()>,
}

impl Attached {
    fn enter() -> Self {
        let lock = RUNTIME_LOCK.lock();
        DEPTH.with(|d| d.set(d.get() + 1));
        Self { _lock: lock }
    }
}

impl Drop for Attached {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get() - 1));
    }
}

impl RuntimeContext {
    /// Nesting depth of the runtime context on the current thread.
    pub fn depth() -> usize {
        DEPTH.with(Cell::get)
    }
}

impl GuestContext for RuntimeContext {
    fn with_guest(&self, f: &mut dyn FnMut()) {
        let _attached = Attached::enter();
        trace!(depth = Self::depth(), "entered guest context");
        f();
    }
}

/// Calls straight through. For guests with no runtime state to set up.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unguarded;

impl GuestContext for Unguarded {
    fn with_guest(&self, f: &mut dyn FnMut()) {
        f();
    }
}

/// Context built from a closure that wraps the call.
pub struct FnContext<F>(pub F);

impl<F> GuestContext for FnContext<F>
where
    F: Fn(&mut dyn FnMut()) + Send + Sync,
{
    fn with_guest(&self, f: &mut dyn FnMut()) {
        (self.0)(f)
    }
}
