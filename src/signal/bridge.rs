//! Signal-to-guest bridge.
//!
//! A [`SignalRegistration`] binds one opaque guest argument to a signal
//! context. When the context fires, the entrypoint calls
//! [`SignalRegistration::on_signal`], which enters the guest context and
//! calls the guest entry point with that argument. Nothing else: no retry,
//! no error handling, no interpretation of the argument.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::{SignalError, SignalResult};
use super::context::{DeliveryGate, ManagedContext, SignalContextCap, SignalHandler};
use super::entrypoint::Entrypoint;
use super::guest::{installed_guest_entry, GuestArg, GuestContext, GuestEntry, RuntimeContext};

/// What the entrypoint holds on to. Separate from the registration so the
/// entrypoint never owns the registration's lifetime.
struct GuestCall {
    arg: GuestArg,
    entry: GuestEntry,
    context: Arc<dyn GuestContext>,
}

impl GuestCall {
    fn invoke(&self) {
        let (entry, arg) = (self.entry, self.arg);
        trace!(arg = %arg, "calling guest signal entry");
        self.context.with_guest(&mut || {
            // SAFETY: `entry` was supplied by the guest for exactly this kind
            // of argument; the guest promises it is re-entrant and never unwinds.
            unsafe { entry(arg.as_ptr()) }
        });
    }
}

impl SignalHandler for GuestCall {
    fn on_signal(&self) {
        self.invoke();
    }

    fn deliver(&self, gate: &DeliveryGate) -> bool {
        let (entry, arg) = (self.entry, self.arg);
        let mut delivered = false;
        self.context.with_guest(&mut || {
            // Checked only once inside the guest context: a destroy issued
            // from within the guest closes the gate without waiting on us.
            let Some(_pass) = gate.enter() else {
                return;
            };
            trace!(arg = %arg, "calling guest signal entry");
            // SAFETY: as in `invoke`.
            unsafe { entry(arg.as_ptr()) };
            delivered = true;
        });
        delivered
    }
}

/// Live binding of a signal context to a guest callback.
///
/// Active from creation until drop; dropping dissolves the context, after
/// which submits to [`SignalRegistration::handle`] fail and never reach the
/// guest.
pub struct SignalRegistration {
    call: Arc<GuestCall>,
    context: ManagedContext,
}

impl SignalRegistration {
    /// Register with the globally installed guest entry point, entering the
    /// guest through [`RuntimeContext`].
    pub fn create(ep: &Entrypoint, arg: GuestArg) -> SignalResult<Self> {
        let entry = installed_guest_entry().ok_or(SignalError::NoGuestEntry)?;
        Self::create_with(ep, arg, entry, Arc::new(RuntimeContext))
    }

    /// Register with an explicit entry point and guest context.
    pub fn create_with(
        ep: &Entrypoint,
        arg: GuestArg,
        entry: GuestEntry,
        context: Arc<dyn GuestContext>,
    ) -> SignalResult<Self> {
        let call = Arc::new(GuestCall { arg, entry, context });
        let context = ep.manage(call.clone())?;
        Ok(Self { call, context })
    }

    /// Capability producers submit to in order to fire this registration.
    pub fn handle(&self) -> SignalContextCap {
        self.context.cap().clone()
    }

    pub fn arg(&self) -> GuestArg {
        self.call.arg
    }

    /// Enter the guest context and call the entry point with the stored
    /// argument. Normally invoked by the entrypoint, not by application code.
    pub fn on_signal(&self) {
        self.call.deliver(self.context.gate());
    }

    /// Tear down now instead of at end of scope.
    pub fn destroy(self) {}
}

impl fmt::Debug for SignalRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalRegistration")
            .field("arg", &self.call.arg)
            .field("context", &self.context.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntrypointConfig;
    use crate::signal::guest::{testing, RuntimeContext, Unguarded};
    use std::ffi::c_void;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_create_uses_installed_entry() {
        testing::install();
        let ep = Entrypoint::new(&EntrypointConfig::default());
        let reg = SignalRegistration::create(&ep, GuestArg::from_addr(0x5157_0001)).unwrap();

        reg.handle().submit().unwrap();
        assert_eq!(ep.dispatch_pending(), 1);
        assert_eq!(testing::calls_with(0x5157_0001), 1);
    }

    #[test]
    fn test_on_signal_calls_directly() {
        let entry = testing::install();
        let ep = Entrypoint::new(&EntrypointConfig::default());
        let reg = SignalRegistration::create_with(
            &ep,
            GuestArg::from_addr(0x5157_0002),
            entry,
            Arc::new(Unguarded),
        )
        .unwrap();

        reg.on_signal();
        reg.on_signal();
        assert_eq!(testing::calls_with(0x5157_0002), 2);
        assert_eq!(reg.arg(), GuestArg::from_addr(0x5157_0002));
    }

    static DEPTH_SEEN: AtomicUsize = AtomicUsize::new(usize::MAX);

    unsafe extern "C" fn depth_probe(_arg: *mut c_void) {
        DEPTH_SEEN.store(RuntimeContext::depth(), Ordering::SeqCst);
    }

    #[test]
    fn test_entry_runs_inside_runtime_context() {
        let ep = Entrypoint::new(&EntrypointConfig::default());
        let reg = SignalRegistration::create_with(
            &ep,
            GuestArg::default(),
            depth_probe,
            Arc::new(RuntimeContext),
        )
        .unwrap();

        reg.handle().submit().unwrap();
        ep.dispatch_pending();
        assert_eq!(DEPTH_SEEN.load(Ordering::SeqCst), 1);
        assert_eq!(RuntimeContext::depth(), 0);
    }

    #[test]
    fn test_destroy_severs_delivery() {
        let entry = testing::install();
        let ep = Entrypoint::new(&EntrypointConfig::default());
        let reg = SignalRegistration::create_with(
            &ep,
            GuestArg::from_addr(0x5157_0003),
            entry,
            Arc::new(Unguarded),
        )
        .unwrap();
        let cap = reg.handle();

        reg.destroy();
        assert!(matches!(cap.submit(), Err(SignalError::ContextDissolved)));
        assert_eq!(ep.dispatch_pending(), 0);
        assert_eq!(testing::calls_with(0x5157_0003), 0);
    }
}
