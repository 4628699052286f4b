//! Signal delivery into a simulated guest.
//!
//! The "guest" is a set of `extern "C"` entry points recording the argument
//! they were called with. Each test uses its own argument values so tests can
//! run in parallel against the shared log.

use std::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use input_bridge::input::{InputSession, LocalInputSession};
use input_bridge::signal::{FnContext, RuntimeContext, Unguarded};
use input_bridge::{
    Entrypoint, EntrypointConfig, Event, EventKind, EventSource, GuestArg, Keycode,
    SignalContextCap, SignalError, SignalRegistration,
};

// =============================================================================
// FAKE GUEST
// =============================================================================

static CALLS: Mutex<Vec<usize>> = Mutex::new(Vec::new());

unsafe extern "C" fn guest_handle_signal(arg: *mut c_void) {
    CALLS.lock().unwrap().push(arg as usize);
}

fn calls_with(addr: usize) -> usize {
    CALLS.lock().unwrap().iter().filter(|a| **a == addr).count()
}

fn register(ep: &Entrypoint, addr: usize) -> SignalRegistration {
    SignalRegistration::create_with(ep, GuestArg::from_addr(addr), guest_handle_signal, Arc::new(RuntimeContext))
        .expect("register")
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

// =============================================================================
// TESTS
// =============================================================================

#[test]
fn single_delivery_carries_exact_argument() {
    let ep = Entrypoint::new(&EntrypointConfig::default());
    let reg = register(&ep, 0xDEAD_BEEF);

    reg.handle().submit().unwrap();
    assert_eq!(ep.dispatch_pending(), 1);
    assert_eq!(calls_with(0xDEAD_BEEF), 1);

    // No second delivery without a second signal
    assert_eq!(ep.dispatch_pending(), 0);
    assert_eq!(calls_with(0xDEAD_BEEF), 1);

    reg.handle().submit().unwrap();
    ep.dispatch_pending();
    assert_eq!(calls_with(0xDEAD_BEEF), 2);
}

#[test]
fn only_the_signaled_registration_fires() {
    const A: usize = 0xA000_0001;
    const B: usize = 0xB000_0001;

    let ep = Entrypoint::new(&EntrypointConfig::default());
    let a = register(&ep, A);
    let b = register(&ep, B);
    assert_ne!(a.handle(), b.handle());

    a.handle().submit().unwrap();
    ep.dispatch_pending();

    assert_eq!(calls_with(A), 1);
    assert_eq!(calls_with(B), 0);
}

#[test]
fn same_argument_distinct_contexts_are_independent() {
    const ARG: usize = 0xC000_0001;

    let ep = Entrypoint::new(&EntrypointConfig::default());
    let first = register(&ep, ARG);
    let second = register(&ep, ARG);
    assert_ne!(first.handle().id(), second.handle().id());

    first.handle().submit().unwrap();
    ep.dispatch_pending();
    assert_eq!(calls_with(ARG), 1);

    second.handle().submit().unwrap();
    ep.dispatch_pending();
    assert_eq!(calls_with(ARG), 2);
}

#[test]
fn destroyed_registration_is_never_delivered() {
    const ARG: usize = 0xD000_0001;

    let ep = Entrypoint::new(&EntrypointConfig::default());
    let reg = register(&ep, ARG);
    let cap = reg.handle();

    cap.submit().unwrap();
    drop(reg);

    assert_eq!(ep.dispatch_pending(), 0);
    assert!(matches!(cap.submit(), Err(SignalError::ContextDissolved)));
    assert_eq!(ep.dispatch_pending(), 0);
    assert_eq!(calls_with(ARG), 0);
}

#[test]
fn guest_context_wraps_every_call() {
    const ARG: usize = 0xE000_0001;

    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));
    let log_ctx = log.clone();
    let ctx = FnContext(move |f: &mut dyn FnMut()| {
        log_ctx.lock().unwrap().push("enter");
        f();
        log_ctx.lock().unwrap().push("leave");
    });

    let ep = Entrypoint::new(&EntrypointConfig::default());
    let reg = SignalRegistration::create_with(&ep, GuestArg::from_addr(ARG), guest_handle_signal, Arc::new(ctx))
        .unwrap();

    reg.handle().submit().unwrap();
    ep.dispatch_pending();

    assert_eq!(*log.lock().unwrap(), vec!["enter", "leave"]);
    assert_eq!(calls_with(ARG), 1);
}

static PIPELINE_FLUSHED: AtomicUsize = AtomicUsize::new(0);

/// Guest entry whose argument really is a pointer to guest state.
unsafe extern "C" fn count_into(arg: *mut c_void) {
    // SAFETY: the test passes a pointer to a static AtomicUsize.
    let counter = unsafe { &*(arg as *const AtomicUsize) };
    counter.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn session_notifies_guest_through_spawned_entrypoint() {
    let config = EntrypointConfig { name: "input-ep".into(), ..Default::default() };
    let ep = Entrypoint::spawn(&config).unwrap();

    let mut session = LocalInputSession::new(16);
    let arg = GuestArg::from_ptr(&PIPELINE_FLUSHED as *const AtomicUsize as *mut c_void);
    let reg = SignalRegistration::create_with(&ep, arg, count_into, Arc::new(Unguarded)).unwrap();
    session.sigh(reg.handle());

    let producer = session.producer();
    let writer = thread::spawn(move || {
        producer.submit(Event::press_char(Keycode::KEY_H, 'h'));
        producer.submit(Event::release(Keycode::KEY_H));
    });
    writer.join().unwrap();

    assert!(wait_until(|| PIPELINE_FLUSHED.load(Ordering::SeqCst) >= 1));

    assert_eq!(session.flush(), 2);
    let kinds: Vec<EventKind> = session.event_buffer().iter().map(|r| r.kind()).collect();
    assert_eq!(kinds, vec![EventKind::Press, EventKind::Release]);

    drop(reg);
    drop(ep);
}

#[test]
fn create_without_installed_entry_fails() {
    // This binary never installs a global entry point
    let ep = Entrypoint::new(&EntrypointConfig::default());
    assert!(matches!(
        SignalRegistration::create(&ep, GuestArg::from_addr(1)),
        Err(SignalError::NoGuestEntry)
    ));
}

static BLOCK_ENTERED: AtomicBool = AtomicBool::new(false);
static BLOCK_RELEASE: AtomicBool = AtomicBool::new(false);
static BLOCK_FINISHED: AtomicBool = AtomicBool::new(false);

/// Stays inside the guest until the test releases it.
unsafe extern "C" fn blocking_entry(_arg: *mut c_void) {
    BLOCK_ENTERED.store(true, Ordering::SeqCst);
    while !BLOCK_RELEASE.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(20));
    BLOCK_FINISHED.store(true, Ordering::SeqCst);
}

#[test]
fn destroy_waits_for_in_flight_delivery() {
    let config = EntrypointConfig { name: "in-flight-ep".into(), ..Default::default() };
    let ep = Entrypoint::spawn(&config).unwrap();
    let reg = SignalRegistration::create_with(
        &ep,
        GuestArg::from_addr(0xF000_0001),
        blocking_entry,
        Arc::new(Unguarded),
    )
    .unwrap();
    let cap = reg.handle();

    cap.submit().unwrap();
    assert!(wait_until(|| BLOCK_ENTERED.load(Ordering::SeqCst)));

    let (done_tx, done_rx) = mpsc::channel();
    let dropper = thread::spawn(move || {
        drop(reg);
        done_tx.send(BLOCK_FINISHED.load(Ordering::SeqCst)).unwrap();
    });

    // The guest entry is still running, so destroy has not returned
    assert!(done_rx.recv_timeout(Duration::from_millis(100)).is_err());

    BLOCK_RELEASE.store(true, Ordering::SeqCst);
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    dropper.join().unwrap();

    assert!(matches!(cap.submit(), Err(SignalError::ContextDissolved)));
}

static CROSS_HELD: Mutex<Option<SignalRegistration>> = Mutex::new(None);
static CROSS_CAP: Mutex<Option<SignalContextCap>> = Mutex::new(None);
static CROSS_FIRED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn cross_target(_arg: *mut c_void) {
    CROSS_FIRED.fetch_add(1, Ordering::SeqCst);
}

/// Signals the other entrypoint's registration, then destroys it, all
/// while still inside the guest.
unsafe extern "C" fn cross_destroyer(_arg: *mut c_void) {
    if let Some(cap) = CROSS_CAP.lock().unwrap().as_ref() {
        let _ = cap.submit();
    }
    // The other dispatch thread is now waiting to enter the guest
    thread::sleep(Duration::from_millis(100));
    drop(CROSS_HELD.lock().unwrap().take());
}

#[test]
fn guest_destroys_registration_of_another_entrypoint() {
    let config = EntrypointConfig { name: "cross-ep".into(), ..Default::default() };
    let ep1 = Entrypoint::spawn(&config).unwrap();
    let reg1 = SignalRegistration::create_with(
        &ep1,
        GuestArg::from_addr(0xF100_0001),
        cross_target,
        Arc::new(RuntimeContext),
    )
    .unwrap();
    *CROSS_CAP.lock().unwrap() = Some(reg1.handle());
    *CROSS_HELD.lock().unwrap() = Some(reg1);

    let ep2 = Entrypoint::new(&EntrypointConfig::default());
    let reg2 = SignalRegistration::create_with(
        &ep2,
        GuestArg::from_addr(0xF100_0002),
        cross_destroyer,
        Arc::new(RuntimeContext),
    )
    .unwrap();
    reg2.handle().submit().unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let driver = thread::spawn(move || {
        done_tx.send(ep2.dispatch_pending()).unwrap();
        ep2
    });
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(1), "destroy inside the guest blocked");
    let ep2 = driver.join().unwrap();

    let cap = CROSS_CAP.lock().unwrap().take().unwrap();
    assert!(matches!(cap.submit(), Err(SignalError::ContextDissolved)));

    // Joins the dispatch thread that was waiting to deliver
    drop(ep1);
    assert_eq!(CROSS_FIRED.load(Ordering::SeqCst), 0);

    drop(reg2);
    drop(ep2);
}
