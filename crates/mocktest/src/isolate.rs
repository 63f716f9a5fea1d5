//! Isolated invocation of abortable closures.
//!
//! [`TestDouble::fail_now`](crate::TestDouble::fail_now) and
//! [`TestDouble::skip_now`](crate::TestDouble::skip_now) terminate the
//! calling thread of control, the way a terminal failure stops a real test
//! function. [`isolate`] gives that termination a boundary: it runs a closure
//! on a fresh OS thread and blocks until the thread exits, so an abort inside
//! the closure never reaches the thread that is asserting on the double.

use std::panic;
use std::sync::Once;
use std::thread;

/// Panic payload used to terminate a single thread of control.
///
/// Crate-private: [`isolate`] is the only place that swallows it, so an
/// abort escaping an un-isolated call site still surfaces as a panic.
pub(crate) struct ThreadAbort;

static QUIET_ABORT_HOOK: Once = Once::new();

/// Chain a panic hook that stays silent for [`ThreadAbort`] payloads.
///
/// Installed once, on the first abort. Every other payload is forwarded to
/// whichever hook was registered before us.
fn install_abort_hook() {
    QUIET_ABORT_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if info.payload().downcast_ref::<ThreadAbort>().is_none() {
                previous(info);
            }
        }));
    });
}

/// Terminate the calling thread by unwinding with the abort sentinel.
pub(crate) fn abort_thread() -> ! {
    install_abort_hook();
    panic::panic_any(ThreadAbort)
}

/// Run `f` on a separate thread and block until that thread exits.
///
/// The closure runs on a scoped OS thread, so it may borrow from the
/// caller's stack. `isolate` returns once the thread exits, whether by
/// normal return or by early termination from a terminal failure or skip.
/// Any other panic raised inside `f` is re-raised on the calling thread, so
/// a failed assertion inside the closure still fails the enclosing test.
///
/// # Examples
///
/// ```
/// use mocktest::{isolate, TestDouble};
///
/// let t = TestDouble::new("example");
/// isolate(|| {
///     t.fatal("stops here");
///     unreachable!("code after a terminal failure never runs");
/// });
/// assert!(t.failed());
/// assert!(t.aborted());
/// ```
pub fn isolate<F>(f: F)
where
    F: FnOnce() + Send,
{
    thread::scope(|scope| {
        if let Err(payload) = scope.spawn(f).join() {
            if payload.downcast_ref::<ThreadAbort>().is_none() {
                panic::resume_unwind(payload);
            }
        }
    });
}

// Tests
