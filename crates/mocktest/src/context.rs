//! Capability traits consumed and exposed by the double.
//!
//! [`TestContext`] is the contract test helpers are written against: the
//! mutator surface of a standard test context. Helpers that take
//! `&dyn TestContext` (or a `T: TestContext` generic) can be driven by a
//! [`TestDouble`](crate::TestDouble) in their own unit tests and asserted on
//! afterwards.
//!
//! [`FatalReporter`] is the single capability the double consumes: an
//! upstream sink for infrastructure errors that cannot be attributed to any
//! double state.

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Upstream sink for terminal failure reports.
///
/// Used only when the double's own infrastructure fails (see
/// [`TestDouble::temp_dir`](crate::TestDouble::temp_dir)). `TestDouble`
/// implements this itself, so one double can act as another's reporter.
pub trait FatalReporter: Send + Sync {
    /// Report a terminal failure. Implementations are free to abort the
    /// calling thread, the way a real test context's fatal would.
    fn fatal(&self, message: &str);
}

/// The capability surface of a test context.
///
/// Mirrors the mutator face of a standard unit-test context so that helper
/// functions written against it accept a real context or a recording double
/// interchangeably. The one deliberate difference in shape is [`run`]: the
/// sub-test body receives `&dyn TestContext` recursively, which is what
/// makes arbitrary-depth nesting possible without a runner-owned concrete
/// type.
///
/// Formatted variants (`errorf`, `fatalf`, `skipf`, `logf`) take
/// [`fmt::Arguments`], built with [`format_args!`]:
///
/// ```
/// use mocktest::{TestContext, TestDouble};
///
/// fn check_len(t: &dyn TestContext, s: &str, want: usize) {
///     t.helper();
///     if s.len() != want {
///         t.errorf(format_args!("length of {s:?}: want {want}, got {}", s.len()));
///     }
/// }
///
/// let t = TestDouble::new("check_len");
/// check_len(&t, "abc", 4);
/// assert!(t.failed());
/// ```
///
/// [`run`]: TestContext::run
pub trait TestContext {
    /// The context's name.
    fn name(&self) -> &str;

    /// The advisory deadline, if a timeout is active. Nothing enforces it.
    fn deadline(&self) -> Option<SystemTime>;

    /// Record one line of output, newline-terminated.
    fn log(&self, message: &str);

    /// Record one formatted line of output, appending a trailing newline
    /// only when the rendered text does not already end in one.
    fn logf(&self, args: fmt::Arguments<'_>);

    /// Log `message`, then mark the context failed. Non-terminating.
    fn error(&self, message: &str);

    /// Formatted variant of [`error`](TestContext::error).
    fn errorf(&self, args: fmt::Arguments<'_>);

    /// Mark the context failed. No other side effect.
    fn fail(&self);

    /// Mark the context failed and terminate the calling thread.
    ///
    /// When aborting was disabled at construction the termination is
    /// suppressed, but the abort intent is still recorded.
    fn fail_now(&self);

    /// Whether the context has been marked failed at least once.
    fn failed(&self) -> bool;

    /// Log `message`, then [`fail_now`](TestContext::fail_now).
    fn fatal(&self, message: &str);

    /// Formatted variant of [`fatal`](TestContext::fatal).
    fn fatalf(&self, args: fmt::Arguments<'_>);

    /// Log `message`, then [`skip_now`](TestContext::skip_now).
    fn skip(&self, message: &str);

    /// Formatted variant of [`skip`](TestContext::skip).
    fn skipf(&self, args: fmt::Arguments<'_>);

    /// Mark the context skipped and terminate the calling thread, with the
    /// same abort suppression rules as [`fail_now`](TestContext::fail_now).
    /// Skip and fail are independent dimensions.
    fn skip_now(&self);

    /// Whether the context has been marked skipped.
    fn skipped(&self) -> bool;

    /// Record the immediate caller as a helper function.
    #[track_caller]
    fn helper(&self);

    /// Record a cleanup callback. The double never invokes callbacks; it
    /// only records them for later inspection.
    #[track_caller]
    fn cleanup(&self, f: Box<dyn Fn() + Send + Sync>);

    /// Record the intent to run in parallel. No scheduling effect.
    fn parallel(&self);

    /// Record an environment variable assignment. Empty keys are ignored.
    fn set_env(&self, key: &str, value: &str);

    /// Create a real, unique temporary directory and return its path.
    fn temp_dir(&self) -> PathBuf;

    /// Execute `body` as a named sub-test on its own thread, blocking until
    /// it finishes. Returns whether the sub-test did **not** fail.
    fn run(&self, name: &str, body: Box<dyn FnOnce(&dyn TestContext) + Send + '_>) -> bool;
}
