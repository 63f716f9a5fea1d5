//! The recording test double.
//!
//! [`TestDouble`] is a lock-protected state container with the capability
//! surface of a standard test context. Every mutator call is recorded as
//! inspectable state instead of driving a test runner: failures become a
//! counter, log lines become an output sequence, sub-tests become child
//! doubles, and terminal failures terminate only the thread that raised
//! them.
//!
//! State is guarded by one `RwLock` per instance. Sequential use never
//! contends on it; the lock makes inspection from the asserting thread safe
//! while a sub-test body thread is still recording. Inspector methods
//! returning [`StateView`] hold the read lock for the life of the view, so
//! views are cheap but should not be held across mutator calls on the same
//! double.

use std::fmt;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::builder::{Builder, Settings};
use crate::context::{FatalReporter, TestContext};
use crate::error::InternalError;
use crate::isolate::{abort_thread, isolate};

/// A recorded cleanup callback.
pub type CleanupFn = Box<dyn Fn() + Send + Sync>;

/// Copy-free view into a double's recorded state.
///
/// Holds the double's read lock while alive. Concurrent appends from an
/// in-flight sub-test body block until the view is dropped, and vice versa.
pub type StateView<'a, T> = MappedRwLockReadGuard<'a, T>;

/// Recorded state. All appends happen in call-issue order under the lock.
#[derive(Default)]
struct State {
    failed: usize,
    skipped: bool,
    aborted: bool,
    parallel: bool,
    output: Vec<String>,
    helpers: Vec<String>,
    cleanups: Vec<CleanupFn>,
    cleanup_sites: Vec<String>,
    env: FxHashMap<String, String>,
    subtests: Vec<Arc<TestDouble>>,
    used_names: FxHashSet<String>,
    temp_dirs: Vec<PathBuf>,
}

/// A recording stand-in for a test context.
///
/// Construct one with [`TestDouble::new`] or [`TestDouble::builder`], hand
/// it to the helper under test as a [`TestContext`], then assert on the
/// recorded state through the inspector methods.
///
/// ```
/// use mocktest::{TestContext, TestDouble};
///
/// fn flaky_helper(t: &dyn TestContext) {
///     t.helper();
///     t.error("it broke");
/// }
///
/// let t = TestDouble::new("flaky");
/// flaky_helper(&t);
///
/// assert!(t.failed());
/// assert_eq!(t.failed_count(), 1);
/// assert_eq!(*t.output(), vec!["it broke\n".to_string()]);
/// ```
pub struct TestDouble {
    name: String,
    settings: Settings,
    state: RwLock<State>,
}

impl TestDouble {
    /// Create a double with default configuration. Spaces in `name` are
    /// normalized to underscores.
    pub fn new(name: &str) -> TestDouble {
        Builder::new(name).build()
    }

    /// Start configuring a double. See [`Builder`].
    pub fn builder(name: &str) -> Builder {
        Builder::new(name)
    }

    pub(crate) fn from_parts(name: String, settings: Settings) -> TestDouble {
        TestDouble {
            name,
            settings,
            state: RwLock::new(State::default()),
        }
    }

    /// The double's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The advisory deadline, if a timeout is active. Fixed at construction
    /// and inherited by sub-tests; nothing in the double acts on it.
    pub fn deadline(&self) -> Option<SystemTime> {
        self.settings.deadline
    }

    // Logging.
    //
    // Every log-producing call funnels through `log` or `logf`, which pin
    // down the two rendering rules: `log` always appends a newline, `logf`
    // appends one only when missing.

    /// Record one line of output: `message` with a newline appended, even
    /// when `message` already ends in one.
    pub fn log(&self, message: &str) {
        let mut line = String::with_capacity(message.len() + 1);
        line.push_str(message);
        line.push('\n');
        self.state.write().output.push(line);
    }

    /// Record one formatted line of output, appending a trailing newline
    /// only when the rendered text does not already end in one.
    pub fn logf(&self, args: fmt::Arguments<'_>) {
        let mut line = fmt::format(args);
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.state.write().output.push(line);
    }

    /// Accumulated output from all log-producing calls, in call order.
    pub fn output(&self) -> StateView<'_, Vec<String>> {
        RwLockReadGuard::map(self.state.read(), |s| &s.output)
    }

    // Failure reporting.

    /// Mark the double failed. Increments the failure counter and nothing
    /// else.
    pub fn fail(&self) {
        self.state.write().failed += 1;
    }

    /// [`fail`](TestDouble::fail), then terminate the calling thread.
    ///
    /// When aborting was disabled via [`Builder::no_abort`] the termination
    /// is suppressed and control flow continues, but the abort intent is
    /// still recorded.
    pub fn fail_now(&self) {
        self.fail();
        self.abort_point();
    }

    /// Log `message`, then [`fail`](TestDouble::fail). Non-terminating.
    pub fn error(&self, message: &str) {
        self.log(message);
        self.fail();
    }

    /// Formatted variant of [`error`](TestDouble::error).
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.logf(args);
        self.fail();
    }

    /// Log `message`, then [`fail_now`](TestDouble::fail_now).
    pub fn fatal(&self, message: &str) {
        self.log(message);
        self.fail_now();
    }

    /// Formatted variant of [`fatal`](TestDouble::fatal).
    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.logf(args);
        self.fail_now();
    }

    /// Whether the double has been marked failed at least once.
    pub fn failed(&self) -> bool {
        self.state.read().failed > 0
    }

    /// How many times the double has been marked failed.
    ///
    /// A failed sub-test contributes exactly one increment to its parent,
    /// however many failures the sub-test itself recorded.
    pub fn failed_count(&self) -> usize {
        self.state.read().failed
    }

    // Skip reporting. Parallel in structure to failure reporting, on an
    // independent flag: a double can be both failed and skipped.

    /// Log `message`, then [`skip_now`](TestDouble::skip_now).
    pub fn skip(&self, message: &str) {
        self.log(message);
        self.skip_now();
    }

    /// Formatted variant of [`skip`](TestDouble::skip).
    pub fn skipf(&self, args: fmt::Arguments<'_>) {
        self.logf(args);
        self.skip_now();
    }

    /// Mark the double skipped, then terminate the calling thread with the
    /// same suppression rules as [`fail_now`](TestDouble::fail_now).
    pub fn skip_now(&self) {
        self.state.write().skipped = true;
        self.abort_point();
    }

    /// Whether the double has been marked skipped.
    pub fn skipped(&self) -> bool {
        self.state.read().skipped
    }

    /// Record the abort intent, then terminate the calling thread unless
    /// aborting was disabled at construction.
    fn abort_point(&self) {
        // The write guard must drop before unwinding, or later readers
        // would block forever.
        self.state.write().aborted = true;
        if self.settings.abort {
            abort_thread();
        }
    }

    /// Whether a terminal failure or skip instructed the double to abort.
    ///
    /// True even when [`Builder::no_abort`] suppressed the termination
    /// itself: intent to abort is recorded separately from whether the
    /// abort was honored.
    pub fn aborted(&self) -> bool {
        self.state.read().aborted
    }

    // Helper and cleanup tracking.

    /// Record the immediate caller as a helper function.
    ///
    /// The recorded identifier is the caller's source location rendered as
    /// `file:line:column`, an opaque and stable identifier for the calling
    /// function. One entry is appended per call, without de-duplication.
    #[track_caller]
    pub fn helper(&self) {
        self.record_helper(Location::caller());
    }

    fn record_helper(&self, site: &Location<'_>) {
        self.state.write().helpers.push(site.to_string());
    }

    /// Identifiers recorded by [`helper`](TestDouble::helper), in call
    /// order.
    pub fn helper_names(&self) -> StateView<'_, Vec<String>> {
        RwLockReadGuard::map(self.state.read(), |s| &s.helpers)
    }

    /// Record a cleanup callback, in call order.
    ///
    /// The double never invokes callbacks; responsibility for running them
    /// stays with the caller. Inspect them via
    /// [`cleanup_funcs`](TestDouble::cleanup_funcs) and
    /// [`cleanup_names`](TestDouble::cleanup_names).
    #[track_caller]
    pub fn cleanup<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.record_cleanup(Box::new(f), Location::caller());
    }

    fn record_cleanup(&self, f: CleanupFn, site: &Location<'_>) {
        let mut state = self.state.write();
        state.cleanups.push(f);
        state.cleanup_sites.push(site.to_string());
    }

    /// Recorded cleanup callbacks, in registration order. Callers may
    /// invoke them through the view; the double itself never does.
    pub fn cleanup_funcs(&self) -> StateView<'_, Vec<CleanupFn>> {
        RwLockReadGuard::map(self.state.read(), |s| &s.cleanups)
    }

    /// Registration-site identifiers of the recorded cleanup callbacks
    /// (`file:line:column`), in registration order.
    pub fn cleanup_names(&self) -> Vec<String> {
        self.state.read().cleanup_sites.clone()
    }

    // Parallel marking.

    /// Record the intent to run in parallel. Idempotent; the double never
    /// schedules anything.
    pub fn parallel(&self) {
        self.state.write().parallel = true;
    }

    /// Whether [`parallel`](TestDouble::parallel) has been called.
    pub fn paralleled(&self) -> bool {
        self.state.read().parallel
    }

    // Environment recording.

    /// Record an environment variable assignment. The process environment
    /// is never touched. Empty keys are ignored.
    pub fn set_env(&self, key: &str, value: &str) {
        if key.is_empty() {
            return;
        }
        self.state.write().env.insert(key.to_owned(), value.to_owned());
    }

    /// Live view of the recorded environment assignments.
    pub fn env(&self) -> StateView<'_, FxHashMap<String, String>> {
        RwLockReadGuard::map(self.state.read(), |s| &s.env)
    }

    // Temp directory creation.

    /// Prefix of directories created by [`temp_dir`](TestDouble::temp_dir).
    const TEMP_DIR_PREFIX: &'static str = "mocktest-";

    /// Create a real, unique temporary directory under the configured base
    /// and record its path.
    ///
    /// The one operation with an external side effect: a path that pointed
    /// nowhere would be useless to the code under test. Created directories
    /// are never removed by the double.
    ///
    /// On creation failure the rendered [`InternalError`] is forwarded to
    /// the configured [`FatalReporter`]; the reporter's own abort semantics
    /// then apply to this thread. Without a reporter the failure panics:
    /// it indicates a broken test environment, not a recordable failure.
    pub fn temp_dir(&self) -> PathBuf {
        let created = tempfile::Builder::new()
            .prefix(Self::TEMP_DIR_PREFIX)
            .tempdir_in(&self.settings.base_temp_dir);

        let dir = match created {
            Ok(dir) => {
                // keep() opts out of tempfile's drop-time deletion; the
                // double never removes what it hands out.
                let path = dir.keep();
                tracing::debug!(dir = %path.display(), "created temp dir");
                path
            }
            Err(err) => {
                self.internal_error(&InternalError::TempDir(err));
                // Reachable only when a configured reporter declined to
                // abort this thread.
                PathBuf::new()
            }
        };

        self.state.write().temp_dirs.push(dir.clone());
        dir
    }

    /// Paths returned by [`temp_dir`](TestDouble::temp_dir), in call order.
    pub fn temp_dirs(&self) -> StateView<'_, Vec<PathBuf>> {
        RwLockReadGuard::map(self.state.read(), |s| &s.temp_dirs)
    }

    fn internal_error(&self, err: &InternalError) {
        match &self.settings.reporter {
            Some(reporter) => reporter.fatal(&format!("mocktest: {err}")),
            None => panic!("mocktest: {err}"),
        }
    }

    // Sub-test execution.

    /// Execute `body` as a named sub-test, blocking until it finishes.
    ///
    /// The requested name is normalized (spaces to underscores) and
    /// disambiguated against earlier siblings with a `#NN` suffix; the
    /// child's full name is `parent/child`. The child inherits the parent's
    /// configuration snapshot. `body` runs on its own thread via
    /// [`isolate`], so terminal failures inside it never unwind the caller.
    ///
    /// A failed child marks the parent failed with a single
    /// [`fail`](TestDouble::fail). Returns whether the child did **not**
    /// fail.
    pub fn run<F>(&self, name: &str, body: F) -> bool
    where
        F: FnOnce(&TestDouble) + Send,
    {
        let child = self.new_subtest(name);

        tracing::debug!(name = child.name(), "running subtest");

        let body_child = Arc::clone(&child);
        isolate(move || body(&body_child));

        if child.failed() {
            self.fail();
        }

        !child.failed()
    }

    fn new_subtest(&self, requested: &str) -> Arc<TestDouble> {
        let mut state = self.state.write();

        let sub_name = disambiguate(&state.used_names, requested);
        let full_name = if self.name.is_empty() {
            sub_name.clone()
        } else {
            format!("{}/{}", self.name, sub_name)
        };

        let child = Arc::new(TestDouble::from_parts(full_name, self.settings.clone()));
        state.used_names.insert(sub_name);
        state.subtests.push(Arc::clone(&child));

        child
    }

    /// Child doubles created by [`run`](TestDouble::run), in launch order.
    pub fn subtests(&self) -> StateView<'_, Vec<Arc<TestDouble>>> {
        RwLockReadGuard::map(self.state.read(), |s| &s.subtests)
    }
}

/// Normalize a requested sub-test name and make it unique among `used`.
///
/// Only spaces normalize; any other character is kept. Collisions gain a
/// two-digit, 1-based `#NN` suffix in request order.
fn disambiguate(used: &FxHashSet<String>, requested: &str) -> String {
    let base = requested.replace(' ', "_");
    if !used.contains(&base) {
        return base;
    }

    let mut n = 1_u32;
    loop {
        let candidate = format!("{base}#{n:02}");
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

impl TestContext for TestDouble {
    fn name(&self) -> &str {
        TestDouble::name(self)
    }

    fn deadline(&self) -> Option<SystemTime> {
        TestDouble::deadline(self)
    }

    fn log(&self, message: &str) {
        TestDouble::log(self, message);
    }

    fn logf(&self, args: fmt::Arguments<'_>) {
        TestDouble::logf(self, args);
    }

    fn error(&self, message: &str) {
        TestDouble::error(self, message);
    }

    fn errorf(&self, args: fmt::Arguments<'_>) {
        TestDouble::errorf(self, args);
    }

    fn fail(&self) {
        TestDouble::fail(self);
    }

    fn fail_now(&self) {
        TestDouble::fail_now(self);
    }

    fn failed(&self) -> bool {
        TestDouble::failed(self)
    }

    fn fatal(&self, message: &str) {
        TestDouble::fatal(self, message);
    }

    fn fatalf(&self, args: fmt::Arguments<'_>) {
        TestDouble::fatalf(self, args);
    }

    fn skip(&self, message: &str) {
        TestDouble::skip(self, message);
    }

    fn skipf(&self, args: fmt::Arguments<'_>) {
        TestDouble::skipf(self, args);
    }

    fn skip_now(&self) {
        TestDouble::skip_now(self);
    }

    fn skipped(&self) -> bool {
        TestDouble::skipped(self)
    }

    #[track_caller]
    fn helper(&self) {
        self.record_helper(Location::caller());
    }

    #[track_caller]
    fn cleanup(&self, f: Box<dyn Fn() + Send + Sync>) {
        self.record_cleanup(f, Location::caller());
    }

    fn parallel(&self) {
        TestDouble::parallel(self);
    }

    fn set_env(&self, key: &str, value: &str) {
        TestDouble::set_env(self, key, value);
    }

    fn temp_dir(&self) -> PathBuf {
        TestDouble::temp_dir(self)
    }

    fn run(&self, name: &str, body: Box<dyn FnOnce(&dyn TestContext) + Send + '_>) -> bool {
        TestDouble::run(self, name, move |child: &TestDouble| body(child))
    }
}

impl FatalReporter for TestDouble {
    fn fatal(&self, message: &str) {
        TestDouble::fatal(self, message);
    }
}

// Tests
