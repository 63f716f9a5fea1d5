//! Ordered configuration for constructing doubles.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::context::FatalReporter;
use crate::double::TestDouble;

/// Timeout applied when no timeout option is given.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Configuration snapshot held by every double.
///
/// Immutable after construction. Sub-tests receive a clone of the parent's
/// snapshot at creation time, never a live reference.
#[derive(Clone)]
pub(crate) struct Settings {
    pub(crate) abort: bool,
    pub(crate) deadline: Option<SystemTime>,
    pub(crate) base_temp_dir: PathBuf,
    pub(crate) reporter: Option<Arc<dyn FatalReporter>>,
}

impl Settings {
    fn defaults() -> Settings {
        Settings {
            abort: true,
            deadline: Some(SystemTime::now() + DEFAULT_TIMEOUT),
            base_temp_dir: std::env::temp_dir(),
            reporter: None,
        }
    }
}

/// Builder for [`TestDouble`].
///
/// Each method is a pure configuration mutation applied immediately, so
/// later calls override earlier ones the way ordered construction options
/// would:
///
/// ```
/// use std::time::Duration;
/// use mocktest::TestDouble;
///
/// let t = TestDouble::builder("my helper test")
///     .timeout(Duration::from_secs(30))
///     .no_abort()
///     .build();
///
/// assert_eq!(t.name(), "my_helper_test");
/// assert!(t.deadline().is_some());
/// ```
pub struct Builder {
    name: String,
    settings: Settings,
}

impl Builder {
    pub(crate) fn new(name: &str) -> Builder {
        Builder {
            name: name.replace(' ', "_"),
            settings: Settings::defaults(),
        }
    }

    /// Set the deadline to `now + d`. A zero duration disables the timeout
    /// entirely, making [`TestDouble::deadline`] report `None`.
    pub fn timeout(mut self, d: Duration) -> Builder {
        self.settings.deadline = if d.is_zero() {
            None
        } else {
            Some(SystemTime::now() + d)
        };
        self
    }

    /// Set an absolute deadline.
    pub fn deadline(mut self, at: SystemTime) -> Builder {
        self.settings.deadline = Some(at);
        self
    }

    /// Disable the timeout; [`TestDouble::deadline`] will report `None`.
    pub fn no_timeout(mut self) -> Builder {
        self.settings.deadline = None;
        self
    }

    /// Let `fail_now()` and `skip_now()` return instead of terminating the
    /// calling thread. Code sequenced after a terminal failure then runs,
    /// which diverges from a real test context; the abort intent is still
    /// recorded and visible via [`TestDouble::aborted`].
    pub fn no_abort(mut self) -> Builder {
        self.settings.abort = false;
        self
    }

    /// Base directory for [`TestDouble::temp_dir`]. An empty path is
    /// ignored, leaving the system default in place.
    pub fn base_temp_dir(mut self, dir: impl Into<PathBuf>) -> Builder {
        let dir = dir.into();
        if !dir.as_os_str().is_empty() {
            self.settings.base_temp_dir = dir;
        }
        self
    }

    /// Upstream reporter for infrastructure errors. Without one, such
    /// errors panic.
    pub fn reporter(mut self, reporter: Arc<dyn FatalReporter>) -> Builder {
        self.settings.reporter = Some(reporter);
        self
    }

    /// Construct the double.
    pub fn build(self) -> TestDouble {
        TestDouble::from_parts(self.name, self.settings)
    }
}
