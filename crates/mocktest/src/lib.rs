//! Recording test double for unit-testing test helpers.
//!
//! Test helpers, meaning functions that call assertion and failure
//! primitives on the test context they are handed, are hard to unit-test: a
//! real test
//! context fails the very test that is exercising the helper. [`TestDouble`]
//! mirrors the capability surface of a test context and records every call
//! as inspectable state instead, so the asserting test can check what the
//! helper did after the fact.
//!
//! Helpers are written against the [`TestContext`] trait and accept a real
//! context or a double interchangeably:
//!
//! ```
//! use mocktest::{TestContext, TestDouble};
//!
//! fn assert_positive(t: &dyn TestContext, n: i64) {
//!     t.helper();
//!     if n <= 0 {
//!         t.errorf(format_args!("expected positive, got {n}"));
//!     }
//! }
//!
//! let t = TestDouble::new("assert_positive");
//! assert_positive(&t, -3);
//!
//! assert!(t.failed());
//! assert_eq!(*t.output(), vec!["expected positive, got -3\n".to_string()]);
//! ```
//!
//! Terminal failures (`fatal`, `fail_now`, `skip`, …) terminate only the
//! thread that raised them. Run abortable code through [`isolate`] (done
//! automatically for [`TestDouble::run`] sub-test bodies) to keep the
//! termination away from the asserting thread:
//!
//! ```
//! use mocktest::{isolate, TestDouble};
//!
//! let t = TestDouble::new("fatal");
//! isolate(|| {
//!     t.fatal("gone");
//!     t.log("never recorded");
//! });
//!
//! assert!(t.aborted());
//! assert_eq!(*t.output(), vec!["gone\n".to_string()]);
//! ```

mod builder;
mod context;
mod double;
mod error;
mod isolate;

pub use builder::Builder;
pub use context::{FatalReporter, TestContext};
pub use double::{CleanupFn, StateView, TestDouble};
pub use error::InternalError;
pub use isolate::isolate;
