//! Internal infrastructure errors.
//!
//! Failures of the code under test are recorded as double state and never
//! surface as errors. This module covers the other tier: failures of the
//! double's own infrastructure, which have no double to be recorded against.

use thiserror::Error;

/// An error in the double's own infrastructure.
///
/// Reported to the configured [`FatalReporter`](crate::FatalReporter) when
/// one is present, otherwise raised as an unrecoverable panic: a broken
/// test environment, not a code-under-test failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InternalError {
    /// Creating a temporary directory under the configured base failed.
    #[error("temp_dir() failed to create directory: {0}")]
    TempDir(#[source] std::io::Error),
}
