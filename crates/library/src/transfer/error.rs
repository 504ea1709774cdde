//! Error types for the [`transfer`](super) module.

use derive_more::{Display, Error};

/// A transfer error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("authentication rejected while trying to {_0}")]
    Auth(#[error(not(source))] &'static str),
    #[display("quota exceeded while trying to {_0}")]
    QuotaExceeded(#[error(not(source))] &'static str),
    /// Every attempt ended in a temporary failure.
    #[display("unable to {what} after {attempts} attempts")]
    Exhausted { what: &'static str, attempts: u32 },
    /// A failure that another attempt would not fix.
    #[display("service refused to {_0}")]
    Rejected(#[error(not(source))] &'static str),
    #[display("unable to read from the source file")]
    Read,
    /// The source file got shorter after the session was opened.
    #[display("source file ended at {found} bytes, expected {expected}")]
    Truncated { expected: u64, found: u64 },
    #[display("cancelled before the upload completed")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
