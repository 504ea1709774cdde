//! Library Error Types
//!
//! Every failure a candidate can run into while it moves through the
//! pipeline, sorted by what happens next: the candidate is skipped, retried,
//! or the whole run stops.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The run cannot be set up as configured.
    #[display("invalid configuration")]
    Config,
    /// A folder or file could not be read while looking for candidates.
    #[display("unable to read from the recordings folder")]
    Discovery,
    /// The path does not yield usable metadata.
    #[display("unable to derive metadata from path")]
    Extraction,
    /// A collection could not be looked up or created.
    #[display("unable to resolve collection")]
    Collection,
    /// The service refused the credentials.
    #[display("authentication failed")]
    Auth,
    /// The service's quota is used up.
    #[display("upload quota exceeded")]
    QuotaExceeded,
    /// Temporary failures outlasted every retry.
    #[display("transfer failed after repeated temporary errors")]
    TransientTransfer,
    /// The service rejected the upload outright.
    #[display("transfer failed")]
    FatalTransfer,
    /// The upload succeeded but the source could not be marked as done.
    #[display("unable to mark source as uploaded")]
    Rename,
    /// The run was interrupted before this work began or finished.
    #[display("cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientTransfer)
    }

    /// Returns `true` if no further candidate can succeed in this run.
    pub fn halts_run(&self) -> bool {
        matches!(self, Self::Auth | Self::QuotaExceeded)
    }
}
