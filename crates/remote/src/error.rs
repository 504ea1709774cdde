//! Remote Error Types
//!
//! Service failures are sorted by what the caller should do next: retry,
//! give up on this one video, or stop the whole run.

use derive_more::{Display, Error};

/// A hosting service error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for hosting service operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials are missing, expired or rejected.
    #[display("authentication rejected by the service")]
    Auth,
    /// The account is out of quota for the day.
    #[display("service quota exceeded")]
    QuotaExceeded,
    /// Too many requests in a short time.
    #[display("rate limited by the service")]
    RateLimited,
    /// The request did not complete in time.
    #[display("request timed out")]
    Timeout,
    /// Server-side failure that usually clears up on its own.
    #[display("temporary service failure (status {_0})")]
    Transient(#[error(not(source))] u16),
    /// The connection failed before a response arrived.
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The service accepted a chunk but acknowledged no new bytes.
    #[display("no upload progress acknowledged")]
    Stalled,
    /// The request itself was refused; sending it again will not help.
    #[display("request rejected by the service (status {_0})")]
    Rejected(#[error(not(source))] u16),
    /// The referenced session, collection or video does not exist.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The service answered with something that makes no sense.
    #[display("unexpected response: {_0}")]
    Protocol(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Timeout | Self::Transient(_) | Self::Network(_) | Self::Stalled
        )
    }

    /// Returns `true` if no further request can succeed during this run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth | Self::QuotaExceeded)
    }

    /// Classifies an HTTP error response. `reason` is the machine-readable
    /// reason reported in the error body, if any.
    pub fn from_status(status: u16, reason: Option<&str>) -> Self {
        match (status, reason) {
            (401, _) => Self::Auth,
            (403, Some("quotaExceeded" | "dailyLimitExceeded" | "uploadLimitExceeded")) => Self::QuotaExceeded,
            (403, Some("rateLimitExceeded" | "userRateLimitExceeded")) | (429, _) => Self::RateLimited,
            (404, _) => Self::NotFound(reason.unwrap_or("resource").to_string()),
            (408, _) => Self::Timeout,
            (500..=599, _) => Self::Transient(status),
            _ => Self::Rejected(status),
        }
    }
}
