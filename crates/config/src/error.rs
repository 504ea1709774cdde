//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source could not be read or did not match the expected shape.
    #[display("unable to load configuration")]
    Load,
    /// No recordings folder was configured anywhere.
    #[display("no recordings path configured (set recordings_path, REEL_RECORDINGS_PATH or --path)")]
    MissingRecordingsPath,
    /// A value was read successfully but is not acceptable.
    #[display("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
