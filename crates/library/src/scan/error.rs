//! Error types for the [`scan`](super) module.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A scan error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The recordings root itself could not be listed; nothing was scanned.
    #[display("unable to list the recordings root")]
    Root,
    /// A folder could not be listed; everything below it was skipped.
    #[display("unable to list folder: {}", _0.display())]
    Unreadable(#[error(not(source))] PathBuf),
}
