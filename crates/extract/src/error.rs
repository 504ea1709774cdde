//! Extraction Error Types
//!
//! Everything in this crate is derived from a path and a single `stat`, so
//! the only failure that is worth retrying is the filesystem read.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The path does not live below the recordings root.
    #[display("path is outside the recordings root: {}", _0.display())]
    OutsideRoot(#[error(not(source))] PathBuf),
    /// The path contains `..`, a prefix or some other non-name component.
    #[display("path contains unexpected components: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Neither the file nor any of its folders carries a transfer-state prefix.
    #[display("path has no transfer-state prefix: {}", _0.display())]
    Untagged(#[error(not(source))] PathBuf),
    /// Nothing is left of the file name once prefix and extension are removed.
    #[display("file name does not contain a title: {}", _0.display())]
    EmptyTitle(#[error(not(source))] PathBuf),
    /// The file could not be inspected on disk.
    #[display("unable to read file metadata: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
