pub mod error;
mod local;
mod models;
mod path;
mod source;

pub use crate::local::LocalStore;
pub use crate::models::{Entry, EntryKind, FileInfo};
pub use crate::path::contain as contain_path;
pub use crate::source::SourceFile;
