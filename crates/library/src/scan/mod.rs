pub(crate) mod error;
mod batch;
mod candidate;
mod stream;

pub use self::batch::expand_batch;
pub use self::candidate::{CandidateKind, UploadCandidate};
pub use self::stream::scan;
