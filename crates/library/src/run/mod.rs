//! The upload pipeline: scan, extract, resolve, transfer, commit.

mod job;
mod stream;
mod summary;

use reel_extract::models::MetadataRecord;
use std::path::PathBuf;

pub use self::stream::run;
pub use self::summary::{QuotaEstimate, RunSummary};
use crate::collections::Resolution;
use crate::error::{Error, ErrorKind};
use crate::scan::UploadCandidate;
use crate::transfer::Uploaded;

/// Progress events emitted by [`run`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`Discovered`](Self::Discovered) and [`Processed`](Self::Processed):
///    once per candidate each, a candidate always discovered before it is
///    processed.
/// 3. [`Halted`](Self::Halted): at most once, when a failure stops the run.
/// 4. [`Complete`](Self::Complete): exactly once, last.
///
/// Folders that cannot be read are surfaced as `Err` items in between,
/// without ending the stream.
#[derive(Debug)]
pub enum RunEvent {
    Started,
    Discovered(UploadCandidate),
    Processed(CandidateReport),
    /// No further candidates are dispatched.
    Halted(ErrorKind),
    Complete(RunSummary),
}

/// A file that was uploaded. The upload stands even when attaching it to
/// its collections or marking it as uploaded failed.
#[derive(Debug)]
pub struct Delivery {
    pub record: MetadataRecord,
    pub collections: Resolution,
    pub uploaded: Uploaded,
    pub renamed: Result<PathBuf, Error>,
}

/// What a run would have done with a file, in preview mode.
#[derive(Debug)]
pub struct Preview {
    pub record: MetadataRecord,
    pub collections: Resolution,
}

#[derive(Debug)]
pub enum FileOutcome {
    Uploaded(Box<Delivery>),
    Previewed(Box<Preview>),
    Failed(Error),
    /// Not attempted because the run was halted or cancelled first.
    Skipped,
}
impl FileOutcome {
    /// The failure that stops the whole run, if this outcome carries one.
    pub fn halt(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed(e) if e.halts_run() => Some(**e),
            Self::Uploaded(delivery) => delivery.uploaded.attachments.halted,
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Everything that happened to one candidate.
#[derive(Debug)]
pub struct CandidateReport {
    pub candidate: UploadCandidate,
    pub files: Vec<FileReport>,
    /// Batches only: the folder's new name once every file in it is done,
    /// or why that did not happen.
    pub folder: Option<Result<PathBuf, Error>>,
}
impl CandidateReport {
    pub fn halt(&self) -> Option<ErrorKind> {
        self.files.iter().find_map(|file| file.outcome.halt())
    }
}
