use reel_extract::models::MetadataRecord;
use std::path::Path;

/// Receives progress reports while files are uploaded.
///
/// Several files may be in flight at once when more than one worker runs,
/// so every report names the file it belongs to. All methods default to
/// doing nothing.
pub trait ProgressObserver: Send + Sync {
    /// The upload session is open and `total` bytes are about to be sent.
    fn started(&self, _record: &MetadataRecord, _total: u64) {}

    /// `sent` bytes of `total` have been acknowledged by the service.
    fn progress(&self, _path: &Path, _sent: u64, _total: u64) {}

    /// The upload ended, successfully or not.
    fn finished(&self, _path: &Path) {}
}

/// Ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;
impl ProgressObserver for NoProgress {}
