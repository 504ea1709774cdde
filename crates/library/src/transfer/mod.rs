//! Resumable, chunked uploads of a single file.
//!
//! Every upload goes through the same states: a session is opened, the file
//! is sent chunk by chunk (each one acknowledged before the next is read),
//! the session is finalized, and the new video is attached to its
//! collections. Requests that fail temporarily are retried in place
//! according to the [`RetryPolicy`]; a retried chunk is sent again from the
//! last acknowledged offset, never from the start of the file.

pub(crate) mod error;
mod progress;
mod retry;

use exn::ResultExt;
use reel_extract::models::MetadataRecord;
use reel_remote::error::{ErrorKind as RemoteErrorKind, Result as RemoteResult};
use reel_remote::{ChunkAck, CollectionId, ServiceHandle, SessionHandle, VideoId, VideoMetadata, Visibility};
use reel_storage::LocalStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub use self::progress::{NoProgress, ProgressObserver};
pub use self::retry::{Backoff, ExponentialBackoff, RetryPolicy};
use self::error::{ErrorKind, Result};
use self::retry::with_retry;
use crate::collections::Resolution;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};

/// Default chunk size, 20 times the 256 KiB granularity uploads expect.
pub const DEFAULT_CHUNK_SIZE: u64 = 20 * 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    SessionOpen,
    Sending,
    Finalizing,
    Completed,
    Failed,
}

/// One upload attempt of one file. Never reused: a new run opens a new
/// session.
#[derive(Debug)]
pub struct TransferSession {
    pub handle: SessionHandle,
    pub state: State,
    /// Acknowledged bytes; only ever grows.
    pub bytes_sent: u64,
    pub total_bytes: u64,
    /// Attempts spent on the current chunk.
    pub attempt: u32,
}
impl TransferSession {
    fn new(handle: SessionHandle, total_bytes: u64) -> Self {
        Self {
            handle,
            state: State::SessionOpen,
            bytes_sent: 0,
            total_bytes,
            attempt: 0,
        }
    }

    fn advance(&mut self, to: State) {
        tracing::trace!(from = ?self.state, ?to, "Transfer state");
        self.state = to;
    }
}

/// What every upload is sent with, apart from the per-file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub chunk_size: u64,
    pub visibility: Visibility,
    pub category_id: String,
    pub language: String,
}
impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            visibility: Visibility::Unlisted,
            category_id: "20".to_string(),
            language: "de".to_string(),
        }
    }
}
impl UploadSettings {
    pub fn metadata(&self, record: &MetadataRecord) -> VideoMetadata {
        VideoMetadata {
            title: record.title.clone(),
            description: record.description(),
            tags: record.tags(),
            category_id: self.category_id.clone(),
            language: self.language.clone(),
            visibility: self.visibility,
            made_for_kids: false,
        }
    }
}

/// Outcome of attaching a new video to its collections. Failures here never
/// undo the upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentReport {
    pub attached: Vec<CollectionId>,
    pub failed: Vec<CollectionId>,
    /// Set when a failure stopped the remaining attachments.
    pub halted: Option<LibraryErrorKind>,
}
impl AttachmentReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub video: VideoId,
    pub bytes: u64,
    /// Attempts per sent chunk, in order.
    pub chunk_attempts: Vec<u32>,
    pub attachments: AttachmentReport,
}

fn library_kind(kind: &ErrorKind) -> LibraryErrorKind {
    match kind {
        ErrorKind::Auth(_) => LibraryErrorKind::Auth,
        ErrorKind::QuotaExceeded(_) => LibraryErrorKind::QuotaExceeded,
        ErrorKind::Exhausted { .. } => LibraryErrorKind::TransientTransfer,
        ErrorKind::Rejected(_) | ErrorKind::Read | ErrorKind::Truncated { .. } => LibraryErrorKind::FatalTransfer,
        ErrorKind::Cancelled => LibraryErrorKind::Cancelled,
    }
}

/// Uploads files to a hosting service.
pub struct Transfer {
    service: ServiceHandle,
    settings: UploadSettings,
    policy: RetryPolicy,
    progress: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
}
impl Transfer {
    pub fn new(service: ServiceHandle) -> Self {
        Self {
            service,
            settings: UploadSettings::default(),
            policy: RetryPolicy::default(),
            progress: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_settings(mut self, settings: UploadSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    /// Checked before each chunk and while waiting to retry. A chunk that is
    /// already being sent is always allowed to finish.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Uploads the file behind `record` and attaches it to every resolved
    /// collection, nearest first.
    #[tracing::instrument(skip_all, fields(path = %record.path.display()))]
    pub async fn upload(
        &self,
        store: &LocalStore,
        record: &MetadataRecord,
        collections: &Resolution,
    ) -> LibraryResult<Uploaded> {
        let result = self.upload_inner(store, record, collections).await;
        self.progress.finished(&record.path);
        result.map_err(|e| {
            let kind = library_kind(&e);
            e.raise(kind)
        })
    }

    async fn upload_inner(&self, store: &LocalStore, record: &MetadataRecord, collections: &Resolution) -> Result<Uploaded> {
        if self.cancel.is_cancelled() {
            exn::bail!(ErrorKind::Cancelled);
        }
        let mut source = store.open(&record.path).await.or_raise(|| ErrorKind::Read)?;
        let total = source.size();
        let metadata = self.settings.metadata(record);

        let service = &self.service;
        let metadata = &metadata;
        let (handle, _) = with_retry(&self.policy, &self.cancel, "open an upload session", move || {
            service.create_upload_session(metadata, total)
        })
        .await?;
        let mut session = TransferSession::new(handle, total);
        tracing::debug!(bytes = total, "Upload session open");
        self.progress.started(record, total);

        session.advance(State::Sending);
        let mut chunk_attempts = Vec::new();
        while session.bytes_sent < total {
            if self.cancel.is_cancelled() {
                session.advance(State::Failed);
                exn::bail!(ErrorKind::Cancelled);
            }
            let offset = session.bytes_sent;
            let len = usize::try_from((total - offset).min(self.settings.chunk_size)).unwrap_or(usize::MAX);
            let bytes = source.read_at(offset, len).await.or_raise(|| ErrorKind::Read)?;
            if bytes.len() < len {
                session.advance(State::Failed);
                exn::bail!(ErrorKind::Truncated {
                    expected: total,
                    found: offset + bytes.len() as u64,
                });
            }

            let handle = &session.handle;
            let chunk = bytes.as_slice();
            let result = with_retry(&self.policy, &self.cancel, "send a chunk", move || {
                send_chunk(service, handle, offset, chunk, total)
            })
            .await;
            let (ack, attempts) = match result {
                Ok(sent) => sent,
                Err(e) => {
                    session.advance(State::Failed);
                    return Err(e);
                },
            };
            session.attempt = attempts;
            session.bytes_sent = ack.committed;
            chunk_attempts.push(attempts);
            tracing::debug!(offset, committed = ack.committed, total, attempts, "Chunk acknowledged");
            self.progress.progress(&record.path, ack.committed, total);
        }

        session.advance(State::Finalizing);
        let handle = &session.handle;
        let (video, _) = with_retry(&self.policy, &self.cancel, "finalize the upload", move || {
            service.finalize(handle, total)
        })
        .await?;
        session.advance(State::Completed);
        tracing::info!(%video, bytes = total, "Upload complete");

        let attachments = self.attach(&video, collections).await;
        Ok(Uploaded {
            video,
            bytes: total,
            chunk_attempts,
            attachments,
        })
    }

    async fn attach(&self, video: &VideoId, collections: &Resolution) -> AttachmentReport {
        let mut report = AttachmentReport::default();
        let service = &self.service;
        for id in collections.ids() {
            if report.halted.is_some() {
                report.failed.push(id.clone());
                continue;
            }
            match with_retry(&self.policy, &self.cancel, "attach a video", move || service.attach_video(id, video)).await
            {
                Ok(_) => report.attached.push(id.clone()),
                Err(e) => {
                    tracing::warn!(collection = %id, %video, error = %*e, "Unable to attach video to collection");
                    if matches!(&*e, ErrorKind::Auth(_) | ErrorKind::QuotaExceeded(_)) {
                        report.halted = Some(library_kind(&e));
                    }
                    report.failed.push(id.clone());
                },
            }
        }
        report
    }
}

/// Sends one chunk and checks that the acknowledgement makes sense.
///
/// An acknowledgement that commits nothing new counts as a temporary
/// failure; one outside the chunk's range cannot be resumed from.
async fn send_chunk(
    service: &ServiceHandle,
    handle: &SessionHandle,
    offset: u64,
    bytes: &[u8],
    total: u64,
) -> RemoteResult<ChunkAck> {
    let ack = service.send_chunk(handle, offset, bytes, total).await?;
    let end = offset + bytes.len() as u64;
    if ack.committed < offset || ack.committed > end {
        exn::bail!(RemoteErrorKind::Protocol(format!(
            "acknowledged {} bytes for a chunk covering {offset}..{end}",
            ack.committed
        )));
    }
    if ack.committed == offset && !bytes.is_empty() {
        exn::bail!(RemoteErrorKind::Stalled);
    }
    Ok(ack)
}
