//! The seam between the upload pipeline and a video hosting service.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChunkAck, Collection, CollectionId, SessionHandle, VideoId, VideoMetadata};

/// A video host with resumable uploads and named collections.
///
/// Implementations translate their own failure responses into the shared
/// [`ErrorKind`](crate::error::ErrorKind) so callers can decide between
/// retrying, skipping a video and stopping the run without knowing which
/// service they talk to.
///
/// # Examples
///
/// ```
/// use reel_remote::{HostingService, error::Result};
///
/// async fn playlist_names(service: &dyn HostingService) -> Result<Vec<String>> {
///     let collections = service.list_collections(None).await?;
///     Ok(collections.into_iter().map(|c| c.name).collect())
/// }
/// ```
#[async_trait]
pub trait HostingService: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str;

    /// Starts a resumable upload of `total_bytes` bytes.
    async fn create_upload_session(&self, metadata: &VideoMetadata, total_bytes: u64) -> Result<SessionHandle>;

    /// Sends `bytes`, which start at `offset`, and reports how much of the
    /// upload the service has committed in total.
    async fn send_chunk(&self, session: &SessionHandle, offset: u64, bytes: &[u8], total_bytes: u64)
    -> Result<ChunkAck>;

    /// Completes an upload once every byte is committed.
    async fn finalize(&self, session: &SessionHandle, total_bytes: u64) -> Result<VideoId>;

    /// Lists the account's collections, optionally only those named `filter`.
    async fn list_collections(&self, filter: Option<&str>) -> Result<Vec<Collection>>;

    async fn create_collection(&self, name: &str) -> Result<CollectionId>;

    async fn attach_video(&self, collection: &CollectionId, video: &VideoId) -> Result<()>;
}
