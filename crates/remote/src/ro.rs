//! Preview wrapper around a real hosting service.
//!
//! Reads go through to the wrapped service so previews show which
//! collections already exist. Everything that would change the account is
//! logged and answered with a placeholder instead.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChunkAck, Collection, CollectionId, SessionHandle, VideoId, VideoMetadata};
use crate::{HostingService, ServiceHandle};

/// Marks identifiers handed out for objects that were never created.
pub const PREVIEW_ID_PREFIX: &str = "preview:";

/// Read-only hosting service.
///
/// Wraps another service and silently drops all mutations, logging an
/// [`info event`](tracing::Event) for each.
#[derive(Clone)]
pub struct ReadOnlyService {
    inner: ServiceHandle,
}
impl ReadOnlyService {
    pub fn new(inner: ServiceHandle) -> Self {
        Self { inner }
    }

    /// Whether an identifier was made up by a read-only service.
    pub fn is_placeholder(id: &str) -> bool {
        id.starts_with(PREVIEW_ID_PREFIX)
    }
}

#[async_trait]
impl HostingService for ReadOnlyService {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn create_upload_session(&self, metadata: &VideoMetadata, total_bytes: u64) -> Result<SessionHandle> {
        tracing::info!(title = %metadata.title, bytes = total_bytes, "Skipping upload during preview mode");
        Ok(SessionHandle(format!("{PREVIEW_ID_PREFIX}{}", metadata.title)))
    }

    async fn send_chunk(&self, _: &SessionHandle, offset: u64, bytes: &[u8], _: u64) -> Result<ChunkAck> {
        Ok(ChunkAck {
            committed: offset + bytes.len() as u64,
        })
    }

    async fn finalize(&self, session: &SessionHandle, _: u64) -> Result<VideoId> {
        Ok(VideoId(session.0.clone()))
    }

    async fn list_collections(&self, filter: Option<&str>) -> Result<Vec<Collection>> {
        self.inner.list_collections(filter).await
    }

    async fn create_collection(&self, name: &str) -> Result<CollectionId> {
        tracing::info!(collection = name, "Skipping collection creation during preview mode");
        Ok(CollectionId(format!("{PREVIEW_ID_PREFIX}{name}")))
    }

    async fn attach_video(&self, collection: &CollectionId, video: &VideoId) -> Result<()> {
        tracing::info!(%collection, %video, "Skipping collection attachment during preview mode");
        Ok(())
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{MockService, Operation};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mutations_never_reach_the_service() {
        let mock = Arc::new(MockService::default().with_collections([("PL1", "BUG")]));
        let preview = ReadOnlyService::new(mock.clone());

        let existing = preview.list_collections(Some("BUG")).await.unwrap();
        assert_eq!(existing[0].id, CollectionId("PL1".to_string()));

        let created = preview.create_collection("New").await.unwrap();
        assert!(ReadOnlyService::is_placeholder(&created.0));
        preview.attach_video(&created, &VideoId("v".to_string())).await.unwrap();

        assert_eq!(mock.calls(Operation::ListCollections).await, 1);
        assert_eq!(mock.calls(Operation::CreateCollection).await, 0);
        assert_eq!(mock.calls(Operation::AttachVideo).await, 0);
    }
}
