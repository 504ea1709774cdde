//! In-memory hosting service for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::HostingService;
use crate::error::{ErrorKind, Result};
use crate::models::{ChunkAck, Collection, CollectionId, SessionHandle, VideoId, VideoMetadata};

/// The service calls a [`MockService`] counts and can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateSession,
    SendChunk,
    Finalize,
    ListCollections,
    CreateCollection,
    AttachVideo,
}

#[derive(Debug)]
struct Script {
    operation: Operation,
    /// Zero-based call number from which the script applies.
    from_call: usize,
    /// How many more times to fail; `None` fails forever.
    remaining: Option<usize>,
    kind: ErrorKind,
}

#[derive(Debug)]
struct Session {
    metadata: VideoMetadata,
    total: u64,
    received: Vec<u8>,
}

/// An upload that was finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVideo {
    pub id: VideoId,
    pub metadata: VideoMetadata,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    collections: Vec<Collection>,
    sessions: HashMap<String, Session>,
    videos: Vec<StoredVideo>,
    attachments: Vec<(CollectionId, VideoId)>,
    scripts: Vec<Script>,
    calls: HashMap<Operation, usize>,
    next_id: usize,
}
impl State {
    /// Counts the call and returns the scripted failure for it, if any.
    fn call(&mut self, operation: Operation) -> Result<()> {
        let count = self.calls.entry(operation).or_default();
        let call = *count;
        *count += 1;
        let script = self.scripts.iter_mut().find(|s| {
            s.operation == operation && call >= s.from_call && s.remaining.is_none_or(|remaining| remaining > 0)
        });
        if let Some(script) = script {
            if let Some(remaining) = script.remaining.as_mut() {
                *remaining -= 1;
            }
            exn::bail!(script.kind.clone());
        }
        Ok(())
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-memory hosting service for testing.
///
/// Uploads are kept in memory and verified byte for byte: a chunk must start
/// exactly where the previous acknowledgement ended, and finalizing requires
/// every byte. Failures are scripted per [`Operation`].
///
/// # Examples
///
/// ```
/// use reel_remote::{HostingService, MockService, Operation, error::ErrorKind};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let service = MockService::default()
///     .with_collections([("PL1", "BUG")])
///     .fail_next(Operation::CreateCollection, ErrorKind::Transient(503));
/// assert!(service.create_collection("New").await.is_err());
/// assert!(service.create_collection("New").await.is_ok());
/// assert_eq!(service.calls(Operation::CreateCollection).await, 2);
/// # }
/// ```
#[derive(Debug)]
pub struct MockService {
    name: String,
    state: Mutex<State>,
    ack_limit: Option<usize>,
    create_delay: Option<Duration>,
}
impl Default for MockService {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            state: Mutex::new(State::default()),
            ack_limit: None,
            create_delay: None,
        }
    }
}
impl MockService {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pre-populate the account with `(id, name)` collections.
    pub fn with_collections<'a>(mut self, collections: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let state = self.state.get_mut();
        for (id, name) in collections {
            state.collections.push(Collection {
                id: CollectionId(id.to_string()),
                name: name.to_string(),
            });
        }
        self
    }

    /// Fail the next not yet scripted call of `operation` with `kind`.
    pub fn fail_next(mut self, operation: Operation, kind: ErrorKind) -> Self {
        self.state.get_mut().scripts.push(Script {
            operation,
            from_call: 0,
            remaining: Some(1),
            kind,
        });
        self
    }

    /// Fail every call of `operation` from the zero-based call number `call`
    /// onwards.
    pub fn fail_from(mut self, operation: Operation, call: usize, kind: ErrorKind) -> Self {
        self.state.get_mut().scripts.push(Script {
            operation,
            from_call: call,
            remaining: None,
            kind,
        });
        self
    }

    /// Only commit up to `bytes` bytes of each chunk, like a server that
    /// stored part of a request before the connection dropped.
    pub fn with_ack_limit(mut self, bytes: usize) -> Self {
        self.ack_limit = Some(bytes);
        self
    }

    /// Hold every collection creation for `delay`, widening the window for
    /// concurrent duplicates.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub async fn calls(&self, operation: Operation) -> usize {
        self.state.lock().await.calls.get(&operation).copied().unwrap_or_default()
    }

    pub async fn collections(&self) -> Vec<Collection> {
        self.state.lock().await.collections.clone()
    }

    pub async fn videos(&self) -> Vec<StoredVideo> {
        self.state.lock().await.videos.clone()
    }

    pub async fn attachments(&self) -> Vec<(CollectionId, VideoId)> {
        self.state.lock().await.attachments.clone()
    }
}

#[async_trait]
impl HostingService for MockService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_upload_session(&self, metadata: &VideoMetadata, total_bytes: u64) -> Result<SessionHandle> {
        let mut state = self.state.lock().await;
        state.call(Operation::CreateSession)?;
        let id = state.next_id("session");
        state.sessions.insert(id.clone(), Session {
            metadata: metadata.clone(),
            total: total_bytes,
            received: Vec::new(),
        });
        Ok(SessionHandle(id))
    }

    async fn send_chunk(
        &self,
        session: &SessionHandle,
        offset: u64,
        bytes: &[u8],
        total_bytes: u64,
    ) -> Result<ChunkAck> {
        let mut state = self.state.lock().await;
        state.call(Operation::SendChunk)?;
        let Some(upload) = state.sessions.get_mut(&session.0) else {
            exn::bail!(ErrorKind::NotFound(session.0.clone()));
        };
        if upload.total != total_bytes || upload.received.len() as u64 != offset {
            exn::bail!(ErrorKind::Protocol(format!(
                "chunk at {offset} of {total_bytes}, expected {} of {}",
                upload.received.len(),
                upload.total
            )));
        }
        let accepted = self.ack_limit.map_or(bytes.len(), |limit| limit.min(bytes.len()));
        upload.received.extend_from_slice(&bytes[..accepted]);
        Ok(ChunkAck {
            committed: upload.received.len() as u64,
        })
    }

    async fn finalize(&self, session: &SessionHandle, total_bytes: u64) -> Result<VideoId> {
        let mut state = self.state.lock().await;
        state.call(Operation::Finalize)?;
        let Some(upload) = state.sessions.remove(&session.0) else {
            exn::bail!(ErrorKind::NotFound(session.0.clone()));
        };
        if upload.received.len() as u64 != total_bytes {
            let received = upload.received.len();
            state.sessions.insert(session.0.clone(), upload);
            exn::bail!(ErrorKind::Protocol(format!("finalized after {received} of {total_bytes} bytes")));
        }
        let id = VideoId(state.next_id("video"));
        state.videos.push(StoredVideo {
            id: id.clone(),
            metadata: upload.metadata,
            data: upload.received,
        });
        Ok(id)
    }

    async fn list_collections(&self, filter: Option<&str>) -> Result<Vec<Collection>> {
        let mut state = self.state.lock().await;
        state.call(Operation::ListCollections)?;
        Ok(state
            .collections
            .iter()
            .filter(|c| filter.is_none_or(|name| c.name == name))
            .cloned()
            .collect())
    }

    async fn create_collection(&self, name: &str) -> Result<CollectionId> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().await;
        state.call(Operation::CreateCollection)?;
        let id = CollectionId(state.next_id("collection"));
        state.collections.push(Collection {
            id: id.clone(),
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn attach_video(&self, collection: &CollectionId, video: &VideoId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.call(Operation::AttachVideo)?;
        if !state.collections.iter().any(|c| &c.id == collection) {
            exn::bail!(ErrorKind::NotFound(collection.0.clone()));
        }
        state.attachments.push((collection.clone(), video.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            title: "video".to_string(),
            description: String::new(),
            tags: Vec::new(),
            category_id: "20".to_string(),
            language: "de".to_string(),
            visibility: Default::default(),
            made_for_kids: false,
        }
    }

    #[tokio::test]
    async fn test_upload_round_trip() {
        let service = MockService::default();
        let session = service.create_upload_session(&metadata(), 6).await.unwrap();
        assert_eq!(service.send_chunk(&session, 0, b"abcd", 6).await.unwrap().committed, 4);
        assert_eq!(service.send_chunk(&session, 4, b"ef", 6).await.unwrap().committed, 6);
        let video = service.finalize(&session, 6).await.unwrap();
        let videos = service.videos().await;
        assert_eq!(videos[0].id, video);
        assert_eq!(videos[0].data, b"abcdef");
    }

    #[tokio::test]
    async fn test_chunk_at_wrong_offset_is_rejected() {
        let service = MockService::default();
        let session = service.create_upload_session(&metadata(), 6).await.unwrap();
        let err = service.send_chunk(&session, 2, b"cd", 6).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Protocol(_)));
    }

    #[tokio::test]
    async fn test_ack_limit_commits_part_of_a_chunk() {
        let service = MockService::default().with_ack_limit(3);
        let session = service.create_upload_session(&metadata(), 6).await.unwrap();
        assert_eq!(service.send_chunk(&session, 0, b"abcd", 6).await.unwrap().committed, 3);
        let err = service.finalize(&session, 6).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Protocol(_)));
    }

    #[tokio::test]
    async fn test_scripts() {
        let service = MockService::default()
            .fail_next(Operation::ListCollections, ErrorKind::Transient(500))
            .fail_from(Operation::CreateSession, 1, ErrorKind::QuotaExceeded);
        assert!(service.list_collections(None).await.is_err());
        assert!(service.list_collections(None).await.is_ok());

        assert!(service.create_upload_session(&metadata(), 1).await.is_ok());
        for _ in 0..3 {
            let err = service.create_upload_session(&metadata(), 1).await.unwrap_err();
            assert_eq!(&*err, &ErrorKind::QuotaExceeded);
        }
        assert_eq!(service.calls(Operation::CreateSession).await, 4);
    }

    #[tokio::test]
    async fn test_list_filter_is_exact() {
        let service = MockService::default().with_collections([("PL1", "BUG"), ("PL2", "bug"), ("PL3", "BUGS")]);
        let found = service.list_collections(Some("BUG")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, CollectionId("PL1".to_string()));
    }
}
