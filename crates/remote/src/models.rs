use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};

/// Who can see an uploaded video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[display("public")]
    Public,
    #[default]
    #[display("unlisted")]
    Unlisted,
    #[display("private")]
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct VideoId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{_0}")]
pub struct CollectionId(pub String);

/// Opaque resumable upload session, only meaningful to the service that
/// issued it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(pub String);
impl Debug for SessionHandle {
    // Upload URLs carry a token, keep them out of the logs.
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("SessionHandle(..)")
    }
}

/// A remote collection (playlist).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
}

/// How far the service has committed an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkAck {
    /// Total bytes stored so far; the next chunk starts here.
    pub committed: u64,
}

/// Everything sent along with a new upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub language: String,
    pub visibility: Visibility,
    pub made_for_kids: bool,
}
