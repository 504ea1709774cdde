pub mod auth;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod models;
mod ro;
mod service;
#[cfg(feature = "youtube")]
mod youtube;

use std::sync::Arc;

pub use crate::auth::{Credential, CredentialProvider, StaticCredential};
#[cfg(feature = "mock")]
pub use crate::mock::{MockService, Operation, StoredVideo};
pub use crate::models::{ChunkAck, Collection, CollectionId, SessionHandle, VideoId, VideoMetadata, Visibility};
pub use crate::ro::{PREVIEW_ID_PREFIX, ReadOnlyService};
pub use crate::service::HostingService;
#[cfg(feature = "youtube")]
pub use crate::youtube::YouTubeService;

pub type ServiceHandle = Arc<dyn HostingService + Send + Sync>;
