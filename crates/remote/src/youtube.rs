//! YouTube Data API v3 client.
//!
//! Uploads use the resumable protocol: a `POST` opens a session whose URL is
//! returned in the `Location` header, chunks are `PUT` to that URL with a
//! `Content-Range`, and the server answers `308` with a `Range` header until
//! the last byte arrives. Collections map onto playlists.

use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LOCATION, RANGE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::CredentialProvider;
use crate::error::{ErrorKind, Result};
use crate::models::{ChunkAck, Collection, CollectionId, SessionHandle, VideoId, VideoMetadata};
use crate::HostingService;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: &str = "50";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ErrorReason {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct Resource {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<Playlist>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Playlist {
    id: String,
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: String,
}

/// Hosting service backed by a YouTube channel.
pub struct YouTubeService {
    client: Client,
    credentials: Arc<dyn CredentialProvider>,
    language: String,
    api_base: String,
    upload_url: String,
}
impl YouTubeService {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            // A 308 here means "resume incomplete", never a redirect.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .or_raise(|| ErrorKind::Network("unable to build HTTP client".to_string()))?;
        Ok(Self {
            client,
            credentials,
            language: "de".to_string(),
            api_base: API_BASE.to_string(),
            upload_url: UPLOAD_URL.to_string(),
        })
    }

    /// Language set on new playlists.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Point the client at another deployment of the same API.
    pub fn with_endpoints(mut self, api_base: impl Into<String>, upload_url: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.upload_url = upload_url.into();
        self
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let credential = self.credentials.credential().await?;
        Ok(request.bearer_auth(credential.secret()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = self.authorized(request).await?;
        request.send().await.map_err(|e| exn::Exn::from(transport_error(&e)))
    }

    async fn json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .or_raise(|| ErrorKind::Protocol("unreadable response body".to_string()))
    }
}

fn transport_error(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Timeout
    } else {
        ErrorKind::Network(err.to_string())
    }
}

/// First machine-readable reason in a Google API error body.
fn error_reason(body: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(body).ok()?;
    body.error.errors.into_iter().next().map(|e| e.reason)
}

async fn failure(response: Response) -> exn::Exn<ErrorKind> {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let reason = error_reason(&body);
    let kind = ErrorKind::from_status(status, reason.as_deref());
    tracing::debug!(status, reason = reason.as_deref(), error = %kind, "Request failed");
    exn::Exn::from(kind)
}

/// Parses `bytes=0-1234` into the number of committed bytes.
fn committed_from_range(range: Option<&str>) -> Result<u64> {
    let Some(range) = range else {
        return Ok(0);
    };
    let last = range
        .strip_prefix("bytes=")
        .and_then(|r| r.split_once('-'))
        .and_then(|(_, last)| last.trim().parse::<u64>().ok())
        .ok_or_raise(|| ErrorKind::Protocol(format!("malformed Range header: {range}")))?;
    Ok(last + 1)
}

#[async_trait]
impl HostingService for YouTubeService {
    fn name(&self) -> &str {
        "youtube"
    }

    async fn create_upload_session(&self, metadata: &VideoMetadata, total_bytes: u64) -> Result<SessionHandle> {
        let body = json!({
            "snippet": {
                "title": metadata.title,
                "description": metadata.description,
                "tags": metadata.tags,
                "categoryId": metadata.category_id,
                "defaultLanguage": metadata.language,
                "defaultAudioLanguage": metadata.language,
            },
            "status": {
                "privacyStatus": metadata.visibility.to_string(),
                "selfDeclaredMadeForKids": metadata.made_for_kids,
                "embeddable": true,
                "license": "youtube",
                "publicStatsViewable": true,
            },
        });
        let request = self
            .client
            .post(&self.upload_url)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .header("X-Upload-Content-Length", total_bytes)
            .header("X-Upload-Content-Type", "video/*")
            .json(&body);
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_raise(|| ErrorKind::Protocol("upload session without Location header".to_string()))?;
        Ok(SessionHandle(location.to_string()))
    }

    async fn send_chunk(
        &self,
        session: &SessionHandle,
        offset: u64,
        bytes: &[u8],
        total_bytes: u64,
    ) -> Result<ChunkAck> {
        let last = (offset + bytes.len() as u64).saturating_sub(1);
        let request = self
            .client
            .put(&session.0)
            .header(CONTENT_LENGTH, bytes.len())
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_RANGE, format!("bytes {offset}-{last}/{total_bytes}"))
            .body(bytes.to_vec());
        let response = self.send(request).await?;
        match response.status() {
            StatusCode::PERMANENT_REDIRECT => {
                let range = response.headers().get(RANGE).and_then(|value| value.to_str().ok());
                Ok(ChunkAck {
                    committed: committed_from_range(range)?,
                })
            },
            StatusCode::OK | StatusCode::CREATED => Ok(ChunkAck { committed: total_bytes }),
            _ => Err(failure(response).await),
        }
    }

    async fn finalize(&self, session: &SessionHandle, total_bytes: u64) -> Result<VideoId> {
        // The final chunk already completed the upload; asking for the
        // status of a finished session returns the created video.
        let request = self
            .client
            .put(&session.0)
            .header(CONTENT_LENGTH, 0)
            .header(CONTENT_RANGE, format!("bytes */{total_bytes}"));
        let response = self.send(request).await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let video: Resource = Self::json(response).await?;
                Ok(VideoId(video.id))
            },
            StatusCode::PERMANENT_REDIRECT => exn::bail!(ErrorKind::Protocol("upload is incomplete".to_string())),
            _ => Err(failure(response).await),
        }
    }

    async fn list_collections(&self, filter: Option<&str>) -> Result<Vec<Collection>> {
        let mut collections = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("part", "snippet"), ("mine", "true"), ("maxResults", PAGE_SIZE)];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let request = self.client.get(format!("{}/playlists", self.api_base)).query(&query);
            let response = self.send(request).await?;
            if !response.status().is_success() {
                return Err(failure(response).await);
            }
            let page: PlaylistPage = Self::json(response).await?;
            collections.extend(
                page.items
                    .into_iter()
                    .filter(|p| filter.is_none_or(|name| p.snippet.title == name))
                    .map(|p| Collection {
                        id: CollectionId(p.id),
                        name: p.snippet.title,
                    }),
            );
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(collections),
            }
        }
    }

    async fn create_collection(&self, name: &str) -> Result<CollectionId> {
        let body = json!({
            "snippet": {
                "title": name,
                "description": format!("Automatically created playlist for {name} videos"),
                "defaultLanguage": self.language,
            },
            "status": { "privacyStatus": "unlisted" },
        });
        let request = self
            .client
            .post(format!("{}/playlists", self.api_base))
            .query(&[("part", "snippet,status")])
            .json(&body);
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        let playlist: Resource = Self::json(response).await?;
        tracing::info!(collection = name, id = %playlist.id, "Created playlist");
        Ok(CollectionId(playlist.id))
    }

    async fn attach_video(&self, collection: &CollectionId, video: &VideoId) -> Result<()> {
        let body = json!({
            "snippet": {
                "playlistId": collection.0,
                "resourceId": { "kind": "youtube#video", "videoId": video.0 },
            },
        });
        let request = self
            .client
            .post(format!("{}/playlistItems", self.api_base))
            .query(&[("part", "snippet")])
            .json(&body);
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        Ok(())
    }
}
