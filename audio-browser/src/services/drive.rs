//! Google Drive v3 REST backend.

use crate::config::DriveSettings;
use crate::services::credentials::{Credentials, TokenProvider};
use crate::services::file_store::{
    ChildFilter, ChunkReader, DownloadChunk, FileStore, RemoteEntry, StoreError,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const LIST_FIELDS: &str = "files(id,name,mimeType,size)";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ErrorReason {
    #[serde(default)]
    reason: String,
}

#[derive(Clone)]
pub struct DriveFileStore {
    client: Client,
    tokens: Arc<TokenProvider>,
    api_base_url: String,
    list_page_size: u32,
    chunk_bytes: u64,
}

impl DriveFileStore {
    pub fn new(settings: &DriveSettings) -> Result<Self, StoreError> {
        let credentials = Credentials::from_settings(settings)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self::with_client(client, credentials, settings))
    }

    pub fn with_client(client: Client, credentials: Credentials, settings: &DriveSettings) -> Self {
        Self {
            tokens: Arc::new(TokenProvider::new(client.clone(), credentials)),
            client,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            list_page_size: settings.list_page_size.clamp(1, 1000),
            chunk_bytes: settings.download_chunk_bytes.max(1),
        }
    }
}

#[async_trait]
impl FileStore for DriveFileStore {
    async fn list_children(
        &self,
        parent_id: &str,
        filter: ChildFilter,
    ) -> Result<Vec<RemoteEntry>, StoreError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/files", self.api_base_url);
        let query = children_query(parent_id, filter);
        let page_size = self.list_page_size.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
                ("orderBy", "name"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;

        let response = check_status(response, parent_id).await?;
        let body = response.text().await?;
        let list: FileList = serde_json::from_str(&body)
            .map_err(|e| StoreError::InvalidResponse(format!("file list: {}", e)))?;

        tracing::debug!(
            parent_id = %parent_id,
            folders_only = filter.folders_only,
            count = list.files.len(),
            "Drive listing"
        );
        Ok(list.files)
    }

    async fn open_download(&self, file_id: &str) -> Result<Box<dyn ChunkReader>, StoreError> {
        let url = format!("{}/files/{}", self.api_base_url, file_id);

        Ok(Box::new(DriveChunkReader {
            client: self.client.clone(),
            url,
            tokens: self.tokens.clone(),
            file_id: file_id.to_string(),
            chunk_bytes: self.chunk_bytes,
            offset: 0,
            total: None,
        }))
    }
}

/// Fetches a file in `Range` requests of at most `chunk_bytes`.
///
/// The access token is looked up per request so a long download outlives the
/// token it started with.
pub struct DriveChunkReader {
    client: Client,
    url: String,
    tokens: Arc<TokenProvider>,
    file_id: String,
    chunk_bytes: u64,
    offset: u64,
    total: Option<u64>,
}

#[async_trait]
impl ChunkReader for DriveChunkReader {
    async fn next_chunk(&mut self) -> Result<DownloadChunk, StoreError> {
        let end = self.offset + self.chunk_bytes - 1;
        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .header(header::RANGE, format!("bytes={}-{}", self.offset, end))
            .send()
            .await?;

        match response.status() {
            // Whole file in one response; the server ignored the range.
            StatusCode::OK => {
                let data = response.bytes().await?;
                self.offset += data.len() as u64;
                Ok(DownloadChunk { data, done: true })
            }
            StatusCode::PARTIAL_CONTENT => {
                let content_range = response
                    .headers()
                    .get(header::CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let data = response.bytes().await?;

                if let Some(total) = content_range.as_deref().and_then(parse_content_range_total)
                {
                    self.total = Some(total);
                }

                // Every partial response short of the total must advance the offset.
                if data.is_empty() && self.total.is_some_and(|total| self.offset < total) {
                    tracing::warn!(
                        file_id = %self.file_id,
                        offset = self.offset,
                        total = ?self.total,
                        "Drive returned an empty partial response"
                    );
                    return Err(StoreError::InvalidResponse(
                        "download made no progress".to_string(),
                    ));
                }
                self.offset += data.len() as u64;

                let done = match self.total {
                    Some(total) => self.offset >= total,
                    None => (data.len() as u64) < self.chunk_bytes,
                };
                Ok(DownloadChunk { data, done })
            }
            // Empty files cannot satisfy any range.
            StatusCode::RANGE_NOT_SATISFIABLE if self.offset == 0 => Ok(DownloadChunk {
                data: Bytes::new(),
                done: true,
            }),
            _ => Err(error_from_response(response, &self.file_id).await),
        }
    }
}

/// Drive search expression for the children of `parent_id`.
pub fn children_query(parent_id: &str, filter: ChildFilter) -> String {
    let mut query = format!("'{}' in parents", escape_query_value(parent_id));
    if filter.folders_only {
        query.push_str(&format!(" and mimeType = '{}'", FOLDER_MIME_TYPE));
    }
    if filter.exclude_trashed {
        query.push_str(" and trashed = false");
    }
    query
}

fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Total length from `Content-Range: bytes 0-99/1234`. `None` when unknown.
pub fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.trim().strip_prefix("bytes ")?.rsplit_once('/')?;
    total.trim().parse().ok()
}

async fn check_status(response: Response, subject: &str) -> Result<Response, StoreError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response, subject).await)
    }
}

async fn error_from_response(response: Response, subject: &str) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let (message, reasons) = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => (
            envelope.error.message,
            envelope
                .error
                .errors
                .into_iter()
                .map(|e| e.reason)
                .collect::<Vec<_>>(),
        ),
        Err(_) => (body, Vec::new()),
    };

    tracing::warn!(
        status = %status,
        subject = %subject,
        message = %message,
        "Drive request failed"
    );

    map_status(status, subject, message, &reasons)
}

fn map_status(status: StatusCode, subject: &str, message: String, reasons: &[String]) -> StoreError {
    let rate_limited = reasons
        .iter()
        .any(|r| r == "rateLimitExceeded" || r == "userRateLimitExceeded");

    match status {
        StatusCode::UNAUTHORIZED => StoreError::Unauthorized(message),
        StatusCode::FORBIDDEN if rate_limited => StoreError::RateLimited(message),
        StatusCode::FORBIDDEN => StoreError::Forbidden(message),
        StatusCode::NOT_FOUND => StoreError::NotFound(subject.to_string()),
        StatusCode::TOO_MANY_REQUESTS => StoreError::RateLimited(message),
        other => StoreError::Api {
            status: other.as_u16(),
            message,
        },
    }
}
