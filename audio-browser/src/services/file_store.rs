//! Contract for the remote file store the catalog reads from.
//!
//! Implementations: [`crate::services::drive::DriveFileStore`] (Google Drive
//! REST API) and [`crate::services::local::LocalFileStore`] (a directory on
//! disk).

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("credentials rejected: {0}")]
    Unauthorized(String),

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("file store returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("credential error: {0}")]
    Credentials(String),
}

/// Which children of a folder to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildFilter {
    pub folders_only: bool,
    pub exclude_trashed: bool,
}

impl ChildFilter {
    pub const FOLDERS: ChildFilter = ChildFilter {
        folders_only: true,
        exclude_trashed: true,
    };

    pub const ALL: ChildFilter = ChildFilter {
        folders_only: false,
        exclude_trashed: true,
    };
}

/// One child entry as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
}

/// Drive reports `size` as a decimal string; accept numbers too.
fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Text(String),
        Number(u64),
    }

    match Option::<Size>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Size::Number(n)) => Ok(Some(n)),
        Some(Size::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// One piece of a chunked download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadChunk {
    pub data: Bytes,
    /// True on the final chunk.
    pub done: bool,
}

/// A download in progress. Call [`ChunkReader::next_chunk`] until a chunk
/// reports `done`.
#[async_trait]
pub trait ChunkReader: Send {
    async fn next_chunk(&mut self) -> Result<DownloadChunk, StoreError>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Immediate children of `parent_id`, ordered by name, at most one page.
    async fn list_children(
        &self,
        parent_id: &str,
        filter: ChildFilter,
    ) -> Result<Vec<RemoteEntry>, StoreError>;

    async fn open_download(&self, file_id: &str) -> Result<Box<dyn ChunkReader>, StoreError>;
}
