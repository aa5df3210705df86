//! Directory-on-disk backend, for running without Drive access.
//!
//! Ids are paths relative to `base_path` using `/` separators; `.` is the base
//! directory itself.

use crate::config::LocalSettings;
use crate::models::catalog::{is_audio_name, DEFAULT_AUDIO_MIME};
use crate::services::drive::FOLDER_MIME_TYPE;
use crate::services::file_store::{
    ChildFilter, ChunkReader, DownloadChunk, FileStore, RemoteEntry, StoreError,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

pub struct LocalFileStore {
    base_path: PathBuf,
    chunk_bytes: usize,
}

impl LocalFileStore {
    pub fn new(settings: &LocalSettings) -> Self {
        Self {
            base_path: settings.base_path.clone(),
            chunk_bytes: settings.read_chunk_bytes.max(1),
        }
    }

    fn resolve(&self, id: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(id);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(self.base_path.join(relative))
    }
}

fn child_id(parent_id: &str, name: &str) -> String {
    let parent = parent_id.trim_matches('/');
    if parent.is_empty() || parent == "." {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn not_found_or_io(id: &str, err: std::io::Error) -> StoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound(id.to_string())
    } else {
        StoreError::Io(err)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn list_children(
        &self,
        parent_id: &str,
        filter: ChildFilter,
    ) -> Result<Vec<RemoteEntry>, StoreError> {
        let dir = self.resolve(parent_id)?;
        let mut reader = fs::read_dir(&dir)
            .await
            .map_err(|e| not_found_or_io(parent_id, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            let file_type = entry.file_type().await?;
            if filter.folders_only && !file_type.is_dir() {
                continue;
            }

            let (mime_type, size) = if file_type.is_dir() {
                (Some(FOLDER_MIME_TYPE.to_string()), None)
            } else {
                let mime = is_audio_name(&name).then(|| DEFAULT_AUDIO_MIME.to_string());
                (mime, Some(entry.metadata().await?.len()))
            };

            entries.push(RemoteEntry {
                id: child_id(parent_id, &name),
                name,
                mime_type,
                size,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn open_download(&self, file_id: &str) -> Result<Box<dyn ChunkReader>, StoreError> {
        let path = self.resolve(file_id)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or_io(file_id, e))?;
        let metadata = file.metadata().await?;
        if metadata.is_dir() {
            return Err(StoreError::NotFound(file_id.to_string()));
        }

        Ok(Box::new(LocalChunkReader {
            file,
            remaining: metadata.len(),
            chunk_bytes: self.chunk_bytes,
        }))
    }
}

struct LocalChunkReader {
    file: fs::File,
    remaining: u64,
    chunk_bytes: usize,
}

#[async_trait]
impl ChunkReader for LocalChunkReader {
    async fn next_chunk(&mut self) -> Result<DownloadChunk, StoreError> {
        let want = self.remaining.min(self.chunk_bytes as u64);
        let mut buffer = Vec::with_capacity(want as usize);
        (&mut self.file).take(want).read_to_end(&mut buffer).await?;

        self.remaining = self.remaining.saturating_sub(buffer.len() as u64);
        let done = self.remaining == 0 || (buffer.len() as u64) < want;

        Ok(DownloadChunk {
            data: Bytes::from(buffer),
            done,
        })
    }
}
