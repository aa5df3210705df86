//! Cached view of the file store: folders, audio files and file contents.

use crate::config::CacheSettings;
use crate::models::catalog::{FileRef, FolderRef};
use crate::services::cache::{Clock, SystemClock, TtlCache};
use crate::services::error::ServiceError;
use crate::services::file_store::{ChildFilter, FileStore, RemoteEntry, StoreError};
use bytes::{Bytes, BytesMut};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

pub struct CatalogService {
    store: Arc<dyn FileStore>,
    folders: TtlCache<String, Arc<[FolderRef]>>,
    files: TtlCache<String, Arc<[FileRef]>>,
    content: TtlCache<String, Bytes>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn FileStore>, settings: &CacheSettings) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn FileStore>,
        settings: &CacheSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let listing_ttl = Duration::from_secs(settings.listing_ttl_secs);
        let content_ttl = Duration::from_secs(settings.content_ttl_secs);

        Self {
            store,
            folders: TtlCache::new("folders", listing_ttl, clock.clone()),
            files: TtlCache::new("files", listing_ttl, clock.clone()),
            content: TtlCache::new("content", content_ttl, clock),
        }
    }

    /// Non-trashed folders directly under `root_folder_id`, ordered by name.
    pub async fn list_subfolders(
        &self,
        root_folder_id: &str,
    ) -> Result<Arc<[FolderRef]>, ServiceError> {
        self.folders
            .get_or_try_insert_with(root_folder_id.to_string(), || async {
                let entries = self
                    .store
                    .list_children(root_folder_id, ChildFilter::FOLDERS)
                    .await
                    .map_err(|e| store_failure("list_subfolders", root_folder_id, e))?;

                let folders: Arc<[FolderRef]> = entries.into_iter().map(FolderRef::from).collect();
                tracing::debug!(
                    folder_id = %root_folder_id,
                    count = folders.len(),
                    "Listed subfolders"
                );
                Ok(folders)
            })
            .await
    }

    /// Audio files directly under `folder_id`, ordered by name.
    ///
    /// The store lists every non-trashed child; only names ending in `.wav`
    /// or `.wave` (any case) are kept.
    pub async fn list_audio_files(&self, folder_id: &str) -> Result<Arc<[FileRef]>, ServiceError> {
        self.files
            .get_or_try_insert_with(folder_id.to_string(), || async {
                let entries = self
                    .store
                    .list_children(folder_id, ChildFilter::ALL)
                    .await
                    .map_err(|e| store_failure("list_audio_files", folder_id, e))?;

                let listed = entries.len();
                let files: Arc<[FileRef]> = entries
                    .into_iter()
                    .map(FileRef::from)
                    .filter(FileRef::is_audio)
                    .collect();
                tracing::debug!(
                    folder_id = %folder_id,
                    listed,
                    count = files.len(),
                    "Listed audio files"
                );
                Ok(files)
            })
            .await
    }

    /// Full contents of `file_id`, assembled from the store's chunks in order.
    pub async fn fetch_bytes(&self, file_id: &str) -> Result<Bytes, ServiceError> {
        self.content
            .get_or_try_insert_with(file_id.to_string(), || async {
                self.download(file_id)
                    .await
                    .map_err(|e| store_failure("fetch_bytes", file_id, e))
            })
            .await
    }

    async fn download(&self, file_id: &str) -> Result<Bytes, StoreError> {
        let mut reader = self.store.open_download(file_id).await?;
        let mut buffer = BytesMut::new();
        let mut chunks = 0usize;

        loop {
            let chunk = reader.next_chunk().await?;
            buffer.extend_from_slice(&chunk.data);
            chunks += 1;
            if chunk.done {
                break;
            }
        }

        tracing::info!(
            file_id = %file_id,
            size = buffer.len(),
            chunks,
            "Downloaded file"
        );
        Ok(buffer.freeze())
    }

    /// Drop every cached listing and payload.
    pub fn invalidate_all(&self) {
        self.folders.clear();
        self.files.clear();
        self.content.clear();
        tracing::info!("Catalog caches cleared");
    }
}

fn store_failure(operation: &'static str, id: &str, error: StoreError) -> ServiceError {
    counter!("file_store_errors_total", "operation" => operation).increment(1);
    tracing::error!(operation, id = %id, error = %error, "File store call failed");
    ServiceError::Collaborator(error)
}

impl From<RemoteEntry> for FolderRef {
    fn from(entry: RemoteEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
        }
    }
}

impl From<RemoteEntry> for FileRef {
    fn from(entry: RemoteEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            mime_type: entry.mime_type,
            size: entry.size,
        }
    }
}
