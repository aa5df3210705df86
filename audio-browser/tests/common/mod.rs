//! Shared setup for audio-browser integration tests: an in-memory file store
//! and a router wired to it.

#![allow(dead_code)]

use async_trait::async_trait;
use audio_browser::config::{BrowseSettings, CacheSettings};
use audio_browser::services::file_store::{
    ChildFilter, ChunkReader, DownloadChunk, FileStore, RemoteEntry, StoreError,
};
use audio_browser::services::CatalogService;
use audio_browser::startup::build_router;
use audio_browser::AppState;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use service_core::observability::detached_prometheus_handle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const ROOT_ID: &str = "root";
pub const DRUMS_ID: &str = "f-drums";
pub const VOX_ID: &str = "f-vox";
pub const KICK_BYTES: &[u8] = b"RIFF0000WAVEkick-sample-data";

fn entry(id: &str, name: &str, mime: Option<&str>, size: Option<u64>) -> RemoteEntry {
    RemoteEntry {
        id: id.to_string(),
        name: name.to_string(),
        mime_type: mime.map(str::to_string),
        size,
    }
}

/// In-memory store: a root with two folders, `Drums` (a few files) and `Vox`
/// (25 takes).
pub struct MockStore {
    children: Mutex<HashMap<String, Vec<RemoteEntry>>>,
    contents: HashMap<String, Vec<u8>>,
    pub list_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl MockStore {
    pub fn new() -> Self {
        let mut children = HashMap::new();
        children.insert(
            ROOT_ID.to_string(),
            vec![
                entry(DRUMS_ID, "Drums", Some("application/vnd.google-apps.folder"), None),
                entry(VOX_ID, "Vox", Some("application/vnd.google-apps.folder"), None),
            ],
        );
        children.insert(
            DRUMS_ID.to_string(),
            vec![
                entry("kick", "kick.wav", Some("audio/wav"), Some(KICK_BYTES.len() as u64)),
                entry("notes", "notes.txt", Some("text/plain"), Some(5)),
                entry("snare", "Snare.WAVE", None, None),
            ],
        );
        children.insert(
            VOX_ID.to_string(),
            (0..25)
                .map(|i| {
                    entry(
                        &format!("take-{:02}", i),
                        &format!("Vocal_Take{:02}.wav", i),
                        Some("audio/x-wav"),
                        Some(1024),
                    )
                })
                .collect(),
        );

        let mut contents = HashMap::new();
        contents.insert("kick".to_string(), KICK_BYTES.to_vec());
        contents.insert("snare".to_string(), b"RIFFsnare".to_vec());

        Self {
            children: Mutex::new(children),
            contents,
            list_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Replace the listing of `parent_id`.
    pub fn set_children(&self, parent_id: &str, entries: Vec<RemoteEntry>) {
        self.children
            .lock()
            .unwrap()
            .insert(parent_id.to_string(), entries);
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

struct MockReader {
    chunks: Vec<Bytes>,
}

#[async_trait]
impl ChunkReader for MockReader {
    async fn next_chunk(&mut self) -> Result<DownloadChunk, StoreError> {
        let data = if self.chunks.is_empty() {
            Bytes::new()
        } else {
            self.chunks.remove(0)
        };
        Ok(DownloadChunk {
            data,
            done: self.chunks.is_empty(),
        })
    }
}

#[async_trait]
impl FileStore for MockStore {
    async fn list_children(
        &self,
        parent_id: &str,
        filter: ChildFilter,
    ) -> Result<Vec<RemoteEntry>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Forbidden("folder not shared".to_string()));
        }

        let children = self.children.lock().unwrap();
        let entries = children
            .get(parent_id)
            .ok_or_else(|| StoreError::NotFound(parent_id.to_string()))?;

        Ok(entries
            .iter()
            .filter(|e| {
                !filter.folders_only
                    || e.mime_type.as_deref() == Some("application/vnd.google-apps.folder")
            })
            .cloned()
            .collect())
    }

    async fn open_download(&self, file_id: &str) -> Result<Box<dyn ChunkReader>, StoreError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let data = self
            .contents
            .get(file_id)
            .ok_or_else(|| StoreError::NotFound(file_id.to_string()))?;

        let chunks = data.chunks(8).map(Bytes::copy_from_slice).collect();
        Ok(Box::new(MockReader { chunks }))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MockStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MockStore::new());
        let catalog = Arc::new(CatalogService::new(store.clone(), &CacheSettings::default()));
        let state = AppState::new(
            catalog,
            ROOT_ID,
            "Sample Library",
            BrowseSettings::default(),
            detached_prometheus_handle(),
        );

        Self {
            router: build_router(state, false),
            store,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }
}

/// `name=value` part of the response's session cookie, if one was set.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_string())
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_string(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
