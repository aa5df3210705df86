use axum::{
    body::Body,
    http::Request,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::sync::Arc;
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::{Settings, StoreBackend};
use crate::handlers::{
    api::{list_files, list_folders},
    app::health_check,
    audio::play_audio,
    browse::{browser_page, refresh, select_folder, set_page, set_page_size, set_search},
    metrics::metrics,
};
use crate::services::drive::DriveFileStore;
use crate::services::file_store::{FileStore, StoreError};
use crate::services::local::LocalFileStore;
use crate::AppState;

/// Backend named by `store.backend`.
pub fn build_file_store(settings: &Settings) -> Result<Arc<dyn FileStore>, StoreError> {
    match settings.store.backend {
        StoreBackend::Drive => Ok(Arc::new(DriveFileStore::new(&settings.drive)?)),
        StoreBackend::Local => Ok(Arc::new(LocalFileStore::new(&settings.local))),
    }
}

pub fn build_router(state: AppState, secure_cookies: bool) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)));

    Router::new()
        .route("/", get(browser_page))
        .route("/browse/folder", post(select_folder))
        .route("/browse/search", post(set_search))
        .route("/browse/page-size", post(set_page_size))
        .route("/browse/page", post(set_page))
        .route("/refresh", post(refresh))
        .route("/audio/*file_id", get(play_audio))
        .route("/api/folders", get(list_folders))
        .route("/api/folders/:folder_id/files", get(list_files))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            make_request_span(request)
        }))
        // Outermost so the span and handlers see the request id.
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
