pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use config::BrowseSettings;
use metrics_exporter_prometheus::PrometheusHandle;
use services::CatalogService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    /// Folder whose subfolders are offered for browsing.
    pub root_folder_id: Arc<str>,
    pub title: Arc<str>,
    pub browse: BrowseSettings,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(
        catalog: Arc<CatalogService>,
        root_folder_id: impl Into<Arc<str>>,
        title: impl Into<Arc<str>>,
        browse: BrowseSettings,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            catalog,
            root_folder_id: root_folder_id.into(),
            title: title.into(),
            browse,
            metrics,
        }
    }
}
