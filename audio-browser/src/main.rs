use audio_browser::config::get_configuration;
use audio_browser::services::CatalogService;
use audio_browser::startup::{build_file_store, build_router};
use audio_browser::AppState;
use dotenvy::dotenv;
use service_core::observability::{init_tracing, install_prometheus_recorder};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    if let Err(e) = configuration.ensure_complete() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    init_tracing(
        "audio-browser",
        &configuration.logging.level,
        configuration.logging.otlp_endpoint.as_deref(),
    )?;

    let metrics_handle = install_prometheus_recorder()?;

    let store = build_file_store(&configuration).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialise file store");
        anyhow::anyhow!("File store error: {}", e)
    })?;
    let catalog = Arc::new(CatalogService::new(store, &configuration.cache));

    let state = AppState::new(
        catalog,
        configuration.store.root_folder_id.clone(),
        configuration.application.title.clone(),
        configuration.browse.clone(),
        metrics_handle,
    );
    let app = build_router(state, configuration.server.secure_cookies);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!(
        backend = ?configuration.store.backend,
        root_folder_id = %configuration.store.root_folder_id,
        "Starting audio-browser on {}",
        address
    );
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}
