//! JSON views of the catalog for scripts and tooling.

use crate::models::catalog::FolderRef;
use crate::handlers::browse::parse_count;
use crate::services::browse::{filter_by_name, paginate, Page};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

pub async fn list_folders(State(state): State<AppState>) -> Result<Json<Vec<FolderRef>>, AppError> {
    let folders = state.catalog.list_subfolders(&state.root_folder_id).await?;
    Ok(Json(folders.to_vec()))
}

pub async fn list_files(
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
    Query(params): Query<FilesQuery>,
) -> Result<Json<Page>, AppError> {
    let folders = state.catalog.list_subfolders(&state.root_folder_id).await?;
    if !folders.iter().any(|f| f.id == folder_id) {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Folder {} is not browsable",
            folder_id
        )));
    }

    let files = state.catalog.list_audio_files(&folder_id).await?;
    let matching = filter_by_name(&files, &params.q);
    let page_size = params
        .page_size
        .as_deref()
        .and_then(parse_count)
        .unwrap_or_else(|| state.browse.page_size());
    let page_number = params.page.as_deref().and_then(parse_count).unwrap_or(1);
    let page = paginate(&matching, page_size, page_number);

    tracing::debug!(
        folder_id = %folder_id,
        total = page.total,
        page = page.page,
        "Listed files via API"
    );
    Ok(Json(page))
}
