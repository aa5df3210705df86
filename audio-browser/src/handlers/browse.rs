use crate::config::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::models::browse::SessionBrowseState;
use crate::models::catalog::FolderRef;
use crate::services::{BrowseSession, Page, ServiceError};
use crate::AppState;
use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use service_core::error::AppError;
use std::sync::Arc;

#[derive(Template)]
#[template(path = "pages/browser.html")]
pub struct BrowserTemplate {
    pub title: String,
    pub folders: Vec<FolderRef>,
    pub selected_folder_id: String,
    pub search_text: String,
    pub page_size: usize,
    pub min_page_size: usize,
    pub max_page_size: usize,
    pub page: Option<Page>,
    pub error: Option<String>,
}

impl BrowserTemplate {
    fn new(state: &AppState) -> Self {
        Self {
            title: state.title.to_string(),
            folders: Vec::new(),
            selected_folder_id: String::new(),
            search_text: String::new(),
            page_size: state.browse.page_size(),
            min_page_size: MIN_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            page: None,
            error: None,
        }
    }

    fn failed(mut self, err: ServiceError) -> Response {
        self.error = Some(err.user_message());
        let status = AppError::from(err).status_code();
        (status, self).into_response()
    }
}

#[derive(Deserialize)]
pub struct FolderForm {
    pub name: String,
}

#[derive(Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct PageSizeForm {
    #[serde(default)]
    pub page_size: String,
}

#[derive(Deserialize)]
pub struct PageForm {
    #[serde(default)]
    pub page: String,
}

/// Count typed into a form or query field. Negative numbers become zero and
/// are clamped by the session; text that is not a number yields `None`.
pub(crate) fn parse_count(raw: &str) -> Option<usize> {
    let n = raw.trim().parse::<i64>().ok()?;
    Some(usize::try_from(n.max(0)).unwrap_or(usize::MAX))
}

fn browse_session(state: &AppState, browse: &SessionBrowseState) -> BrowseSession {
    BrowseSession::new(Arc::clone(&state.catalog), browse.state.clone())
}

/// The browse page, rebuilt from the session's state on every request.
pub async fn browser_page(
    State(state): State<AppState>,
    mut browse: SessionBrowseState,
) -> Result<Response, AppError> {
    let mut template = BrowserTemplate::new(&state);

    let folders = match state.catalog.list_subfolders(&state.root_folder_id).await {
        Ok(folders) => folders,
        Err(e) => {
            tracing::error!(
                folder_id = %state.root_folder_id,
                error = %e,
                "Failed to list folders"
            );
            return Ok(template.failed(e));
        }
    };

    let mut session = browse_session(&state, &browse);
    session.reconcile_folder(&folders);
    template.folders = folders.to_vec();

    let current = session.state();
    template.selected_folder_id = current
        .selected_folder
        .as_ref()
        .map(|f| f.id.clone())
        .unwrap_or_default();
    template.search_text = current.search_text.clone();
    template.page_size = current.page_size;

    let page = session.visible_page().await;

    if browse.state != *session.state() {
        browse.state = session.into_state();
        browse.save().await?;
    }

    match page {
        Ok(page) => {
            template.page = Some(page);
            Ok(template.into_response())
        }
        Err(e) => {
            tracing::error!(
                folder_id = %template.selected_folder_id,
                error = %e,
                "Failed to list audio files"
            );
            Ok(template.failed(e))
        }
    }
}

pub async fn select_folder(
    State(state): State<AppState>,
    mut browse: SessionBrowseState,
    Form(form): Form<FolderForm>,
) -> Result<Redirect, AppError> {
    let folders = state.catalog.list_subfolders(&state.root_folder_id).await?;

    let mut session = browse_session(&state, &browse);
    if !session.select_folder_by_name(&folders, &form.name) {
        tracing::warn!(name = %form.name, "Ignoring unknown folder name");
        return Ok(Redirect::to("/"));
    }

    browse.state = session.into_state();
    browse.save().await?;
    Ok(Redirect::to("/"))
}

pub async fn set_search(
    State(state): State<AppState>,
    mut browse: SessionBrowseState,
    Form(form): Form<SearchForm>,
) -> Result<Redirect, AppError> {
    let mut session = browse_session(&state, &browse);
    session.set_search_text(form.q);

    browse.state = session.into_state();
    browse.save().await?;
    Ok(Redirect::to("/"))
}

pub async fn set_page_size(
    State(state): State<AppState>,
    mut browse: SessionBrowseState,
    Form(form): Form<PageSizeForm>,
) -> Result<Redirect, AppError> {
    let mut session = browse_session(&state, &browse);
    match parse_count(&form.page_size) {
        Some(n) => session.set_page_size(n),
        None => tracing::debug!(input = %form.page_size, "Ignoring unreadable page size"),
    }

    browse.state = session.into_state();
    browse.save().await?;
    Ok(Redirect::to("/"))
}

pub async fn set_page(
    State(state): State<AppState>,
    mut browse: SessionBrowseState,
    Form(form): Form<PageForm>,
) -> Result<Redirect, AppError> {
    let mut session = browse_session(&state, &browse);
    match parse_count(&form.page) {
        Some(n) => session.set_page_number(n),
        None => tracing::debug!(input = %form.page, "Ignoring unreadable page number"),
    }

    browse.state = session.into_state();
    browse.save().await?;
    Ok(Redirect::to("/"))
}

/// Drop every cached listing and file so the next render re-fetches.
pub async fn refresh(State(state): State<AppState>) -> Redirect {
    state.catalog.invalidate_all();
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("25"), Some(25));
        assert_eq!(parse_count(" 7 "), Some(7));
        assert_eq!(parse_count("-5"), Some(0));
        assert_eq!(parse_count("ten"), None);
        assert_eq!(parse_count(""), None);
    }
}
