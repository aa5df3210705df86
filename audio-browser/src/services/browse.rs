//! Folder selection, name search and pagination over the catalog.

use crate::models::browse::{clamp_page_size, BrowseState};
use crate::models::catalog::{FileRef, FolderRef};
use crate::services::catalog::CatalogService;
use crate::services::error::ServiceError;
use serde::Serialize;
use std::ops::Range;
use std::sync::Arc;

/// One rendered page of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub files: Vec<FileRef>,
    /// Files matching the search, across all pages.
    pub total: usize,
    /// Page actually shown, after clamping.
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
}

impl Page {
    /// 1-based position of the first file on this page.
    pub fn first_index(&self) -> usize {
        (self.page - 1) * self.page_size + 1
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count
    }
}

pub struct BrowseSession {
    catalog: Arc<CatalogService>,
    state: BrowseState,
}

impl BrowseSession {
    pub fn new(catalog: Arc<CatalogService>, state: BrowseState) -> Self {
        Self { catalog, state }
    }

    pub fn state(&self) -> &BrowseState {
        &self.state
    }

    pub fn into_state(self) -> BrowseState {
        self.state
    }

    pub fn select_folder(&mut self, folder: FolderRef) {
        self.state.selected_folder = Some(folder);
        self.state.page_number = 1;
    }

    /// Select the first folder called `name`. Unknown names leave the state
    /// untouched and return false.
    pub fn select_folder_by_name(&mut self, folders: &[FolderRef], name: &str) -> bool {
        match resolve_folder(folders, name) {
            Some(folder) => {
                self.select_folder(folder.clone());
                true
            }
            None => false,
        }
    }

    /// Keep the selection in step with a fresh folder listing: fall back to
    /// the first folder when nothing valid is selected.
    pub fn reconcile_folder(&mut self, folders: &[FolderRef]) {
        let still_listed = self
            .state
            .selected_folder
            .as_ref()
            .map(|selected| folders.iter().any(|f| f.id == selected.id))
            .unwrap_or(false);

        if still_listed {
            return;
        }

        match folders.first() {
            Some(first) => self.select_folder(first.clone()),
            None => {
                self.state.selected_folder = None;
                self.state.page_number = 1;
            }
        }
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.state.search_text = text.into();
        self.state.page_number = 1;
    }

    pub fn set_page_size(&mut self, n: usize) {
        self.state.page_size = clamp_page_size(n);
        self.state.page_number = 1;
    }

    /// Requested page; the upper bound is applied when the page is built.
    pub fn set_page_number(&mut self, n: usize) {
        self.state.page_number = n.max(1);
    }

    /// Files of the selected folder matching the search text.
    pub async fn matching_files(&self) -> Result<Vec<FileRef>, ServiceError> {
        let Some(folder) = &self.state.selected_folder else {
            return Ok(Vec::new());
        };

        let files = self.catalog.list_audio_files(&folder.id).await?;
        Ok(filter_by_name(&files, &self.state.search_text))
    }

    pub async fn visible_page(&self) -> Result<Page, ServiceError> {
        let matching = self.matching_files().await?;
        Ok(paginate(&matching, self.state.page_size, self.state.page_number))
    }

    pub async fn page_count(&self) -> Result<usize, ServiceError> {
        let matching = self.matching_files().await?;
        Ok(page_count(matching.len(), self.state.page_size))
    }
}

/// First folder whose name equals `name`.
pub fn resolve_folder<'a>(folders: &'a [FolderRef], name: &str) -> Option<&'a FolderRef> {
    folders.iter().find(|f| f.name == name)
}

/// Case-insensitive substring match on the full file name.
///
/// Blank search text (empty or whitespace only) matches everything.
pub fn filter_by_name(files: &[FileRef], search_text: &str) -> Vec<FileRef> {
    if search_text.trim().is_empty() {
        return files.to_vec();
    }

    let needle = search_text.to_lowercase();
    files
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Number of pages, never less than one.
pub fn page_count(total: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total.div_ceil(page_size).max(1)
}

/// Index range of `page` (clamped into `[1, page_count]`).
pub fn page_bounds(total: usize, page_size: usize, page: usize) -> Range<usize> {
    let page_size = page_size.max(1);
    let page = page.clamp(1, page_count(total, page_size));
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total);
    start.min(total)..end
}

pub fn paginate(files: &[FileRef], page_size: usize, page: usize) -> Page {
    let total = files.len();
    let page_size = clamp_page_size(page_size);
    let page_count = page_count(total, page_size);
    let page = page.clamp(1, page_count);
    let bounds = page_bounds(total, page_size, page);

    Page {
        files: files[bounds].to_vec(),
        total,
        page,
        page_size,
        page_count,
    }
}
