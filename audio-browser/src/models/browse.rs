use crate::config::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::models::catalog::FolderRef;
use crate::AppState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use tower_sessions::Session;

/// Session key under which the browse state is stored.
pub const BROWSE_STATE_KEY: &str = "browse_state";

/// What the visitor has picked: folder, search text and paging.
///
/// The visible file list is never stored here; it is derived on every render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseState {
    pub selected_folder: Option<FolderRef>,
    pub search_text: String,
    pub page_size: usize,
    pub page_number: usize,
}

impl BrowseState {
    pub fn new(page_size: usize) -> Self {
        Self {
            selected_folder: None,
            search_text: String::new(),
            page_size: clamp_page_size(page_size),
            page_number: 1,
        }
    }
}

impl Default for BrowseState {
    fn default() -> Self {
        Self::new(50)
    }
}

pub fn clamp_page_size(n: usize) -> usize {
    n.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

/// Browse state bound to the visitor's session.
///
/// Handlers mutate `state` and call [`SessionBrowseState::save`].
pub struct SessionBrowseState {
    session: Session,
    pub state: BrowseState,
}

impl SessionBrowseState {
    pub async fn save(&self) -> Result<(), AppError> {
        self.session
            .insert(BROWSE_STATE_KEY, &self.state)
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to save session: {}", e)))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionBrowseState
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to extract session",
                )
                    .into_response()
            })?;

        let stored: Option<BrowseState> = session.get(BROWSE_STATE_KEY).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable browse state");
            None
        });

        let state = match stored {
            Some(mut stored) => {
                stored.page_size = clamp_page_size(stored.page_size);
                stored.page_number = stored.page_number.max(1);
                stored
            }
            None => {
                let app = AppState::from_ref(state);
                BrowseState::new(app.browse.page_size())
            }
        };

        Ok(Self { session, state })
    }
}
