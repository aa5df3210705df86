use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Range not satisfiable: {0}")]
    RangeNotSatisfiable(String, u64),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RangeNotSatisfiable(_, _) => StatusCode::RANGE_NOT_SATISFIABLE,
            AppError::TooManyRequests(_, _) => StatusCode::TOO_MANY_REQUESTS,
            AppError::InternalError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let status = self.status_code();
        let mut retry_after = None;
        let mut content_range = None;

        let (error_message, details) = match self {
            AppError::NotFound(err) => (err.to_string(), None),
            AppError::RangeNotSatisfiable(msg, length) => {
                content_range = Some(format!("bytes */{}", length));
                (msg, None)
            }
            AppError::TooManyRequests(msg, retry) => {
                retry_after = retry;
                (msg, None)
            }
            AppError::InternalError(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("Internal server error".to_string(), None)
            }
            AppError::BadGateway(msg) => (format!("Bad Gateway: {}", msg), None),
            AppError::ConfigError(err) => {
                ("Configuration error".to_string(), Some(err.to_string()))
            }
        };

        let mut res = (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }
        if let Some(value) = content_range.and_then(|v| v.parse().ok()) {
            res.headers_mut()
                .insert(axum::http::header::CONTENT_RANGE, value);
        }

        res
    }
}
