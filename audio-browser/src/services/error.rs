use crate::services::file_store::StoreError;
use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Required setting missing or invalid. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The remote file store call failed. Never retried.
    #[error("File store error: {0}")]
    Collaborator(#[from] StoreError),
}

impl ServiceError {
    /// Message safe to show to the person using the browser.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Configuration(msg) => format!("Configuration problem: {}", msg),
            ServiceError::Collaborator(StoreError::Unauthorized(_)) => {
                "The file store rejected our credentials.".to_string()
            }
            ServiceError::Collaborator(StoreError::Forbidden(_)) => {
                "Access denied. Is the folder shared with the service account?".to_string()
            }
            ServiceError::Collaborator(StoreError::NotFound(_)) => {
                "Folder or file not found (or not shared with the service account).".to_string()
            }
            ServiceError::Collaborator(StoreError::RateLimited(_)) => {
                "The file store is rate limiting requests. Try again shortly.".to_string()
            }
            ServiceError::Collaborator(e) => format!("Could not reach the file store: {}", e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Configuration(e) => AppError::ConfigError(anyhow::anyhow!(e)),
            ServiceError::Collaborator(StoreError::NotFound(e)) => {
                AppError::NotFound(anyhow::anyhow!(e))
            }
            ServiceError::Collaborator(StoreError::RateLimited(e)) => {
                AppError::TooManyRequests(e, None)
            }
            ServiceError::Collaborator(e) => AppError::BadGateway(e.to_string()),
        }
    }
}
