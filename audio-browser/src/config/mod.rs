use crate::services::error::ServiceError;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::error::AppError;
use std::path::PathBuf;
use validator::Validate;

pub const MIN_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Deserialize, Clone, Debug, Validate)]
pub struct Settings {
    #[serde(default)]
    pub application: ApplicationSettings,
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[validate(nested)]
    pub store: StoreSettings,
    #[serde(default)]
    pub drive: DriveSettings,
    #[serde(default)]
    pub local: LocalSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub browse: BrowseSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    /// Heading shown on the browse page.
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    "Audio Browser".to_string()
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// OTLP/gRPC collector endpoint, e.g. `http://tempo:4317`.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Drive,
    Local,
}

#[derive(Deserialize, Clone, Debug, Validate)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Folder whose immediate subfolders are offered for browsing.
    #[serde(default)]
    #[validate(length(min = 1, message = "store.root_folder_id must be set"))]
    pub root_folder_id: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DriveSettings {
    #[serde(default = "default_drive_api_base_url")]
    pub api_base_url: String,
    /// Inline service-account key JSON.
    #[serde(default)]
    pub credentials_json: Option<Secret<String>>,
    /// Path to a service-account key file.
    #[serde(default)]
    pub credentials_path: Option<String>,
    /// Pre-issued bearer token; skips the service-account exchange.
    #[serde(default)]
    pub access_token: Option<Secret<String>>,
    #[serde(default = "default_list_page_size")]
    pub list_page_size: u32,
    #[serde(default = "default_download_chunk_bytes")]
    pub download_chunk_bytes: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_drive_api_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_list_page_size() -> u32 {
    1000
}

fn default_download_chunk_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_drive_api_base_url(),
            credentials_json: None,
            credentials_path: None,
            access_token: None,
            list_page_size: default_list_page_size(),
            download_chunk_bytes: default_download_chunk_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl DriveSettings {
    /// True when at least one form of credential material is configured.
    pub fn has_credentials(&self) -> bool {
        let non_empty = |s: &Option<Secret<String>>| {
            s.as_ref()
                .map(|v| !v.expose_secret().trim().is_empty())
                .unwrap_or(false)
        };

        non_empty(&self.credentials_json)
            || non_empty(&self.access_token)
            || self
                .credentials_path
                .as_ref()
                .map(|p| !p.trim().is_empty())
                .unwrap_or(false)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct LocalSettings {
    #[serde(default = "default_local_base_path")]
    pub base_path: PathBuf,
    #[serde(default = "default_local_chunk_bytes")]
    pub read_chunk_bytes: usize,
}

fn default_local_base_path() -> PathBuf {
    PathBuf::from("data/audio")
}

fn default_local_chunk_bytes() -> usize {
    1024 * 1024
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            base_path: default_local_base_path(),
            read_chunk_bytes: default_local_chunk_bytes(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct CacheSettings {
    #[serde(default = "default_listing_ttl")]
    pub listing_ttl_secs: u64,
    #[serde(default = "default_content_ttl")]
    pub content_ttl_secs: u64,
}

fn default_listing_ttl() -> u64 {
    60
}

fn default_content_ttl() -> u64 {
    3600
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            listing_ttl_secs: default_listing_ttl(),
            content_ttl_secs: default_content_ttl(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct BrowseSettings {
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

fn default_page_size() -> usize {
    50
}

impl Default for BrowseSettings {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

impl BrowseSettings {
    pub fn page_size(&self) -> usize {
        self.default_page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

impl Settings {
    /// Check the settings the service cannot start without.
    pub fn ensure_complete(&self) -> Result<(), ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;

        if self.store.root_folder_id.trim().is_empty() {
            return Err(ServiceError::Configuration(
                "store.root_folder_id must be set".to_string(),
            ));
        }

        if self.store.backend == StoreBackend::Drive && !self.drive.has_credentials() {
            return Err(ServiceError::Configuration(
                "Drive credentials missing: set drive.credentials_json, drive.credentials_path \
                 or drive.access_token"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let base_path = std::env::current_dir().map_err(anyhow::Error::from)?;
    let configuration_directory =
        service_core::config::configuration_directory(&base_path, "audio-browser");

    service_core::config::load(&configuration_directory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(backend: StoreBackend, root: &str) -> Settings {
        Settings {
            application: ApplicationSettings::default(),
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
                secure_cookies: false,
            },
            logging: LoggingSettings::default(),
            store: StoreSettings {
                backend,
                root_folder_id: root.to_string(),
            },
            drive: DriveSettings::default(),
            local: LocalSettings::default(),
            cache: CacheSettings::default(),
            browse: BrowseSettings::default(),
        }
    }

    #[test]
    fn test_missing_root_folder_is_configuration_error() {
        let mut s = settings(StoreBackend::Drive, "");
        s.drive.access_token = Some(Secret::new("token".to_string()));

        let err = s.ensure_complete().unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
        assert!(err.to_string().contains("root_folder_id"));
    }

    #[test]
    fn test_blank_root_folder_is_configuration_error() {
        let mut s = settings(StoreBackend::Drive, "   ");
        s.drive.access_token = Some(Secret::new("token".to_string()));
        assert!(s.ensure_complete().is_err());
    }

    #[test]
    fn test_drive_without_credentials_is_configuration_error() {
        let s = settings(StoreBackend::Drive, "root123");

        let err = s.ensure_complete().unwrap_err();
        assert!(err.to_string().contains("credentials"));
    }

    #[test]
    fn test_drive_with_credentials_path_is_complete() {
        let mut s = settings(StoreBackend::Drive, "root123");
        s.drive.credentials_path = Some("/etc/audio-browser/key.json".to_string());
        assert!(s.ensure_complete().is_ok());
    }

    #[test]
    fn test_blank_access_token_does_not_count() {
        let mut s = settings(StoreBackend::Drive, "root123");
        s.drive.access_token = Some(Secret::new("  ".to_string()));
        assert!(!s.drive.has_credentials());
    }

    #[test]
    fn test_local_backend_needs_no_credentials() {
        let s = settings(StoreBackend::Local, ".");
        assert!(s.ensure_complete().is_ok());
    }

    #[test]
    fn test_default_page_size_is_clamped() {
        let browse = BrowseSettings {
            default_page_size: 5,
        };
        assert_eq!(browse.page_size(), MIN_PAGE_SIZE);

        let browse = BrowseSettings {
            default_page_size: 1000,
        };
        assert_eq!(browse.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_cache_defaults() {
        let cache = CacheSettings::default();
        assert_eq!(cache.listing_ttl_secs, 60);
        assert_eq!(cache.content_ttl_secs, 3600);
    }

    #[test]
    fn test_backend_deserializes_lowercase() {
        let backend: StoreBackend = serde_json::from_str("\"local\"").unwrap();
        assert_eq!(backend, StoreBackend::Local);
    }
}
