//! Bearer tokens for the Drive API.
//!
//! A service-account key is exchanged for an access token using the OAuth 2.0
//! JWT bearer grant. Tokens are reused until shortly before they expire.

use crate::config::DriveSettings;
use crate::services::file_store::StoreError;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The fields of a Google service-account key file that the exchange needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: Secret<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    /// Token issued elsewhere, used as is.
    StaticToken(Secret<String>),
}

impl Credentials {
    /// Pick credentials from settings: inline key JSON first, then the key
    /// file, then a static access token.
    pub fn from_settings(settings: &DriveSettings) -> Result<Self, StoreError> {
        if let Some(json) = settings
            .credentials_json
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())
        {
            return Self::from_key_json(json.expose_secret());
        }

        if let Some(path) = settings
            .credentials_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
        {
            let json = std::fs::read_to_string(path).map_err(|e| {
                StoreError::Credentials(format!("Failed to read key file {}: {}", path, e))
            })?;
            return Self::from_key_json(&json);
        }

        if let Some(token) = settings
            .access_token
            .as_ref()
            .filter(|s| !s.expose_secret().trim().is_empty())
        {
            return Ok(Credentials::StaticToken(Secret::new(
                token.expose_secret().trim().to_string(),
            )));
        }

        Err(StoreError::Credentials(
            "no Drive credentials configured".to_string(),
        ))
    }

    pub fn from_key_json(json: &str) -> Result<Self, StoreError> {
        let key: ServiceAccountKey = serde_json::from_str(json)
            .map_err(|e| StoreError::Credentials(format!("Invalid service-account key: {}", e)))?;
        Ok(Credentials::ServiceAccount(key))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Hands out bearer tokens, exchanging the service-account key when needed.
pub struct TokenProvider {
    client: Client,
    credentials: Credentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(client: Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, StoreError> {
        let key = match &self.credentials {
            Credentials::StaticToken(token) => return Ok(token.expose_secret().clone()),
            Credentials::ServiceAccount(key) => key,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + EXPIRY_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.exchange(key).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn exchange(&self, key: &ServiceAccountKey) -> Result<CachedToken, StoreError> {
        let assertion = sign_assertion(key, Utc::now().timestamp())?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Token exchange failed");
            return Err(StoreError::Unauthorized(format!(
                "token exchange returned {}",
                status
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| StoreError::InvalidResponse(format!("token response: {}", e)))?;

        tracing::info!(
            client_email = %key.client_email,
            expires_in = token.expires_in,
            "Obtained Drive access token"
        );

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

/// Signed RS256 assertion for the JWT bearer grant.
pub fn sign_assertion(key: &ServiceAccountKey, issued_at: i64) -> Result<String, StoreError> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())
        .map_err(|e| StoreError::Credentials(format!("Failed to parse private key: {}", e)))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: DRIVE_READONLY_SCOPE,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };

    encode(&header, &claims, &encoding_key)
        .map_err(|e| StoreError::Credentials(format!("Failed to sign assertion: {}", e)))
}
