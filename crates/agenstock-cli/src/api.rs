//! `AgenStock` REST API client.
//!
//! Covers identity lookup, login and chat session management. Everything
//! else the web dashboard calls is out of scope for the terminal client.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use agenstock_core::frame::SessionSummary;

/// REST client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not authenticated. Run `agenstock auth login` first")]
    Unauthorized,

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Response of `GET /api/auth/me`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Response of `POST /api/chat/sessions`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedSession {
    pub session_id: String,
    #[serde(default)]
    pub title: String,
}

/// One stored chat message from `GET /api/chat/sessions/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredMessage {
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Response of `POST /api/auth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}

#[derive(Serialize)]
struct CreateSessionBody<'a> {
    title: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// HTTP client for the `AgenStock` API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client. `access_token` is sent as a bearer token on every request.
    pub fn new(base_url: &str, access_token: Option<&str>) -> Result<Self, ApiError> {
        if base_url.is_empty() {
            return Err(ApiError::Config("base_url is empty".into()));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ApiError::Config("Invalid token format".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        // reqwest is built with rustls-no-provider; Err means already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Turn non-success responses into errors, keeping the server's `detail`.
    async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound { what: what.into() }),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(ApiError::Api {
                    status: status.as_u16(),
                    message: error_message(status, &body),
                })
            }
        }
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange username and password for an access token.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let resp = self
            .http
            .post(self.url("/auth/token"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let resp = Self::check(resp, "Login endpoint").await?;
        Ok(resp.json().await?)
    }

    /// Look up the current user. A profile without a username counts as unauthenticated.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let resp = self.http.get(self.url("/auth/me")).send().await?;
        let resp = Self::check(resp, "User").await?;
        let profile: UserProfile = resp.json().await?;
        match profile.username.as_deref() {
            Some(name) if !name.is_empty() => Ok(profile),
            _ => Err(ApiError::Unauthorized),
        }
    }

    // =========================================================================
    // Chat sessions
    // =========================================================================

    /// Create a chat session and return its server-assigned id.
    pub async fn create_session(&self, title: &str) -> Result<CreatedSession, ApiError> {
        let resp = self
            .http
            .post(self.url("/chat/sessions"))
            .json(&CreateSessionBody { title })
            .send()
            .await?;
        let resp = Self::check(resp, "Session endpoint").await?;
        let created: CreatedSession = resp.json().await?;
        debug!(session_id = %created.session_id, "Chat session created");
        Ok(created)
    }

    /// List the current user's sessions, most recently updated first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ApiError> {
        let resp = self.http.get(self.url("/chat/sessions")).send().await?;
        let resp = Self::check(resp, "Sessions").await?;
        Ok(resp.json().await?)
    }

    /// Fetch the stored messages of a session in chronological order.
    pub async fn session_messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/chat/sessions/{session_id}/messages")))
            .send()
            .await?;
        let resp = Self::check(resp, &format!("Session {session_id}")).await?;
        Ok(resp.json().await?)
    }

    /// Delete a session and its messages.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/chat/sessions/{session_id}")))
            .send()
            .await?;
        Self::check(resp, &format!("Session {session_id}")).await?;
        Ok(())
    }
}

/// Best human-readable message for an error response body.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}
