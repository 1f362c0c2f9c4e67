//! REST clients for the Matelog auth and tracking endpoints.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session manager only sees the [`AuthApi`] and [`TrackingApi`]
//! traits. [`HttpApi`] implements both over one `reqwest` client so the
//! backend's session cookie is shared between them.
//!
//! ERROR HANDLING
//! ==============
//! Every non-success response is turned into [`RemoteError::Status`] with
//! its body decoded here, so callers never inspect raw payloads.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::RemoteError;
use super::types::{AuthResponse, Credentials, RegistrationData, TrackingSession, User};
use crate::config::HttpTimeouts;

pub const PROFILE_PATH: &str = "api/users/profile/";
pub const LOGIN_PATH: &str = "api/users/login/";
pub const REGISTER_PATH: &str = "api/users/register/";
pub const LOGOUT_PATH: &str = "api/users/logout/";
pub const TRACKING_START_PATH: &str = "api/tracking/sesion/iniciar/";
pub const TRACKING_END_PATH: &str = "api/tracking/sesion/finalizar/";

// =============================================================================
// SERVICE TRAITS
// =============================================================================

/// Auth service consumed by the session manager.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Fetch the profile of the user owning the current backend session.
    ///
    /// # Errors
    ///
    /// Fails when no session is active or the request fails.
    async fn get_profile(&self) -> Result<User, RemoteError>;

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Fails on rejected credentials or transport failure.
    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, RemoteError>;

    /// Create an account and return its user envelope.
    ///
    /// # Errors
    ///
    /// Fails on validation errors or transport failure.
    async fn register(&self, data: &RegistrationData) -> Result<AuthResponse, RemoteError>;

    /// End the backend session.
    ///
    /// # Errors
    ///
    /// Fails when the request fails; callers treat this as best-effort.
    async fn logout(&self) -> Result<(), RemoteError>;
}

/// Study-session tracking service.
#[async_trait::async_trait]
pub trait TrackingApi: Send + Sync {
    /// Open a study session for the authenticated user.
    ///
    /// # Errors
    ///
    /// Fails when the user is not authenticated or the request fails.
    async fn start_session(&self) -> Result<TrackingSession, RemoteError>;

    /// Close the study session `session_id`.
    ///
    /// # Errors
    ///
    /// Fails when the session is unknown or the request fails.
    async fn end_session(&self, session_id: &str) -> Result<(), RemoteError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// Cookie-authenticated client for the Matelog backend.
pub struct HttpApi {
    http: reqwest::Client,
    base_url: Url,
    jar: Arc<Jar>,
}

impl HttpApi {
    /// Build a client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL or the
    /// HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiClientError> {
        let base_url = parse_base_url(base_url)?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiClientError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url, jar })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Current `Cookie` header value for the backend, if any cookie is held.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        header.to_str().ok().map(str::to_owned)
    }

    /// Load cookies previously captured with [`Self::cookie_header`].
    pub fn restore_cookies(&self, header: &str) {
        for pair in cookie_pairs(header) {
            self.jar.add_cookie_str(pair, &self.base_url);
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::Transport(format!("invalid endpoint {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "GET");
        let resp = self.http.get(url).send().await?;
        read_json(resp).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, RemoteError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");
        let resp = self.http.post(url).json(body).send().await?;
        read_json(resp).await
    }

    async fn post_unit<B>(&self, path: &str, body: &B) -> Result<(), RemoteError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");
        let resp = self.http.post(url).json(body).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        Err(RemoteError::status(status.as_u16(), &text))
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RemoteError> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(RemoteError::status(status.as_u16(), &text));
    }
    serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))
}

fn parse_base_url(raw: &str) -> Result<Url, ApiClientError> {
    let invalid = |reason: String| ApiClientError::InvalidBaseUrl { url: raw.to_owned(), reason };
    // A trailing slash keeps `Url::join` from replacing the last path segment.
    let normalized = format!("{}/", raw.trim().trim_end_matches('/'));
    let url = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(url)
}

fn cookie_pairs(header: &str) -> impl Iterator<Item = &str> {
    header
        .split(';')
        .map(str::trim)
        .filter(|pair| pair.contains('=') && !pair.starts_with('='))
}

#[async_trait::async_trait]
impl AuthApi for HttpApi {
    async fn get_profile(&self) -> Result<User, RemoteError> {
        self.get_json(PROFILE_PATH).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, RemoteError> {
        self.post_json(LOGIN_PATH, credentials).await
    }

    async fn register(&self, data: &RegistrationData) -> Result<AuthResponse, RemoteError> {
        self.post_json(REGISTER_PATH, data).await
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        self.post_unit(LOGOUT_PATH, &serde_json::json!({})).await
    }
}

#[async_trait::async_trait]
impl TrackingApi for HttpApi {
    async fn start_session(&self) -> Result<TrackingSession, RemoteError> {
        self.post_json(TRACKING_START_PATH, &serde_json::json!({})).await
    }

    async fn end_session(&self, session_id: &str) -> Result<(), RemoteError> {
        // The backend keys sessions by integer id; send numbers as numbers.
        let id = session_id
            .parse::<i64>()
            .map_or_else(|_| serde_json::json!(session_id), |n| serde_json::json!(n));
        self.post_unit(TRACKING_END_PATH, &serde_json::json!({ "sesion_id": id })).await
    }
}
