//! Authenticated session management.
//!
//! `SessionManager` owns the credentials and the cached session descriptor,
//! and wraps every outbound call with the auth token. A 401 invalidates the
//! cached descriptor, triggers one re-authentication and retries the call
//! exactly once; a second 401 is fatal.

use crate::errors::{ApiError, HttpError, Result};
use log::{debug, error, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;

pub const DEFAULT_AUTH_URL: &str = "https://auth.api.cirruscompute.io";
pub const DEFAULT_VERSION_URL: &str = "https://servers.api.cirruscompute.io";
pub const DEFAULT_API_VERSION: &str = "v1.0";

/// Session descriptor: the token and service URLs handed back by a
/// successful authentication. Immutable; replaced wholesale on refresh.
#[derive(Debug, Clone)]
pub struct Session {
    pub auth_token: String,
    pub storage_url: String,
    pub server_management_url: String,
    pub cdn_management_url: String,
}

#[derive(Debug, Clone)]
struct Credentials {
    user: String,
    key: String,
    version: String,
}

#[derive(Debug, Default)]
struct SessionState {
    credentials: Option<Credentials>,
    session: Option<Session>,
}

enum Dispatch {
    Body(String),
    Unauthorized,
}

/// Owns credentials and the cached [`Session`].
///
/// All mutable state lives behind one mutex, so concurrent callers racing
/// the first authentication share a single identity round-trip instead of
/// each performing their own.
#[derive(Debug)]
pub struct SessionManager {
    http: Client,
    auth_url: String,
    version_url: String,
    state: Mutex<SessionState>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// Create a session manager against the default provider endpoints.
    pub fn new() -> Self {
        Self::with_endpoints(DEFAULT_AUTH_URL, DEFAULT_VERSION_URL)
    }

    /// Create a session manager against explicit identity endpoints.
    pub fn with_endpoints(auth_url: &str, version_url: &str) -> Self {
        debug!("Creating SessionManager");
        debug!("  Auth URL: {}", auth_url);
        debug!("  Version URL: {}", version_url);
        Self {
            http: Client::new(),
            auth_url: auth_url.trim_end_matches('/').to_string(),
            version_url: version_url.trim_end_matches('/').to_string(),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Fetch the provider's published API version ids (unauthenticated).
    pub async fn versions(&self) -> Result<Vec<String>> {
        let url = format!("{}/.json", self.version_url);
        debug!("Fetching supported API versions from {}", url);

        let response = self
            .http
            .get(&url)
            .headers(default_headers())
            .send()
            .await
            .map_err(HttpError::Request)?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Version discovery failed with status {}", status);
            return Err(HttpError::HttpError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: Value = response.json().await.map_err(HttpError::Request)?;
        let entries = body.get("versions").and_then(Value::as_array).ok_or_else(|| {
            ApiError::Core(cirrus_core::CirrusError::ParseError(
                "version discovery response missing 'versions' list".to_string(),
            ))
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            if let Some(id) = entry.get("id").and_then(Value::as_str) {
                if !ids.iter().any(|known| known == id) {
                    ids.push(id.to_string());
                }
            }
        }
        debug!("Provider supports API versions {:?}", ids);
        Ok(ids)
    }

    /// Validate the requested API version and store credentials.
    ///
    /// Re-initialization overwrites prior credentials; a cached session, if
    /// any, is left in place.
    pub async fn initialize(&self, user: &str, key: &str, version: Option<&str>) -> Result<()> {
        let version = version.unwrap_or(DEFAULT_API_VERSION);
        let supported = self.versions().await?;
        if !supported.iter().any(|v| v == version) {
            error!("API version {} not in supported set {:?}", version, supported);
            return Err(HttpError::InvalidVersion(version.to_string()).into());
        }

        let mut state = self.state.lock().await;
        state.credentials = Some(Credentials {
            user: user.to_string(),
            key: key.to_string(),
            version: version.to_string(),
        });
        info!("Session manager initialized for user {} (API {})", user, version);
        Ok(())
    }

    /// Whether credentials have been stored.
    pub async fn initialized(&self) -> bool {
        self.state.lock().await.credentials.is_some()
    }

    /// Authenticate against the identity endpoint and return a fresh
    /// session descriptor. Does not touch the cache.
    pub async fn authenticate(&self) -> Result<Session> {
        let creds = self
            .state
            .lock()
            .await
            .credentials
            .clone()
            .ok_or(HttpError::NotInitialized)?;
        self.authenticate_with(&creds).await
    }

    /// Return the cached session, authenticating lazily exactly once.
    pub async fn session(&self) -> Result<Session> {
        let mut state = self.state.lock().await;
        if let Some(ref session) = state.session {
            return Ok(session.clone());
        }
        let creds = state.credentials.clone().ok_or(HttpError::NotInitialized)?;
        // The lock is held across the identity round-trip on purpose:
        // concurrent first callers must not each authenticate.
        let session = self.authenticate_with(&creds).await?;
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn authenticate_with(&self, creds: &Credentials) -> Result<Session> {
        let url = format!("{}/{}", self.auth_url, creds.version);
        debug!("Authenticating against {}", url);

        let response = self
            .http
            .get(&url)
            .header("X-Auth-User", &creds.user)
            .header("X-Auth-Key", &creds.key)
            .send()
            .await
            .map_err(HttpError::Request)?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            error!("Identity provider rejected credentials (401)");
            return Err(HttpError::AuthenticationFailed.into());
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Authentication failed with status {}", status);
            return Err(HttpError::HttpError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        // Everything we need rides on response headers; the body is unused.
        let header = |name: &str| -> Result<String> {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    ApiError::Http(HttpError::Config(format!(
                        "auth response missing {} header",
                        name
                    )))
                })
        };
        let session = Session {
            auth_token: header("X-Auth-Token")?,
            storage_url: header("X-Storage-Url")?,
            server_management_url: header("X-Server-Management-Url")?,
            cdn_management_url: header("X-CDN-Management-Url")?,
        };
        info!("Authenticated; service URLs discovered");
        Ok(session)
    }

    /// Discard the cached session if it still carries the rejected token.
    async fn invalidate(&self, stale_token: &str) {
        let mut state = self.state.lock().await;
        if state
            .session
            .as_ref()
            .map(|s| s.auth_token.as_str())
            == Some(stale_token)
        {
            debug!("Discarding cached session");
            state.session = None;
        }
    }

    /// The generic authenticated call.
    ///
    /// Appends `.json` to the URL, merges the standard JSON headers (caller
    /// headers of the same name win) and the current auth token, and
    /// recovers from a single 401 by re-authenticating and retrying once.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<String> {
        let url = format!("{}.json", url);

        let session = self.session().await?;
        match self
            .dispatch(method.clone(), &url, payload, headers, &session.auth_token)
            .await?
        {
            Dispatch::Body(body) => return Ok(body),
            Dispatch::Unauthorized => {}
        }

        debug!("Auth token rejected, re-authenticating and retrying once");
        self.invalidate(&session.auth_token).await;
        let session = self.session().await?;
        match self
            .dispatch(method, &url, payload, headers, &session.auth_token)
            .await?
        {
            Dispatch::Body(body) => Ok(body),
            Dispatch::Unauthorized => {
                error!("Request still unauthorized after token refresh");
                Err(HttpError::AuthenticationFailed.into())
            }
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        payload: Option<&Value>,
        extra: Option<&HeaderMap>,
        token: &str,
    ) -> Result<Dispatch> {
        debug!("HTTP {} {}", method, url);

        let mut headers = default_headers();
        if let Some(extra) = extra {
            for (name, value) in extra {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers.insert(
            "X-Auth-Token",
            HeaderValue::from_str(token).map_err(|_| {
                ApiError::Http(HttpError::Config(
                    "auth token is not a valid header value".to_string(),
                ))
            })?,
        );

        let mut request = self.http.request(method, url).headers(headers);
        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(HttpError::Request)?;
        let status = response.status();
        debug!("Response status: {}", status);

        if status == StatusCode::UNAUTHORIZED {
            return Ok(Dispatch::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Request failed with status {}", status);
            return Err(HttpError::HttpError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(Dispatch::Body(
            response.text().await.map_err(HttpError::Request)?,
        ))
    }

    /// Make an authenticated GET request.
    pub async fn get(&self, url: &str, headers: Option<&HeaderMap>) -> Result<String> {
        self.request(Method::GET, url, None, headers).await
    }

    /// Make an authenticated POST request with a JSON payload.
    pub async fn post(
        &self,
        url: &str,
        payload: &Value,
        headers: Option<&HeaderMap>,
    ) -> Result<String> {
        self.request(Method::POST, url, Some(payload), headers).await
    }

    /// Make an authenticated PUT request with a JSON payload.
    pub async fn put(
        &self,
        url: &str,
        payload: &Value,
        headers: Option<&HeaderMap>,
    ) -> Result<String> {
        self.request(Method::PUT, url, Some(payload), headers).await
    }

    /// Make an authenticated DELETE request.
    pub async fn delete(&self, url: &str, headers: Option<&HeaderMap>) -> Result<String> {
        self.request(Method::DELETE, url, None, headers).await
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}
