//! Typed client for the lending REST API.
//!
//! # Architecture
//!
//! - One thin method per endpoint, grouped by resource (`auth`, `books`,
//!   `cart`, `loans`, `reviews`, `me`, `admin`)
//! - JSON over HTTP with `reqwest`; multipart for book covers and profile photos
//! - The bearer token is read from the [`Store`] on every request
//! - A 401 on a request that carried the current token clears the session
//!   (memory and session file) before the error is returned, so callers only
//!   have to route the user to the login view. A 401 for a token that was
//!   replaced mid-flight, or for login/register, leaves the session alone
//!
//! Caching and invalidation live one layer up in [`crate::app`]; this module
//! performs exactly one round-trip per call and never retries.
//!
//! # Example
//!
//! ```rust,ignore
//! use lending_client::{ApiClient, ClientConfig, Store};
//!
//! let config = ClientConfig::from_env()?;
//! let store = Store::with_session_file(SessionFile::new(&config.session_file));
//! let api = ApiClient::new(&config, store)?;
//!
//! let page = api.list_books(&BookQuery::default()).await?;
//! ```

mod admin;
mod auth;
mod books;
mod cart;
mod loans;
mod me;
mod reviews;
pub mod types;

pub use admin::{AdminBookQuery, UserQuery};
pub use books::{AuthorBooksQuery, BookQuery, RecommendQuery};
pub use loans::LoanQuery;
pub use reviews::{MyReviewsQuery, ReviewQuery};
pub use types::*;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode, multipart};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::store::Store;

/// Longest slice of an error body kept in messages and logs.
const ERROR_BODY_PREVIEW: usize = 200;

/// Errors that can occur when calling the lending API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connection refused, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the credentials, or a token that is no longer
    /// the current session's.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server rejected the current session's token; the session was
    /// cleared.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// The session is valid but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the server.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The request could not be built (e.g. invalid upload MIME type).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status behind this error, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) | Self::SessionExpired(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Whether the server answered 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::SessionExpired(_))
    }

    /// Whether this error ended the current session.
    #[must_use]
    pub const fn ended_session(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    /// Whether repeating the same read may succeed.
    ///
    /// Transport failures, rate limiting and 5xx responses are transient;
    /// every other 4xx is a definitive answer.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Error body shapes returned by the lending server.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        match self.message {
            Some(serde_json::Value::String(s)) => Some(s),
            // Validation failures arrive as a list of messages
            Some(serde_json::Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_owned))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            Some(other) => Some(other.to_string()),
            None => self.error,
        }
    }
}

/// Whether a request carries the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Anonymous,
}

/// Client for the lending REST API.
///
/// Cheap to clone; all clones share the HTTP connection pool and the store.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    store: Store,
}

impl ApiClient {
    /// Create a new API client bound to `store` for its session token.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, store: Store) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lending-desk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.as_str().trim_end_matches('/').to_owned(),
                store,
            }),
        })
    }

    /// The store this client reads its token from.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// The API base URL (without trailing slash).
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner.client.request(method, self.url(path))
    }

    /// Send a request and decode a JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        auth: Auth,
    ) -> Result<T, ApiError> {
        let response = self.dispatch(builder, auth).await?;
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %preview(&body),
                "Failed to parse lending API response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose response body is irrelevant.
    async fn send_empty(&self, builder: RequestBuilder, auth: Auth) -> Result<(), ApiError> {
        self.dispatch(builder, auth).await.map(drop)
    }

    /// Attach credentials, send, and map non-success statuses to errors.
    async fn dispatch(
        &self,
        builder: RequestBuilder,
        auth: Auth,
    ) -> Result<reqwest::Response, ApiError> {
        let token = match auth {
            Auth::Bearer => self.inner.store.token().await,
            Auth::Anonymous => None,
        };
        let builder = match &token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let url = response.url().path().to_owned();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_owned()
                } else {
                    preview(&body)
                }
            });

        match status {
            StatusCode::UNAUTHORIZED => {
                let ended = match &token {
                    Some(token) => self.inner.store.force_logout(token).await,
                    None => false,
                };
                if ended {
                    warn!(path = %url, "Session rejected by server, logged out");
                    Err(ApiError::SessionExpired(message))
                } else {
                    Err(ApiError::Unauthorized(message))
                }
            }
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden(message)),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(message)),
            _ => {
                debug!(status = %status, path = %url, body = %preview(&body), "Lending API returned non-success status");
                Err(ApiError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    // =========================================================================
    // Request helpers used by the per-resource modules
    // =========================================================================

    async fn get<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path).query(query);
        self.send(builder, Auth::Bearer).await
    }

    async fn get_path<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, path);
        self.send(builder, Auth::Bearer).await
    }

    async fn write_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        auth: Auth,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(method, path).json(body);
        self.send(builder, auth).await
    }

    async fn write_json_empty<B>(&self, method: Method, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        let builder = self.request(method, path).json(body);
        self.send_empty(builder, Auth::Bearer).await
    }

    async fn write_multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: multipart::Form,
    ) -> Result<T, ApiError> {
        let builder = self.request(method, path).multipart(form);
        self.send(builder, Auth::Bearer).await
    }

    async fn write_multipart_empty(
        &self,
        method: Method,
        path: &str,
        form: multipart::Form,
    ) -> Result<(), ApiError> {
        let builder = self.request(method, path).multipart(form);
        self.send_empty(builder, Auth::Bearer).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, path);
        self.send_empty(builder, Auth::Bearer).await
    }
}

/// Build a multipart file part from an [`Upload`].
fn upload_part(upload: &Upload) -> Result<multipart::Part, ApiError> {
    multipart::Part::bytes(upload.bytes.clone())
        .file_name(upload.file_name.clone())
        .mime_str(&upload.mime_type)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid MIME type {}: {e}", upload.mime_type)))
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}
