//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `LENDING_API_URL` - API base URL including the `/api` prefix
//!   (default: `http://localhost:8080/api`)
//! - `LENDING_SESSION_FILE` - Where the bearer token is persisted
//!   (default: `.lending-session.json`)
//! - `LENDING_CACHE_TTL_SECS` - Query cache TTL in seconds (default: 300)
//! - `LENDING_CACHE_CAPACITY` - Maximum cached queries (default: 1000)
//! - `LENDING_READ_RETRIES` - Automatic retries for failed reads (default: 3)
//! - `LENDING_RETRY_BASE_MS` - Backoff base in milliseconds (default: 1000)
//! - `LENDING_CART_HINT_TTL_SECS` - Lifetime of an optimistic cart bump (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_SESSION_FILE: &str = ".lending-session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Lending client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, e.g. `https://library.example.org/api`
    pub api_url: Url,
    /// Session file holding the bearer token
    pub session_file: PathBuf,
    /// How long a cached query stays fresh
    pub cache_ttl: Duration,
    /// Maximum number of cached queries
    pub cache_capacity: u64,
    /// Automatic retries for transient read failures
    pub read_retries: u32,
    /// First backoff delay; doubled on each retry
    pub retry_base: Duration,
    /// How long an optimistic cart bump is shown before it is dropped
    pub cart_hint_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Configuration for `api_url` with every other setting at its default.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 1000,
            read_retries: 3,
            retry_base: Duration::from_millis(1000),
            cart_hint_ttl: Duration::from_secs(30),
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = parse_api_url(
            "LENDING_API_URL",
            &get_env_or_default(&lookup, "LENDING_API_URL", DEFAULT_API_URL),
        )?;
        let session_file = PathBuf::from(get_env_or_default(
            &lookup,
            "LENDING_SESSION_FILE",
            DEFAULT_SESSION_FILE,
        ));
        let cache_ttl = Duration::from_secs(get_parsed(&lookup, "LENDING_CACHE_TTL_SECS", 300)?);
        let cache_capacity = get_parsed(&lookup, "LENDING_CACHE_CAPACITY", 1000)?;
        let read_retries = get_parsed(&lookup, "LENDING_READ_RETRIES", 3)?;
        let retry_base = Duration::from_millis(get_parsed(&lookup, "LENDING_RETRY_BASE_MS", 1000)?);
        let cart_hint_ttl =
            Duration::from_secs(get_parsed(&lookup, "LENDING_CART_HINT_TTL_SECS", 30)?);
        let sentry_dsn = lookup("SENTRY_DSN").filter(|dsn| !dsn.trim().is_empty());

        if cache_capacity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "LENDING_CACHE_CAPACITY".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            session_file,
            cache_ttl,
            cache_capacity,
            read_retries,
            retry_base,
            cart_hint_ttl,
            sentry_dsn,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable with a default value.
fn get_env_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Get a variable parsed into `T`, or `default` when unset.
fn get_parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Parse the API base URL; only http(s) is accepted.
fn parse_api_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:8080/api");
        assert_eq!(config.session_file, PathBuf::from(".lending-session.json"));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.read_retries, 3);
        assert_eq!(config.retry_base, Duration::from_secs(1));
        assert_eq!(config.cart_hint_ttl, Duration::from_secs(30));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_new_matches_empty_env() {
        let from_env = ClientConfig::from_lookup(lookup(&[])).unwrap();
        let direct = ClientConfig::new(from_env.api_url.clone());
        assert_eq!(from_env.session_file, direct.session_file);
        assert_eq!(from_env.cache_ttl, direct.cache_ttl);
        assert_eq!(from_env.retry_base, direct.retry_base);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("LENDING_API_URL", "https://library.example.org/api"),
            ("LENDING_READ_RETRIES", "0"),
            ("LENDING_CACHE_TTL_SECS", " 60 "),
            ("SENTRY_DSN", ""),
        ]))
        .unwrap();
        assert_eq!(config.api_url.host_str(), Some("library.example.org"));
        assert_eq!(config.read_retries, 0);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let err = ClientConfig::from_lookup(lookup(&[("LENDING_READ_RETRIES", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "LENDING_READ_RETRIES"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(ClientConfig::from_lookup(lookup(&[("LENDING_API_URL", "not a url")])).is_err());
        assert!(
            ClientConfig::from_lookup(lookup(&[("LENDING_API_URL", "ftp://example.org/api")]))
                .is_err()
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("LENDING_CACHE_CAPACITY", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }
}
