//! Loader configuration parsed from environment variables.

use std::time::Duration;

use reqwest::header::{COOKIE, HeaderMap, HeaderValue};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REGISTRY_PATH: &str = "/api/bigbook/custom-components-registry";
pub const DEFAULT_CLIENT_ERRORS_PATH: &str = "/api/logs/client-errors";
pub const SESSION_COOKIE: &str = "session_token";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },

    /// The session token cannot be sent as a header value.
    #[error("invalid session header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub base_url: String,
    pub registry_path: String,
    pub client_errors_path: String,
    pub session_token: Option<String>,
    /// Caller-supplied deadline for HTTP calls; none when unset.
    pub request_timeout_secs: Option<u64>,
    /// Abort a superseded in-flight invocation instead of only ignoring it.
    pub abort_superseded: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            registry_path: DEFAULT_REGISTRY_PATH.to_string(),
            client_errors_path: DEFAULT_CLIENT_ERRORS_PATH.to_string(),
            session_token: None,
            request_timeout_secs: None,
            abort_superseded: false,
        }
    }
}

impl LoaderConfig {
    /// Build typed loader config from environment variables.
    ///
    /// Optional:
    /// - `BIGBOOK_BASE_URL`: default `http://127.0.0.1:3000`
    /// - `BIGBOOK_REGISTRY_PATH`: default `/api/bigbook/custom-components-registry`
    /// - `BIGBOOK_CLIENT_ERRORS_PATH`: default `/api/logs/client-errors`
    /// - `BIGBOOK_SESSION_TOKEN`: sent as the `session_token` cookie
    /// - `BIGBOOK_REQUEST_TIMEOUT_SECS`: no timeout when absent
    /// - `BIGBOOK_ABORT_SUPERSEDED`: `true` or `false` (default)
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric or boolean variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("BIGBOOK_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let registry_path =
            normalize_path(std::env::var("BIGBOOK_REGISTRY_PATH").ok(), DEFAULT_REGISTRY_PATH);
        let client_errors_path =
            normalize_path(std::env::var("BIGBOOK_CLIENT_ERRORS_PATH").ok(), DEFAULT_CLIENT_ERRORS_PATH);
        let session_token = std::env::var("BIGBOOK_SESSION_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        let request_timeout_secs = parse_timeout(std::env::var("BIGBOOK_REQUEST_TIMEOUT_SECS").ok().as_deref())?;
        let abort_superseded = parse_bool(
            "BIGBOOK_ABORT_SUPERSEDED",
            std::env::var("BIGBOOK_ABORT_SUPERSEDED").ok().as_deref(),
        )?;

        Ok(Self { base_url, registry_path, client_errors_path, session_token, request_timeout_secs, abort_superseded })
    }

    #[must_use]
    pub fn registry_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.registry_path)
    }

    #[must_use]
    pub fn client_errors_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.client_errors_path)
    }

    /// Build an HTTP client that authenticates as the configured session.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// client cannot be built.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.session_token {
            headers.insert(COOKIE, HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}"))?);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder
            .build()
            .map_err(|e| ConfigError::HttpClientBuild(e.to_string()))
    }
}

fn normalize_path(raw: Option<String>, default: &str) -> String {
    let path = raw.filter(|p| !p.is_empty()).unwrap_or_else(|| default.to_string());
    if path.starts_with('/') { path } else { format!("/{path}") }
}

fn parse_timeout(raw: Option<&str>) -> Result<Option<u64>, ConfigError> {
    match raw {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var: "BIGBOOK_REQUEST_TIMEOUT_SECS", value: v.to_string() }),
    }
}

fn parse_bool(var: &'static str, raw: Option<&str>) -> Result<bool, ConfigError> {
    match raw {
        None | Some("") => Ok(false),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue { var, value: other.to_string() }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
