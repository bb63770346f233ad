//! HTTP registry client.
//!
//! Thin reqwest wrapper for the registry endpoint. The session credential is
//! attached by the configured client's default headers, so every fetch
//! authenticates as the current session. Pure parsing in `parse_registry`
//! for testability.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{RegistryDocument, RegistrySource};
use crate::config::{ConfigError, LoaderConfig};
use crate::error::RegistryError;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpRegistryClient {
    http: reqwest::Client,
    url: String,
}

impl HttpRegistryClient {
    #[must_use]
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    /// Build a credentialed client for the configured registry URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the session header or HTTP client is invalid.
    pub fn from_config(config: &LoaderConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.http_client()?, config.registry_url()))
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RegistrySource for HttpRegistryClient {
    async fn fetch_registry(&self) -> Result<RegistryDocument, RegistryError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable { status: None, reason: e.to_string() })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RegistryError::Unavailable { status: Some(status), reason: e.to_string() })?;

        debug!(url = %self.url, status, bytes = text.len(), "registry fetched");
        parse_registry(status, &text)
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Interpret a registry response.
///
/// The server wraps the document as `{"success": true, ...document}`; a body
/// with `"success": false` is a server-side failure even under a 2xx status.
///
/// # Errors
///
/// [`RegistryError::Unavailable`] for non-2xx statuses and explicit failure
/// envelopes, [`RegistryError::Malformed`] for bodies of the wrong shape.
pub fn parse_registry(status: u16, body: &str) -> Result<RegistryDocument, RegistryError> {
    if !(200..300).contains(&status) {
        let reason = match server_error(body) {
            Some(message) => format!("HTTP {status}: {message}"),
            None => format!("HTTP {status}"),
        };
        return Err(RegistryError::Unavailable { status: Some(status), reason });
    }

    let value: Value = serde_json::from_str(body).map_err(|e| RegistryError::Malformed(e.to_string()))?;

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let reason = server_error(body).unwrap_or_else(|| "registry reported failure".to_string());
        return Err(RegistryError::Unavailable { status: Some(status), reason });
    }

    serde_json::from_value(value).map_err(|e| RegistryError::Malformed(e.to_string()))
}

fn server_error(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value.get("error").and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
