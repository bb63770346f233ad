//! Observability sink for load-phase and render-phase failures.
//!
//! DESIGN
//! ======
//! Every failure the loader or a fault boundary catches becomes exactly one
//! `FailureRecord` handed to a `FailureSink`. The sink decides storage:
//! `TracingSink` emits a structured log line, `MemorySink` keeps records for
//! inspection, `HttpSink` forwards to the server's client-error endpoint,
//! and `FanoutSink` combines them. Reporting never blocks and never fails
//! the caller.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{ErrorKind, LoadError, Stage};

const ERROR_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ERROR_ID_SUFFIX_LEN: usize = 9;

// =============================================================================
// RECORD
// =============================================================================

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    /// `ERR_<millis>_<random>`, shown to users so they can quote it.
    pub error_id: String,
    pub identifier: String,
    pub error_kind: ErrorKind,
    pub stage: Stage,
    pub message: String,
    pub timestamp_ms: i64,
}

impl FailureRecord {
    #[must_use]
    pub fn from_error(err: &LoadError) -> Self {
        Self {
            error_id: new_error_id(),
            identifier: err.identifier().to_string(),
            error_kind: err.kind(),
            stage: err.stage(),
            message: err.to_string(),
            timestamp_ms: now_ms(),
        }
    }
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[must_use]
pub fn new_error_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ERROR_ID_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ERROR_ID_ALPHABET.len());
            ERROR_ID_ALPHABET[idx] as char
        })
        .collect();
    format!("ERR_{}_{suffix}", now_ms())
}

// =============================================================================
// SINKS
// =============================================================================

pub trait FailureSink: Send + Sync {
    fn report(&self, record: &FailureRecord);
}

/// Structured `tracing` error line per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn report(&self, record: &FailureRecord) {
        error!(
            error_id = %record.error_id,
            identifier = %record.identifier,
            error_kind = %record.error_kind,
            stage = %record.stage,
            message = %record.message,
            "component failure"
        );
    }
}

/// Keeps every record in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<FailureRecord>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn records(&self) -> Vec<FailureRecord> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FailureSink for MemorySink {
    fn report(&self, record: &FailureRecord) {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(record.clone());
    }
}

/// Forwards records to the server's client-error log endpoint.
///
/// Delivery is fire-and-forget on the current tokio runtime; delivery
/// failures are logged and dropped.
pub struct HttpSink {
    http: reqwest::Client,
    url: String,
}

impl HttpSink {
    #[must_use]
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }
}

/// Wire body for the client-error endpoint.
#[must_use]
pub fn client_error_body(record: &FailureRecord) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": record.message,
            "name": record.error_kind,
        },
        "metadata": {
            "errorId": record.error_id,
            "identifier": record.identifier,
            "stage": record.stage,
            "timestamp": record.timestamp_ms,
        }
    })
}

impl FailureSink for HttpSink {
    fn report(&self, record: &FailureRecord) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(error_id = %record.error_id, "no runtime; client error not forwarded");
            return;
        };
        let request = self.http.post(&self.url).json(&client_error_body(record));
        let error_id = record.error_id.clone();
        handle.spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => warn!(%error_id, status = resp.status().as_u16(), "client error rejected"),
                Err(e) => warn!(%error_id, error = %e, "failed to forward client error"),
            }
        });
    }
}

/// Reports each record to every inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn FailureSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn FailureSink>>) -> Self {
        Self { sinks }
    }
}

impl FailureSink for FanoutSink {
    fn report(&self, record: &FailureRecord) {
        for sink in &self.sinks {
            sink.report(record);
        }
    }
}

#[cfg(test)]
#[path = "observe_test.rs"]
mod tests;
