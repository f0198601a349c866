//! The execution seam between a query and the search engine

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::TransportError;

/// A compiled request: target index plus the DSL body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Index to search (None = engine default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    /// Request body (`query`, `size`, `sort`, ...)
    pub body: Value,
}

/// Raw engine response, passed through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResponse {
    raw: Value,
}

impl SearchResponse {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// The response document as received
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Entries of `hits.hits`, empty when absent
    pub fn hits(&self) -> &[Value] {
        self.raw
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `hits.total`, either a bare number or `{"value": n, ...}`
    pub fn total(&self) -> Option<u64> {
        let total = self.raw.pointer("/hits/total")?;
        total
            .as_u64()
            .or_else(|| total.get("value").and_then(Value::as_u64))
    }
}

/// Anything able to run a compiled request against the engine.
///
/// Transport concerns (connections, retries, timeouts) live entirely behind
/// this trait.
#[async_trait]
pub trait SearchExecutor: Send + Sync {
    /// Execute a request and return the raw response
    async fn execute(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError>;

    /// Executor name for diagnostics
    fn name(&self) -> &str;
}

/// In-memory executor returning a fixed outcome and recording requests.
///
/// Useful for tests and for replaying a saved response. Every request is
/// kept for the executor's lifetime, so use a fresh executor per replay
/// rather than one long-lived instance.
pub struct MemoryExecutor {
    outcome: Result<Value, TransportError>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl MemoryExecutor {
    /// Answer every request with `response`
    pub fn responding(response: Value) -> Self {
        Self {
            outcome: Ok(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every request with `error`
    pub fn failing(error: TransportError) -> Self {
        Self {
            outcome: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last_request(&self) -> Option<SearchRequest> {
        self.requests().pop()
    }
}

#[async_trait]
impl SearchExecutor for MemoryExecutor {
    async fn execute(&self, request: &SearchRequest) -> Result<SearchResponse, TransportError> {
        debug!("MemoryExecutor: index={:?}", request.index);
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request.clone());
        self.outcome.clone().map(SearchResponse::new)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryExecutor")
            .field("fails", &self.outcome.is_err())
            .finish()
    }
}
