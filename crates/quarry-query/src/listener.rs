//! Execution listeners

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ListenerError, TransportError};
use crate::executor::SearchResponse;

/// Hooks called after a query executes.
///
/// Exactly one of the two callbacks runs per execution. A callback that
/// returns `Err` does not stop the remaining listeners and does not change
/// what the caller receives; see `SearchQuery::listener_failures`.
pub trait SearchListener: Send + Sync {
    /// The engine answered the request
    fn on_success(&self, response: &SearchResponse) -> Result<(), ListenerError>;

    /// The executor failed; the caller receives this error afterwards
    fn on_error(&self, error: &TransportError) -> Result<(), ListenerError>;
}

/// A listener callback that returned an error during notification
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerFailure {
    /// Registration position of the failing listener
    pub position: usize,
    pub error: ListenerError,
}

/// Registered listeners in registration order.
///
/// Membership is by identity (the `Arc` allocation). The same listener may
/// be registered more than once and is then notified once per registration.
#[derive(Clone, Default)]
pub struct ListenerSet {
    listeners: Vec<Arc<dyn SearchListener>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Arc<dyn SearchListener>) {
        self.listeners.push(listener);
    }

    /// Remove the first registration of `listener`.
    ///
    /// Returns false when it was not registered.
    pub fn remove(&mut self, listener: &Arc<dyn SearchListener>) -> bool {
        match self.listeners.iter().position(|l| same_listener(l, listener)) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, listener: &Arc<dyn SearchListener>) -> bool {
        self.listeners.iter().any(|l| same_listener(l, listener))
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Call `on_success` on every listener, collecting failures
    pub fn notify_success(&self, response: &SearchResponse) -> Vec<ListenerFailure> {
        self.notify(|listener| listener.on_success(response))
    }

    /// Call `on_error` on every listener, collecting failures
    pub fn notify_error(&self, error: &TransportError) -> Vec<ListenerFailure> {
        self.notify(|listener| listener.on_error(error))
    }

    fn notify<F>(&self, callback: F) -> Vec<ListenerFailure>
    where
        F: Fn(&dyn SearchListener) -> Result<(), ListenerError>,
    {
        let mut failures = Vec::new();
        for (position, listener) in self.listeners.iter().enumerate() {
            if let Err(error) = callback(listener.as_ref()) {
                warn!("Listener {} failed: {}", position, error);
                failures.push(ListenerFailure { position, error });
            }
        }
        failures
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.listeners.len())
            .finish()
    }
}

fn same_listener(a: &Arc<dyn SearchListener>, b: &Arc<dyn SearchListener>) -> bool {
    // Compare data pointers only; vtable pointers may differ between codegen units.
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Listener that reports every outcome through `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingListener {
    label: String,
}

impl TracingListener {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl SearchListener for TracingListener {
    fn on_success(&self, response: &SearchResponse) -> Result<(), ListenerError> {
        info!(
            "[{}] search returned {} hits (total {:?})",
            self.label,
            response.hits().len(),
            response.total()
        );
        Ok(())
    }

    fn on_error(&self, error: &TransportError) -> Result<(), ListenerError> {
        warn!("[{}] search failed: {}", self.label, error);
        Ok(())
    }
}
