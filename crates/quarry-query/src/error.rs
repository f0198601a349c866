//! Error types for quarry-query

use thiserror::Error;

/// Failure reported by a `SearchExecutor`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failure raised by a listener callback
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ListenerError {
    #[error("Listener failed: {0}")]
    Failed(String),
}

impl ListenerError {
    pub fn failed(message: impl Into<String>) -> Self {
        ListenerError::Failed(message.into())
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Execution failed: {0}")]
    Execution(#[from] TransportError),
}

impl QueryError {
    /// The transport error behind an execution failure
    pub fn transport(&self) -> &TransportError {
        match self {
            QueryError::Execution(e) => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
