//! Error types for quarry-core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown sort order: {0}")]
    UnknownSortOrder(String),

    #[error("Invalid date pattern: {0}")]
    InvalidDatePattern(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
