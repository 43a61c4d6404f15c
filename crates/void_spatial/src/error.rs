//! Error types for the spatial index

use thiserror::Error;

/// Spatial index errors
#[derive(Debug, Error)]
pub enum SpatialError {
    /// A configuration value is outside its valid range
    #[error("Invalid spatial tree configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed
    #[error("Failed to parse spatial tree configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A structural invariant of the tree does not hold
    #[error("Corrupt tree at {node}: {reason}")]
    Corrupt { node: String, reason: String },
}

impl SpatialError {
    pub(crate) fn corrupt(node: impl core::fmt::Debug, reason: impl Into<String>) -> Self {
        SpatialError::Corrupt {
            node: format!("{node:?}"),
            reason: reason.into(),
        }
    }
}

/// Result type for spatial index operations
pub type Result<T> = std::result::Result<T, SpatialError>;
