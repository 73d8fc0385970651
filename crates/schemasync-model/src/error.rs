//! Error types for the schema model.

/// Errors that can occur while loading or saving a schema model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// IO error (reading/writing the persisted model).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
