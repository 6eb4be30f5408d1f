//! Error types for identifier resolution

/// Errors from allocator calls and mapping persistence
#[derive(Debug, thiserror::Error)]
pub enum XidError {
    /// Error from the remote allocator service
    #[error("Allocator error: {0}")]
    Allocator(String),

    /// Failed to read or write the persisted mapping
    #[error("Mapping persistence error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted mapping file is not valid JSON
    #[error("Mapping file error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for identifier resolution
pub type Result<T> = std::result::Result<T, XidError>;
