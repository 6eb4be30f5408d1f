//! Error types for statement decoding

/// Error type for chunking and parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// Malformed statement line or record
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Input is not valid for the selected format
    #[error("Invalid {format} input: {message}")]
    InvalidInput { format: &'static str, message: String },

    /// Format could not be inferred from the file name
    #[error("Cannot infer input format from {0:?}; pass an explicit format")]
    UnknownFormat(String),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading the input stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChunkError {
    /// Create a parse error
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type for decoding operations
pub type Result<T> = std::result::Result<T, ChunkError>;
