//! Mutation transport errors and the failure classification that drives
//! the loader's retry policy.

use std::fmt;

/// Machine-readable code attached to every transport failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    /// Unforeseen server-side fault.
    Internal,
    /// Remote unreachable; with TLS this usually means the certificate did
    /// not match the requested host name.
    Unavailable,
    /// Remote signalled overload.
    ResourceExhausted,
    /// Optimistic-concurrency abort.
    Aborted,
    /// Conflicting write.
    Conflict,
    /// Request rejected as malformed.
    InvalidRequest,
    /// Anything else.
    Unknown,
}

impl ErrorCode {
    /// Parse the code string carried in an error response body.
    pub fn from_wire(code: &str) -> Self {
        match code {
            "internal" => ErrorCode::Internal,
            "unavailable" => ErrorCode::Unavailable,
            "resource_exhausted" => ErrorCode::ResourceExhausted,
            "aborted" => ErrorCode::Aborted,
            "conflict" => ErrorCode::Conflict,
            "invalid_request" => ErrorCode::InvalidRequest,
            _ => ErrorCode::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Internal => "internal",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::ResourceExhausted => "resource_exhausted",
            ErrorCode::Aborted => "aborted",
            ErrorCode::Conflict => "conflict",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A classified failure from the mutation or allocator transport.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ClientError {
    pub code: ErrorCode,
    pub message: String,
}

impl ClientError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// How the loader should react to this failure.
    pub fn classify(&self) -> ErrorClass {
        match self.code {
            ErrorCode::Internal | ErrorCode::Unavailable => ErrorClass::Fatal,
            _ if self.message.contains("x509") || self.message.contains("certificate") => {
                ErrorClass::Fatal
            }
            ErrorCode::ResourceExhausted => ErrorClass::Overloaded,
            _ if self.message.contains("Server overloaded") => ErrorClass::Overloaded,
            ErrorCode::Aborted | ErrorCode::Conflict => ErrorClass::Transient,
            _ => ErrorClass::Unknown,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        let code = if e.is_connect() || e.is_timeout() {
            ErrorCode::Unavailable
        } else {
            ErrorCode::Unknown
        };
        ClientError::new(code, e.to_string())
    }
}

/// Outcome classes of a mutation attempt, in the order the loader checks
/// them. Fatal halts the run; Overloaded sleeps a long randomized cooldown
/// in place; Transient and Unknown count an abort and go to the retry
/// engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Fatal,
    Overloaded,
    Transient,
    Unknown,
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, ClientError>;
