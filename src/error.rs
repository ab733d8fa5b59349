//! Error types for the remote query engine.

use thiserror::Error;

/// Transport-level errors raised by an execution port before a raw result
/// was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    InvalidBody(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Configuration errors raised while wiring up ambient concerns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid logging configuration: {0}")]
    InvalidLogging(String),
}

/// Terminal error of one query pass, published to the error container.
///
/// Both variants are recoverable: they are absorbed into published state,
/// never returned across `start`, and a subsequent `start` can succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The raw result was obtained but failed the contract's `is_data` check.
    /// Carries the ordered messages from `error_messages`.
    #[error("contract rejected response: {}", messages.join("; "))]
    ContractRejected { messages: Vec<String> },

    /// The execution port failed before a raw result was obtained.
    #[error("transport failed: {0}")]
    TransportFailed(#[from] TransportError),
}

impl QueryError {
    /// True when the query got a response that the contract classified as invalid.
    pub fn is_contract_rejection(&self) -> bool {
        matches!(self, QueryError::ContractRejected { .. })
    }

    /// True when no raw result was ever obtained.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, QueryError::TransportFailed(_))
    }
}
