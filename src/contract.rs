//! Response contracts: pluggable classification of raw results.
//!
//! A contract decides whether a raw response is valid data and, when it is
//! not, extracts human-readable error messages. The validation pipeline lives
//! in the engine; implementations are supplied by the caller.

use serde_json::Value;

/// Classifies a raw result as data or error.
///
/// `is_data` must be total: a panicking contract is a defect, not a modeled
/// error path. `error_messages` is invoked only when `is_data` returned false
/// and must return messages in a stable order.
pub trait Contract: Send + Sync {
    fn is_data(&self, raw: &Value) -> bool;

    fn error_messages(&self, raw: &Value) -> Vec<String>;
}

/// Contract that accepts every raw value as data.
///
/// Useful when the response shape is unknown or validated downstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownContract;

impl Contract for UnknownContract {
    fn is_data(&self, _raw: &Value) -> bool {
        true
    }

    fn error_messages(&self, _raw: &Value) -> Vec<String> {
        Vec::new()
    }
}
