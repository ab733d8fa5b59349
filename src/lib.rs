//! Remora: Declarative Remote JSON Queries
//!
//! A declarative engine for remote data queries: describe the request once,
//! plug in a transport, validate responses against a contract, optionally
//! derive application data from them, and observe the outcome through three
//! independent state containers (data, error, status).

pub mod contract;
pub mod error;
pub mod logging;
pub mod mapper;
pub mod query;
pub mod request;
pub mod source;
pub mod transport;
