//! Execution port: the injectable transport behind a query.
//!
//! The engine never performs I/O itself; it hands the request descriptor and
//! the caller parameter to an [`ExecutionPort`] and consumes the raw response
//! plus metadata the port returns. Ports are constructor-injected so multiple
//! engines can run concurrently with independent transports. [`HttpTransport`]
//! is the default reqwest-backed implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::error::TransportError;
use crate::request::{HttpMethod, RequestDescriptor};

/// Side-channel information extracted from the raw response by the port.
/// Attached to the outcome but never validated by the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub status: Option<u16>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Raw response of one execution: the untyped result plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub raw: Value,
    pub meta: ResponseMeta,
}

/// Asynchronous operation performing the actual request/response transport.
///
/// Must settle exactly once per invocation; a failed settlement is surfaced
/// by the engine as a transport failure, distinct from a contract rejection.
#[async_trait]
pub trait ExecutionPort: Send + Sync {
    async fn execute(
        &self,
        request: &RequestDescriptor,
        params: Option<&Value>,
    ) -> Result<RawResponse, TransportError>;
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// Helper function to map reqwest errors to TransportError
fn map_http_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::ConnectionFailed(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

/// Default reqwest-backed execution port.
///
/// Non-success statuses are transport failures: the contract only ever sees
/// bodies of successful responses. Caller parameters flow as query pairs for
/// GET requests and as the JSON body for other methods when the descriptor
/// carries no static body.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(&HttpTransportConfig::default())
    }

    pub fn with_config(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::Other(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn build_request(
        &self,
        request: &RequestDescriptor,
        params: Option<&Value>,
    ) -> reqwest::RequestBuilder {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        match (request.method, params) {
            (HttpMethod::Get, Some(Value::Object(map))) => {
                let pairs: Vec<(String, String)> = map
                    .iter()
                    .map(|(k, v)| {
                        let rendered = match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), rendered)
                    })
                    .collect();
                builder = builder.query(&pairs);
            }
            (method, Some(value)) if method != HttpMethod::Get && request.body.is_none() => {
                builder = builder.json(value);
            }
            _ => {}
        }

        builder
    }
}

#[async_trait]
impl ExecutionPort for HttpTransport {
    async fn execute(
        &self,
        request: &RequestDescriptor,
        params: Option<&Value>,
    ) -> Result<RawResponse, TransportError> {
        debug!(url = %request.url, method = request.method.as_str(), "executing request");

        let response = self
            .build_request(request, params)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidBody(e.to_string()))?;

        Ok(RawResponse {
            raw,
            meta: ResponseMeta {
                status: Some(status.as_u16()),
                headers,
            },
        })
    }
}
