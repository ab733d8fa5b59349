//! Query lifecycle engine.
//!
//! Owns the per-pass state machine and the three observable containers
//! (data, error, status), drives the execution port, invokes the contract and
//! the derivation pipeline, and publishes the outcome. One pass is
//! `start → execute → validate → (derive) → publish`; expected failures are
//! absorbed into published state, never returned to the caller of `start`.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::contract::Contract;
use crate::error::QueryError;
use crate::mapper::{MapContext, Mapper};
use crate::request::RequestDescriptor;
use crate::transport::{ExecutionPort, HttpTransport, RawResponse};

/// Per-pass state machine: `Idle → Pending → {Done | Failed}`.
///
/// `Idle` is the initial and only resting state before any start. `Pending`
/// is exited exactly once per pass; a subsequent `start` re-enters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Pending,
    Done,
    Failed,
}

/// Policy for passes whose port calls overlap.
///
/// A new `start` never aborts an in-flight port call; the policy only decides
/// which settlement is allowed to write the published containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyPolicy {
    /// Whichever port call settles last writes the containers, even if it was
    /// not the most recently started call.
    #[default]
    LastSettlementWins,

    /// A settlement is discarded without publishing when a newer pass has
    /// started since. The stale call's I/O still runs to completion.
    CancelStale,
}

/// A declarative remote JSON query.
///
/// Construction wires the request descriptor, contract, optional derivation
/// and transport together; [`JsonQuery::start`] runs one pass and publishes
/// the outcome to the data, error and status containers.
pub struct JsonQuery {
    request: RequestDescriptor,
    contract: Arc<dyn Contract>,
    map_data: Option<Mapper>,
    port: Arc<dyn ExecutionPort>,
    policy: ConcurrencyPolicy,
    pass_seq: AtomicU64,
    data_tx: watch::Sender<Option<Value>>,
    error_tx: watch::Sender<Option<QueryError>>,
    status_tx: watch::Sender<QueryStatus>,
}

impl JsonQuery {
    pub fn builder<C>(request: RequestDescriptor, contract: C) -> JsonQueryBuilder
    where
        C: Contract + 'static,
    {
        JsonQueryBuilder {
            request,
            contract: Arc::new(contract),
            map_data: None,
            port: None,
            policy: ConcurrencyPolicy::default(),
        }
    }

    /// Run one execution pass with an optional caller parameter.
    ///
    /// Repeated and overlapping calls are allowed; see [`ConcurrencyPolicy`]
    /// for which settlement publishes. Contract rejections and transport
    /// failures are published to the error container, not returned.
    pub async fn start(&self, params: Option<Value>) {
        let pass = self.pass_seq.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(pass, url = %self.request.url, "query pass started");
        self.status_tx.send_replace(QueryStatus::Pending);

        let outcome = self.port.execute(&self.request, params.as_ref()).await;

        if self.is_stale(pass) {
            debug!(pass, "discarding stale settlement");
            return;
        }

        match outcome {
            Ok(response) => self.settle(pass, response, params.as_ref()),
            Err(transport_err) => {
                warn!(pass, error = %transport_err, "transport failed");
                self.error_tx
                    .send_replace(Some(QueryError::TransportFailed(transport_err)));
                self.status_tx.send_replace(QueryStatus::Failed);
            }
        }
    }

    /// Return all three containers to their initial values.
    pub fn reset(&self) {
        self.data_tx.send_replace(None);
        self.error_tx.send_replace(None);
        self.status_tx.send_replace(QueryStatus::Idle);
    }

    /// Latest published data, if any pass has succeeded.
    pub fn data(&self) -> Option<Value> {
        self.data_tx.borrow().clone()
    }

    /// Latest published error, if the most recent completed pass failed.
    pub fn error(&self) -> Option<QueryError> {
        self.error_tx.borrow().clone()
    }

    pub fn status(&self) -> QueryStatus {
        *self.status_tx.borrow()
    }

    /// Observe the data container.
    pub fn subscribe_data(&self) -> watch::Receiver<Option<Value>> {
        self.data_tx.subscribe()
    }

    /// Observe the error container.
    pub fn subscribe_error(&self) -> watch::Receiver<Option<QueryError>> {
        self.error_tx.subscribe()
    }

    /// Observe status transitions.
    pub fn subscribe_status(&self) -> watch::Receiver<QueryStatus> {
        self.status_tx.subscribe()
    }

    fn is_stale(&self, pass: u64) -> bool {
        self.policy == ConcurrencyPolicy::CancelStale
            && pass != self.pass_seq.load(Ordering::SeqCst)
    }

    /// Validate, derive and publish one settled response. Runs synchronously
    /// on resumption of the port call.
    fn settle(&self, pass: u64, response: RawResponse, params: Option<&Value>) {
        if !self.contract.is_data(&response.raw) {
            let messages = self.contract.error_messages(&response.raw);
            warn!(pass, count = messages.len(), "contract rejected response");
            self.error_tx
                .send_replace(Some(QueryError::ContractRejected { messages }));
            self.status_tx.send_replace(QueryStatus::Failed);
            return;
        }

        let ctx = MapContext {
            result: &response.raw,
            params,
            meta: &response.meta,
        };
        let data = match &self.map_data {
            Some(mapper) => mapper.apply(&ctx),
            None => response.raw.clone(),
        };

        debug!(pass, "query pass done");
        self.data_tx.send_replace(Some(data));
        self.error_tx.send_replace(None);
        self.status_tx.send_replace(QueryStatus::Done);
    }
}

/// Builder for [`JsonQuery`].
pub struct JsonQueryBuilder {
    request: RequestDescriptor,
    contract: Arc<dyn Contract>,
    map_data: Option<Mapper>,
    port: Option<Arc<dyn ExecutionPort>>,
    policy: ConcurrencyPolicy,
}

impl JsonQueryBuilder {
    /// Configure a derivation pipeline applied to each validated result.
    pub fn map_data(mut self, mapper: Mapper) -> Self {
        self.map_data = Some(mapper);
        self
    }

    /// Inject the execution port. Defaults to [`HttpTransport`] when omitted.
    pub fn transport(mut self, port: Arc<dyn ExecutionPort>) -> Self {
        self.port = Some(port);
        self
    }

    pub fn concurrency(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<JsonQuery, crate::error::TransportError> {
        let port = match self.port {
            Some(port) => port,
            None => Arc::new(HttpTransport::new()?),
        };

        let (data_tx, _) = watch::channel(None);
        let (error_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(QueryStatus::Idle);

        Ok(JsonQuery {
            request: self.request,
            contract: self.contract,
            map_data: self.map_data,
            port,
            policy: self.policy,
            pass_seq: AtomicU64::new(0),
            data_tx,
            error_tx,
            status_tx,
        })
    }
}
