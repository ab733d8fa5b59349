//! Derivation pipeline: turns a validated raw result into published data.
//!
//! Two mutually exclusive shapes, dispatched explicitly by the engine: a
//! plain transform of the pass's inputs, or a transform that additionally
//! reads one external live value as a snapshot at derivation time. Keeping
//! the source read explicit avoids an implicit subscription that would re-run
//! the derivation on every source tick.

use serde_json::Value;
use std::sync::Arc;

use crate::source::SourceRef;
use crate::transport::ResponseMeta;

/// Inputs of one derivation invocation.
///
/// `result` is the validated raw result, `params` the value supplied to
/// `start`, `meta` the response metadata extracted by the execution port.
pub struct MapContext<'a> {
    pub result: &'a Value,
    pub params: Option<&'a Value>,
    pub meta: &'a ResponseMeta,
}

/// Plain transform: pure function of the pass's inputs.
pub type StaticMapFn = Box<dyn Fn(&MapContext<'_>) -> Value + Send + Sync>;

/// Source-bound transform: also receives a snapshot of the external source.
pub type SourcedMapFn = Box<dyn Fn(&MapContext<'_>, &Value) -> Value + Send + Sync>;

/// Configured derivation shape.
pub enum Mapper {
    /// Pure function of `{result, params, meta}`, invoked synchronously once
    /// per successful pass.
    Static(StaticMapFn),

    /// Function of the pass's inputs plus one snapshot of `source`, taken at
    /// derivation time. Never re-invoked because `source` changed on its own.
    SourceBound {
        source: Arc<dyn SourceRef>,
        map: SourcedMapFn,
    },
}

impl Mapper {
    pub fn static_fn<F>(map: F) -> Self
    where
        F: Fn(&MapContext<'_>) -> Value + Send + Sync + 'static,
    {
        Mapper::Static(Box::new(map))
    }

    pub fn source_bound<S, F>(source: S, map: F) -> Self
    where
        S: SourceRef + 'static,
        F: Fn(&MapContext<'_>, &Value) -> Value + Send + Sync + 'static,
    {
        Mapper::SourceBound {
            source: Arc::new(source),
            map: Box::new(map),
        }
    }

    /// Run the derivation for one pass. Reads the source exactly once.
    pub(crate) fn apply(&self, ctx: &MapContext<'_>) -> Value {
        match self {
            Mapper::Static(map) => map(ctx),
            Mapper::SourceBound { source, map } => {
                let snapshot = source.snapshot();
                map(ctx, &snapshot)
            }
        }
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mapper::Static(_) => f.write_str("Mapper::Static"),
            Mapper::SourceBound { .. } => f.write_str("Mapper::SourceBound"),
        }
    }
}
