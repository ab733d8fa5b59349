//! Read-only references to external live values.
//!
//! A source is owned by some other part of the system; the query engine only
//! takes a snapshot of it at the moment a derivation runs. There is no
//! subscription: a source changing on its own never re-runs a derivation.

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot-on-demand read of an external live value.
pub trait SourceRef: Send + Sync {
    /// Read the current value. Called exactly once per derivation.
    fn snapshot(&self) -> Value;
}

/// Shared mutable value usable as a source.
///
/// The owner writes through [`SharedValue::set`]; the engine only reads.
#[derive(Debug, Clone, Default)]
pub struct SharedValue {
    inner: Arc<RwLock<Value>>,
}

impl SharedValue {
    pub fn new(value: Value) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    pub fn set(&self, value: Value) {
        *self.inner.write() = value;
    }

    pub fn get(&self) -> Value {
        self.inner.read().clone()
    }
}

impl SourceRef for SharedValue {
    fn snapshot(&self) -> Value {
        self.get()
    }
}

/// Values already published through a watch channel can feed derivations
/// directly.
impl SourceRef for watch::Receiver<Value> {
    fn snapshot(&self) -> Value {
        self.borrow().clone()
    }
}
