//! Host session layer contract and in-memory reference implementation.
//!
//! The core never talks to cookies, databases or HTTP machinery. It
//! consumes a request-scoped key-value store with an explicit commit point
//! and treats stored values as opaque bytes the host must round-trip
//! byte-for-byte.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use thiserror::Error;

/// Handle addressing one session slot within the host session layer.
///
/// Hosts running a single session per request use [`SlotHandle::Default`];
/// hosts multiplexing several named sessions address each by name. Every
/// store operation treats both modes uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotHandle {
    /// The host's single default session.
    Default,
    /// One of several named sessions.
    Named(String),
}

impl SlotHandle {
    /// Handle for a named session.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

/// Errors surfaced by the host session layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The backend could not serve the operation (transport or storage
    /// failure)
    #[error("session backend error: {0}")]
    Backend(String),
}

/// Request-scoped key-value store provided by the host.
///
/// `commit` is the explicit save point; backends with write-through
/// semantics may make it a no-op. Implementations must round-trip values
/// byte-for-byte between `set` and `get`, and are `Clone` so a handle can
/// be moved into a worker task; clones address the same backing session.
///
/// The host must provide request-level atomicity for the operations of one
/// slot: if two concurrent requests for the same session interleave
/// store/load/void, a second submission can load a key the first already
/// voided. That race is a caller responsibility, not solved here.
pub trait SessionStore: Clone + Send + Sync {
    /// Value stored under `field`, or `None` if absent.
    fn get(&self, slot: &SlotHandle, field: &str) -> Result<Option<Vec<u8>>, SessionError>;

    /// Store `value` under `field`, overwriting any previous value.
    fn set(&self, slot: &SlotHandle, field: &str, value: &[u8]) -> Result<(), SessionError>;

    /// Remove `field`. Removing an absent field is not an error.
    fn delete(&self, slot: &SlotHandle, field: &str) -> Result<(), SessionError>;

    /// Persist staged changes for `slot`.
    fn commit(&self, slot: &SlotHandle) -> Result<(), SessionError>;
}

/// In-memory session store for tests, demos and simulation.
///
/// `HashMap` per slot behind `Arc<Mutex<>>` so clones share one session.
/// Writes apply immediately and `commit` is a no-op; a durable backend
/// would stage writes and flush them there. Uses `lock().expect()` which
/// will panic if the mutex is poisoned - acceptable for test/demo code.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<HashMap<SlotHandle, HashMap<String, Vec<u8>>>>>,
}

impl MemorySessionStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields stored under `slot`.
    ///
    /// Useful for debugging and testing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned (a thread panicked while
    /// holding the lock). This is acceptable for test/demo code.
    #[allow(clippy::expect_used)]
    pub fn field_count(&self, slot: &SlotHandle) -> usize {
        self.inner.lock().expect("Mutex poisoned").get(slot).map_or(0, HashMap::len)
    }
}

impl SessionStore for MemorySessionStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test/demo code.
    #[allow(clippy::expect_used)]
    fn get(&self, slot: &SlotHandle, field: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.get(slot).and_then(|fields| fields.get(field).cloned()))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test/demo code.
    #[allow(clippy::expect_used)]
    fn set(&self, slot: &SlotHandle, field: &str, value: &[u8]) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.entry(slot.clone()).or_default().insert(field.to_string(), value.to_vec());
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for
    /// test/demo code.
    #[allow(clippy::expect_used)]
    fn delete(&self, slot: &SlotHandle, field: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        if let Some(fields) = inner.get_mut(slot) {
            fields.remove(field);
        }
        Ok(())
    }

    fn commit(&self, _slot: &SlotHandle) -> Result<(), SessionError> {
        Ok(())
    }
}
