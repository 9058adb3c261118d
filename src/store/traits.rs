//! `KeyValueStore` trait — the durable per-profile string store.
//!
//! Mirrors the browser's local storage: string keys, string values, no
//! transactions, no cross-tab coordination.

use crate::error::StoreError;

/// Backend-agnostic durable key-value store.
///
/// Reads never fail; a backend that cannot produce a value reports `None`.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
