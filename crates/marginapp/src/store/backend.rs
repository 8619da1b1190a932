use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Abstract interface for raw key/value storage I/O.
///
/// This trait handles the "how" of storage (filesystem vs memory), while
/// [`super::JsonStore`] handles typed access and per-key serialization.
/// Values are arbitrary JSON documents; keys are opaque strings.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`.
    /// Returns Ok(None) if nothing is stored there.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    /// MUST be atomic: readers see either the old or the new value.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored.
    async fn keys(&self) -> Result<Vec<String>>;
}
