use super::backend::StorageBackend;
use crate::error::{MarginError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory storage backend for testing.
///
/// Uses a plain `Mutex` since no lock is ever held across an await point.
#[derive(Default)]
pub struct MemBackend {
    values: Mutex<BTreeMap<String, Value>>,
    simulate_write_error: AtomicBool,
    failing_prefix: Mutex<Option<String>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Fail writes only for keys starting with `prefix`; `None` clears it.
    pub fn set_failing_prefix(&self, prefix: Option<&str>) {
        *self.failing_prefix.lock().unwrap_or_else(|e| e.into_inner()) =
            prefix.map(str::to_string);
    }

    /// Test helper to read a raw value without going through the trait.
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Value>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(MarginError::Storage("Simulated write error".to_string()));
        }
        let failing = self.failing_prefix.lock().unwrap_or_else(|e| e.into_inner());
        if failing.as_deref().is_some_and(|p| key.starts_with(p)) {
            return Err(MarginError::Storage(format!("Simulated write error on {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.check_writable(key)?;
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}
