//! # Storage Layer
//!
//! All persistence goes through an async key → JSON map. Two key shapes
//! exist and no others:
//!
//! ```text
//! exposition_<expositionId>                 Exposition record
//! suggestions_<expositionId>_<weaveId>      { toolId: [Suggestion, ...] }
//! ```
//!
//! ## Layers
//!
//! - [`backend::StorageBackend`]: raw I/O (get/set/remove/keys of JSON values).
//! - [`JsonStore`]: typed access plus serialized read-modify-write.
//!
//! ## Serialized Updates
//!
//! Every mutation in the repository is a read → modify → write of a whole
//! record. Two such sequences interleaving on the same key would lose the
//! earlier write (e.g. a page re-enumeration racing a manual save), so
//! [`JsonStore::update`] holds a per-key async mutex for the whole sequence.
//! Operations on different keys still run independently.
//!
//! An operation that must keep several records consistent opens a
//! [`Transaction`] over all of them. Locks are taken in sorted key order, so
//! two transactions can never wait on each other in a cycle. Writes are
//! staged and applied on commit; when one write fails, the ones already
//! applied are put back to their previous values.
//!
//! Lock entries are dropped from the lock table as soon as nobody holds or
//! waits on them.
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: one JSON file per key, atomic writes.
//! - [`mem_backend::MemBackend`]: for testing logic without filesystem I/O.

use crate::error::{MarginError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;

use backend::StorageBackend;

type KeyLock = Arc<tokio::sync::Mutex<()>>;

pub struct JsonStore<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: B,
    locks: Mutex<HashMap<String, KeyLock>>,
}

impl<B: StorageBackend> JsonStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn lock_key(&self, key: &str) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.to_string()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;
        KeyGuard {
            locks: &self.locks,
            key: key.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    /// Number of keys with a live lock entry.
    pub(crate) fn lock_table_len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Lock every key in `keys` for a multi-record update.
    pub async fn transaction<S: AsRef<str>>(&self, keys: &[S]) -> Transaction<'_, B> {
        let mut sorted: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in &sorted {
            guards.push(self.lock_key(key).await);
        }
        Transaction {
            store: self,
            _guards: guards,
            keys: sorted,
            staged: Vec::new(),
        }
    }

    /// Read and decode the record under `key`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the record under `key`.
    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let _guard = self.lock_key(key).await;
        self.backend.set(key, serde_json::to_value(value)?).await
    }

    /// Serialized read-modify-write of the record under `key`.
    ///
    /// `apply` receives the current record (if any) and returns the record to
    /// store along with a result for the caller. When `apply` fails nothing
    /// is written.
    pub async fn update<T, R, F>(&self, key: &str, apply: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> Result<(T, R)>,
    {
        let _guard = self.lock_key(key).await;

        let current = self.load::<T>(key).await?;
        let (next, result) = apply(current)?;
        self.backend.set(key, serde_json::to_value(&next)?).await?;

        tracing::debug!(key = %key, "record updated");
        Ok(result)
    }

    /// Like [`JsonStore::update`], but leaves a missing record missing.
    pub async fn update_if_present<T, R, F>(&self, key: &str, apply: F) -> Result<Option<R>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(T) -> Result<(T, R)>,
    {
        let _guard = self.lock_key(key).await;

        let Some(current) = self.load::<T>(key).await? else {
            return Ok(None);
        };
        let (next, result) = apply(current)?;
        self.backend.set(key, serde_json::to_value(&next)?).await?;

        tracing::debug!(key = %key, "record updated");
        Ok(Some(result))
    }

    /// All stored keys starting with `prefix`.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .backend
            .keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

/// Holds one key's lock; removes the lock entry when it was the last user.
struct KeyGuard<'a> {
    locks: &'a Mutex<HashMap<String, KeyLock>>,
    key: String,
    lock: KeyLock,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the table, one here: nobody else holds or waits.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

/// Several records locked together, written on [`Transaction::commit`].
pub struct Transaction<'a, B: StorageBackend> {
    store: &'a JsonStore<B>,
    _guards: Vec<KeyGuard<'a>>,
    keys: Vec<String>,
    staged: Vec<(String, Value)>,
}

impl<B: StorageBackend> Transaction<'_, B> {
    fn check_locked(&self, key: &str) -> Result<()> {
        if self.keys.binary_search_by(|k| k.as_str().cmp(key)).is_err() {
            return Err(MarginError::Storage(format!(
                "key `{}` is not part of the transaction",
                key
            )));
        }
        Ok(())
    }

    /// Read a locked record as currently stored.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.check_locked(key)?;
        self.store.load(key).await
    }

    /// Queue a write of `value` under the locked `key`.
    pub fn stage<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        self.check_locked(key)?;
        let value = serde_json::to_value(value)?;
        self.staged.retain(|(k, _)| k != key);
        self.staged.push((key.to_string(), value));
        Ok(())
    }

    /// Apply staged writes in staging order.
    ///
    /// On a failed write, records already written are restored and the
    /// original error is returned.
    pub async fn commit(self) -> Result<()> {
        let backend = &self.store.backend;
        let mut applied: Vec<(String, Option<Value>)> = Vec::new();

        for (key, value) in &self.staged {
            let previous = match backend.get(key).await {
                Ok(previous) => previous,
                Err(e) => {
                    rollback(backend, applied).await;
                    return Err(e);
                }
            };
            if let Err(e) = backend.set(key, value.clone()).await {
                rollback(backend, applied).await;
                return Err(e);
            }
            applied.push((key.clone(), previous));
        }

        tracing::debug!(keys = ?self.keys, "transaction committed");
        Ok(())
    }
}

async fn rollback<B: StorageBackend>(backend: &B, applied: Vec<(String, Option<Value>)>) {
    for (key, previous) in applied.into_iter().rev() {
        let restored = match previous {
            Some(value) => backend.set(&key, value).await,
            None => backend.remove(&key).await,
        };
        match restored {
            Ok(()) => tracing::warn!(key = %key, "write rolled back"),
            Err(e) => tracing::error!(key = %key, error = %e, "rollback failed"),
        }
    }
}
