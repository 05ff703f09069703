//! # keel-cache: cache providers for Keel
//!
//! A small key-value cache layer used by the ORM to keep compiled schema
//! metadata across calls (in memory) or across process restarts (filesystem).
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CacheStore`] | Pluggable byte-level backend trait |
//! | [`InMemoryStore`] | `DashMap`-backed store, lives as long as the process |
//! | [`FileStore`] | One file per key under a directory, survives restarts |
//! | [`CachePool`] | Namespaced item API (`get_item` / `save`) over any store |
//! | [`CacheItem`] | A looked-up entry: hit flag plus value |

use bytes::Bytes;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod file;

pub use file::FileStore;

/// Errors raised by cache backends on write paths.
///
/// Reads never fail: an unreadable entry is reported as a miss.
#[derive(Debug)]
pub enum CacheError {
    Io { path: PathBuf, source: std::io::Error },
    /// A value could not be encoded into bytes for storage.
    Encode { key: String, message: String },
    /// A key the backend cannot address, such as an empty key on a file store.
    InvalidKey(String),
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Io { path, source } => {
                write!(f, "Cache I/O error at {}: {source}", path.display())
            }
            CacheError::Encode { key, message } => {
                write!(f, "Cannot encode cache entry '{key}': {message}")
            }
            CacheError::InvalidKey(key) => write!(f, "Invalid cache key '{key}'"),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io { source, .. } => Some(source),
            CacheError::Encode { .. } | CacheError::InvalidKey(_) => None,
        }
    }
}

/// Pluggable cache backend trait.
///
/// Implement this to keep metadata in Redis, Memcached, a shared volume, etc.
pub trait CacheStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<Bytes>;
    fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
    fn clear(&self) -> Result<(), CacheError>;
    fn remove_by_prefix(&self, prefix: &str) -> Result<(), CacheError>;
}

/// Default in-memory cache store backed by `DashMap`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<DashMap<String, Bytes>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl CacheStore for InMemoryStore {
    fn get(&self, key: &str) -> Option<Bytes> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.inner.clear();
        Ok(())
    }

    fn remove_by_prefix(&self, prefix: &str) -> Result<(), CacheError> {
        self.inner.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

/// A single looked-up cache entry.
///
/// Obtained from [`CachePool::get_item`]; modify it with [`CacheItem::set`]
/// and persist it with [`CachePool::save`].
#[derive(Debug, Clone)]
pub struct CacheItem {
    key: String,
    value: Option<Bytes>,
    hit: bool,
}

impl CacheItem {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the entry existed in the store when it was looked up.
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub fn get(&self) -> Option<&Bytes> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: impl Into<Bytes>) -> &mut Self {
        self.value = Some(value.into());
        self
    }
}

/// Namespaced view over a [`CacheStore`].
///
/// Every key handed to the pool is prefixed with `"{namespace}."` before it
/// reaches the backend, so several pools can share one store.
#[derive(Clone)]
pub struct CachePool {
    store: Arc<dyn CacheStore>,
    namespace: String,
}

impl CachePool {
    pub fn new(store: Arc<dyn CacheStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// A pool over a fresh [`InMemoryStore`].
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), namespace)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}.{key}", self.namespace)
    }

    pub fn get_item(&self, key: &str) -> CacheItem {
        let value = self.store.get(&self.full_key(key));
        CacheItem {
            key: key.to_string(),
            hit: value.is_some(),
            value,
        }
    }

    pub fn has_item(&self, key: &str) -> bool {
        self.store.get(&self.full_key(key)).is_some()
    }

    /// Persist an item. Items without a value are removed from the store.
    pub fn save(&self, item: &CacheItem) -> Result<(), CacheError> {
        let key = self.full_key(&item.key);
        match &item.value {
            Some(value) => self.store.set(&key, value.clone()),
            None => self.store.remove(&key),
        }
    }

    pub fn delete_item(&self, key: &str) -> Result<(), CacheError> {
        self.store.remove(&self.full_key(key))
    }

    /// Remove every entry of this pool's namespace.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.store.remove_by_prefix(&format!("{}.", self.namespace))
    }
}
