use std::sync::Arc;

use dashmap::DashMap;
use keel_cache::{CacheError, CachePool};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::MappingError;
use crate::mapping::{connection_key, ClassMetadata, EntitiesConnection};

const METADATA_PREFIX: &str = "metadata.";
const CONNECTION_PREFIX: &str = "connection.";
const CLASS_INDEX_KEY: &str = "classes";

/// Store of compiled class metadata and entity connections.
///
/// Entries are persisted as JSON in a [`CachePool`] and memoized in process.
/// A file-backed pool lets a restarted process skip compilation entirely.
///
/// Writes are not atomic across keys: two processes compiling against the
/// same persistent pool may interleave, and the last write wins.
pub struct SchemaRegistry {
    pool: CachePool,
    classes: DashMap<String, Arc<ClassMetadata>>,
    connections: DashMap<String, Arc<EntitiesConnection>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("namespace", &self.pool.namespace())
            .field("memoized_classes", &self.classes.len())
            .finish()
    }
}

impl SchemaRegistry {
    pub fn new(pool: CachePool) -> Self {
        Self {
            pool,
            classes: DashMap::new(),
            connections: DashMap::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(CachePool::in_memory("orm"))
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let item = self.pool.get_item(key);
        let bytes = item.get()?;
        match serde_json::from_slice(bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "Discarding unreadable metadata cache entry");
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value).map_err(|err| CacheError::Encode {
            key: key.to_string(),
            message: err.to_string(),
        })?;
        let mut item = self.pool.get_item(key);
        item.set(bytes);
        self.pool.save(&item)
    }

    pub fn has_class_metadata(&self, class: &str) -> bool {
        self.get_class_metadata(class).is_some()
    }

    pub fn get_class_metadata(&self, class: &str) -> Option<Arc<ClassMetadata>> {
        if let Some(hit) = self.classes.get(class) {
            return Some(hit.value().clone());
        }
        let metadata: ClassMetadata = self.load(&format!("{METADATA_PREFIX}{class}"))?;
        let metadata = Arc::new(metadata);
        self.classes.insert(class.to_string(), metadata.clone());
        Some(metadata)
    }

    /// Metadata of a class, failing when it was never compiled.
    pub fn entity(&self, class: &str) -> Result<Arc<ClassMetadata>, MappingError> {
        self.get_class_metadata(class)
            .ok_or_else(|| MappingError::EntityNotRegistered(class.to_string()))
    }

    pub fn set_class_metadata(&self, metadata: ClassMetadata) -> Result<Arc<ClassMetadata>, CacheError> {
        let class = metadata.class_name().to_string();
        self.store(&format!("{METADATA_PREFIX}{class}"), &metadata)?;

        let mut names = self.class_names();
        if !names.contains(&class) {
            names.push(class.clone());
            self.store(CLASS_INDEX_KEY, &names)?;
        }

        let metadata = Arc::new(metadata);
        self.classes.insert(class, metadata.clone());
        Ok(metadata)
    }

    /// Names of every class with stored metadata, in insertion order.
    pub fn class_names(&self) -> Vec<String> {
        self.load(CLASS_INDEX_KEY).unwrap_or_default()
    }

    pub fn get_all_class_metadata(&self) -> Vec<Arc<ClassMetadata>> {
        self.class_names()
            .iter()
            .filter_map(|class| self.get_class_metadata(class))
            .collect()
    }

    pub fn has_entities_connection<S: AsRef<str>>(&self, classes: &[S]) -> bool {
        self.get_entities_connection(classes).is_some()
    }

    pub fn get_entities_connection<S: AsRef<str>>(&self, classes: &[S]) -> Option<Arc<EntitiesConnection>> {
        let key = connection_key(classes);
        if let Some(hit) = self.connections.get(&key) {
            return Some(hit.value().clone());
        }
        let connection: EntitiesConnection = self.load(&format!("{CONNECTION_PREFIX}{key}"))?;
        let connection = Arc::new(connection);
        self.connections.insert(key, connection.clone());
        Some(connection)
    }

    pub fn set_entities_connection(&self, connection: EntitiesConnection) -> Result<(), CacheError> {
        let key = connection.key();
        self.store(&format!("{CONNECTION_PREFIX}{key}"), &connection)?;
        self.connections.insert(key, Arc::new(connection));
        Ok(())
    }

    /// Forget everything, in memory and in the backing pool.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.classes.clear();
        self.connections.clear();
        self.pool.clear()
    }
}
