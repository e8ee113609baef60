//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON values in insertion order, behind async-safe read-write
//! locks. Index lookups are linear scans: declaring an index only records which lookups
//! are allowed, it does not build a structure.

use std::{collections::{HashMap, HashSet}, sync::Arc};
use async_trait::async_trait;
use indexmap::IndexMap;
use mea::rwlock::RwLock;
use bson::{Uuid, Bson};
use tracing::{debug, trace};

use doclink_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    schema::{CREATION_INDEX, IndexDef},
};

use crate::matcher::FieldMatcher;

/// Prefix marking reserved system collections unless configured otherwise.
pub const DEFAULT_SYSTEM_PREFIX: &str = "_";

type CollectionMap = IndexMap<Uuid, Bson>;
type StoreMap = HashMap<String, CollectionMap>;
type IndexRegistry = HashMap<String, Vec<IndexDef>>;


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses `Arc`-wrapped internal state; clones share the
/// same data.
///
/// Collections whose name starts with the system prefix (`_` by default, e.g. `_storage`)
/// are reserved: [`get_document`](StoreBackend::get_document) never sees them and
/// [`system_get`](StoreBackend::system_get) sees nothing else.
///
/// # Example
///
/// ```ignore
/// use doclink_memory::InMemoryStore;
/// use doclink::{backend::StoreBackend, schema::IndexDef};
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
/// store.add_index("users", IndexDef::new("token", ["token"])).await?;
///
/// let id = Uuid::new();
/// store.insert_documents(vec![(id, Bson::Document(doc! { "token": "a" }))], "users").await?;
///
/// let found = store.query_index("users", "token", "token", Bson::from("a")).await?;
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (document id -> document), in insertion order
    store: Arc<RwLock<StoreMap>>,
    /// collection name -> declared user indexes
    indexes: Arc<RwLock<IndexRegistry>>,
    system_prefix: Arc<str>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::with_parts(IndexRegistry::new(), DEFAULT_SYSTEM_PREFIX)
    }

    fn with_parts(indexes: IndexRegistry, system_prefix: &str) -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            indexes: Arc::new(RwLock::new(indexes)),
            system_prefix: Arc::from(system_prefix),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use doclink_memory::InMemoryStore;
    ///
    /// let store = InMemoryStore::builder()
    ///     .with_index("edges", IndexDef::new("user_id", ["user_id"]))
    ///     .build()
    ///     .await?;
    /// ```
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Returns `true` if `collection` is a reserved system collection.
    pub fn is_system_collection(&self, collection: &str) -> bool {
        collection.starts_with(&*self.system_prefix)
    }

    async fn find(&self, id: Uuid, collection: &str) -> Option<Bson> {
        self.store
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.get(&id))
            .cloned()
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        // Ids already stored or repeated within the batch.
        let mut seen = HashSet::with_capacity(documents.len());
        if let Some((id, _)) = documents
            .iter()
            .find(|(id, _)| collection_map.contains_key(id) || !seen.insert(*id))
        {
            return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
        }

        debug!(collection, count = documents.len(), "inserting documents");

        collection_map.extend(documents);

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        if let Some((id, _)) = documents.iter().find(|(id, _)| !collection_map.contains_key(id)) {
            return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
        }

        debug!(collection, count = documents.len(), "updating documents");

        // Replacing through insert keeps each document's original position.
        collection_map.extend(documents);

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        if let Some(id) = ids.iter().find(|id| !collection_map.contains_key(*id)) {
            return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
        }

        debug!(collection, count = ids.len(), "deleting documents");

        for id in ids {
            collection_map.shift_remove(&id);
        }

        Ok(())
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        if self.is_system_collection(collection) {
            trace!(collection, %id, "primary get on a system collection");
            return Ok(None);
        }

        Ok(self.find(id, collection).await)
    }

    async fn system_get(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        if !self.is_system_collection(collection) {
            return Err(DocumentStoreError::ConstraintViolation(format!(
                "{} is not a system collection",
                collection
            )));
        }

        Ok(self.find(id, collection).await)
    }

    async fn query_index(
        &self,
        collection: &str,
        index: &str,
        field: &str,
        value: Bson,
    ) -> DocumentStoreResult<Vec<Bson>> {
        if index == CREATION_INDEX {
            return Err(DocumentStoreError::ConstraintViolation(format!(
                "{} orders documents and does not support equality lookups",
                CREATION_INDEX
            )));
        }

        {
            let indexes = self.indexes.read().await;
            let def = indexes
                .get(collection)
                .and_then(|defs| defs.iter().find(|def| def.name() == index))
                .ok_or_else(|| DocumentStoreError::IndexNotFound(index.to_string(), collection.to_string()))?;

            if !def.covers(field) {
                return Err(DocumentStoreError::ConstraintViolation(format!(
                    "index {} on {} does not declare field {}",
                    index, collection, field
                )));
            }
        }

        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        let documents = FieldMatcher::new(field, &value).filter_documents(collection_map.values());

        trace!(collection, index, field, %value, matches = documents.len(), "scanned index");

        Ok(documents)
    }

    async fn add_index(&self, collection: &str, index: IndexDef) -> DocumentStoreResult<()> {
        index.validate()?;

        let mut indexes = self.indexes.write().await;
        let defs = indexes
            .entry(collection.to_string())
            .or_default();

        match defs.iter().find(|def| def.name() == index.name()) {
            Some(existing) if *existing == index => Ok(()),
            Some(_) => Err(DocumentStoreError::ConstraintViolation(format!(
                "index {} on {} already exists with different fields",
                index.name(),
                collection
            ))),
            None => {
                debug!(collection, index = index.name(), fields = ?index.fields(), "declaring index");
                defs.push(index);
                Ok(())
            }
        }
    }

    async fn drop_index(&self, collection: &str, index: &str) -> DocumentStoreResult<()> {
        let mut indexes = self.indexes.write().await;
        let defs = indexes
            .get_mut(collection)
            .ok_or_else(|| DocumentStoreError::IndexNotFound(index.to_string(), collection.to_string()))?;

        let position = defs
            .iter()
            .position(|def| def.name() == index)
            .ok_or_else(|| DocumentStoreError::IndexNotFound(index.to_string(), collection.to_string()))?;

        debug!(collection, index, "dropping index");
        defs.remove(position);

        Ok(())
    }

    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexDef>> {
        Ok(
            self.indexes
                .read()
                .await
                .get(collection)
                .cloned()
                .unwrap_or_default()
        )
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use doclink_memory::InMemoryStore;
/// use doclink::{backend::StoreBackendBuilder, schema::IndexDef};
///
/// let store = InMemoryStore::builder()
///     .with_index("users", IndexDef::new("token_identifier", ["token_identifier"]))
///     .with_system_prefix("sys_")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStoreBuilder {
    indexes: Vec<(String, IndexDef)>,
    system_prefix: String,
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self {
            indexes: Vec::new(),
            system_prefix: DEFAULT_SYSTEM_PREFIX.to_string(),
        }
    }
}

impl InMemoryStoreBuilder {
    /// Pre-declares an index on a collection.
    pub fn with_index(mut self, collection: impl Into<String>, index: IndexDef) -> Self {
        self.indexes.push((collection.into(), index));
        self
    }

    /// Sets the prefix that marks reserved system collections.
    pub fn with_system_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.system_prefix = prefix.into();
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds a new [`InMemoryStore`] with the configured indexes.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if an index is invalid, if two indexes
    /// of one collection share a name with different fields, or if the system prefix is
    /// empty.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        if self.system_prefix.is_empty() {
            return Err(DocumentStoreError::Initialization("system prefix must not be empty".to_string()));
        }

        let mut registry = IndexRegistry::new();

        for (collection, index) in self.indexes {
            index
                .validate()
                .map_err(|err| DocumentStoreError::Initialization(format!("{}: {}", collection, err)))?;

            let defs = registry.entry(collection.clone()).or_default();

            match defs.iter().find(|def| def.name() == index.name()) {
                Some(existing) if *existing == index => {}
                Some(_) => {
                    return Err(DocumentStoreError::Initialization(format!(
                        "index {} declared twice on {} with different fields",
                        index.name(),
                        collection
                    )));
                }
                None => defs.push(index),
            }
        }

        Ok(InMemoryStore::with_parts(registry, &self.system_prefix))
    }
}
