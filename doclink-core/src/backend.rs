//! Storage backend abstraction for the document store.
//!
//! This module defines the traits that abstract over storage implementations. The
//! relation layer only reads through them; the mutating methods exist for the
//! application code that owns the data.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: An object-safe mirror for dynamic dispatch over backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use doclink::backend::StoreBackend;
//! use bson::{Uuid, Bson, doc};
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = Uuid::new();
//! backend.insert_documents(vec![(id, Bson::Document(doc! { "token": "a" }))], "users").await?;
//! backend.add_index("users", IndexDef::new("token", ["token"])).await?;
//!
//! let matches = backend.query_index("users", "token", "token", Bson::from("a")).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::{any::Any, fmt::Debug};

use crate::{error::DocumentStoreResult, schema::IndexDef};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Relation operations issue many reads concurrently against one backend.
///
/// # Consistency
///
/// A backend is assumed reliable and consistent within a single call. Identifiers are
/// never reused after deletion.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// # Arguments
    ///
    /// * `documents` - A vector of (UUID, BSON document) pairs to insert
    /// * `collection` - The name of the collection to insert into. Created automatically if it doesn't exist.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Replaces existing documents in a collection.
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Deletes documents from a collection by their IDs.
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()>;

    /// Retrieves a document from an ordinary collection.
    ///
    /// Returns `Ok(None)` if the document does not exist. Reserved collections are not
    /// reachable through this method; see [`system_get`](StoreBackend::system_get).
    async fn get_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>>;

    /// Retrieves a document from a reserved system collection.
    ///
    /// Returns `Ok(None)` if the document does not exist.
    async fn system_get(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>>;

    /// Returns the documents of `collection` whose `field` equals `value`, scanning the
    /// named index.
    ///
    /// Results are in index-scan order. Documents without the field never match.
    ///
    /// # Errors
    ///
    /// Backends should return [`IndexNotFound`](crate::error::DocumentStoreError::IndexNotFound)
    /// for an undeclared index and
    /// [`ConstraintViolation`](crate::error::DocumentStoreError::ConstraintViolation) when the
    /// index does not declare `field`.
    async fn query_index(
        &self,
        collection: &str,
        index: &str,
        field: &str,
        value: Bson,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Declares an index on a collection. Re-declaring an identical index is a no-op.
    async fn add_index(&self, collection: &str, index: IndexDef) -> DocumentStoreResult<()>;

    /// Removes an index from a collection.
    async fn drop_index(&self, collection: &str, index: &str) -> DocumentStoreResult<()>;

    /// Lists the user-declared indexes of a collection (never the implicit creation index).
    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexDef>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::insert_documents(*self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::update_documents(*self, documents, collection).await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        StoreBackend::delete_documents(*self, ids, collection).await
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        StoreBackend::get_document(*self, id, collection).await
    }

    async fn system_get(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        StoreBackend::system_get(*self, id, collection).await
    }

    async fn query_index(
        &self,
        collection: &str,
        index: &str,
        field: &str,
        value: Bson,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::query_index(*self, collection, index, field, value).await
    }

    async fn add_index(&self, collection: &str, index: IndexDef) -> DocumentStoreResult<()> {
        StoreBackend::add_index(*self, collection, index).await
    }

    async fn drop_index(&self, collection: &str, index: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_index(*self, collection, index).await
    }

    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexDef>> {
        StoreBackend::list_indexes(*self, collection).await
    }
}

/// Object-safe mirror of [`StoreBackend`], implemented for every backend.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()>;
    async fn get_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>>;
    async fn system_get(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>>;
    async fn query_index(
        &self,
        collection: &str,
        index: &str,
        field: &str,
        value: Bson,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn add_index(&self, collection: &str, index: IndexDef) -> DocumentStoreResult<()>;
    async fn drop_index(&self, collection: &str, index: &str) -> DocumentStoreResult<()>;
    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexDef>>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::insert_documents(self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::update_documents(self, documents, collection).await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        StoreBackend::delete_documents(self, ids, collection).await
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        StoreBackend::get_document(self, id, collection).await
    }

    async fn system_get(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        StoreBackend::system_get(self, id, collection).await
    }

    async fn query_index(
        &self,
        collection: &str,
        index: &str,
        field: &str,
        value: Bson,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::query_index(self, collection, index, field, value).await
    }

    async fn add_index(&self, collection: &str, index: IndexDef) -> DocumentStoreResult<()> {
        StoreBackend::add_index(self, collection, index).await
    }

    async fn drop_index(&self, collection: &str, index: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_index(self, collection, index).await
    }

    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexDef>> {
        StoreBackend::list_indexes(self, collection).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A boxed dynamic backend is itself a backend, which lets every generic API (including
/// the relation operations) run against a backend chosen at runtime.
#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        DynStoreBackend::insert_documents(&**self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        DynStoreBackend::update_documents(&**self, documents, collection).await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::delete_documents(&**self, ids, collection).await
    }

    async fn get_document(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        DynStoreBackend::get_document(&**self, id, collection).await
    }

    async fn system_get(&self, id: Uuid, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        DynStoreBackend::system_get(&**self, id, collection).await
    }

    async fn query_index(
        &self,
        collection: &str,
        index: &str,
        field: &str,
        value: Bson,
    ) -> DocumentStoreResult<Vec<Bson>> {
        DynStoreBackend::query_index(&**self, collection, index, field, value).await
    }

    async fn add_index(&self, collection: &str, index: IndexDef) -> DocumentStoreResult<()> {
        DynStoreBackend::add_index(&**self, collection, index).await
    }

    async fn drop_index(&self, collection: &str, index: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::drop_index(&**self, collection, index).await
    }

    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexDef>> {
        DynStoreBackend::list_indexes(&**self, collection).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        DynStoreBackend::shutdown_boxed(self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
