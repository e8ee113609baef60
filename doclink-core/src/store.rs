//! Main document store interface.
//!
//! - [`DocumentStore`] - A store bound to a specific backend implementation
//! - [`DynDocumentStore`] - The same store over a backend chosen at runtime
//! - [`StoreOptions`] - Options applied to the relation operations of a store
//!
//! # Example
//!
//! ```ignore
//! use doclink::store::{DocumentStore, StoreOptions};
//!
//! let store = DocumentStore::with_options(backend, StoreOptions::new().with_fetch_concurrency(8));
//! store.register::<User>().await?;
//!
//! let user = store
//!     .relations()
//!     .get_one_from_or_throw(users::TokenIdentifier, "b")
//!     .await?;
//! ```

use tracing::debug;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{Collection, TypedCollection},
    document::Document,
    error::DocumentStoreResult,
    relations::{DEFAULT_FETCH_CONCURRENCY, Relations},
    schema::CollectionSchema,
};

/// Options applied to the relation operations of a [`DocumentStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    fetch_concurrency: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { fetch_concurrency: DEFAULT_FETCH_CONCURRENCY }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many document fetches a relation operation keeps in flight.
    ///
    /// Values below one are raised to one.
    pub fn with_fetch_concurrency(mut self, fetch_concurrency: usize) -> Self {
        self.fetch_concurrency = fetch_concurrency.max(1);
        self
    }

    pub fn fetch_concurrency(&self) -> usize {
        self.fetch_concurrency
    }
}

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
///
/// # Example
///
/// ```ignore
/// let store = DocumentStore::new(my_backend);
/// let users = store.typed_collection::<User>();
/// ```
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    options: StoreOptions,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend and default options.
    pub fn new(backend: B) -> Self {
        Self::with_options(backend, StoreOptions::default())
    }

    /// Creates a new document store with the given backend and options.
    pub fn with_options(backend: B, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Returns the relation operations of this store, configured with its options.
    pub fn relations(&self) -> Relations<'_, B> {
        Relations::new(&self.backend).with_concurrency(self.options.fetch_concurrency)
    }

    /// Gets a typed collection for the specified document type.
    pub fn typed_collection<D: Document>(&self) -> TypedCollection<'_, B, D> {
        TypedCollection::new(&self.backend)
    }

    /// Gets an untyped collection described by `schema`.
    pub fn collection(&self, schema: CollectionSchema) -> Collection<'_, B> {
        Collection::new(schema, &self.backend, self.options.fetch_concurrency)
    }

    /// Declares the indexes of `D` on the backend.
    ///
    /// Indexes that already exist with the same fields are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintViolation`](crate::error::DocumentStoreError::ConstraintViolation)
    /// if the schema declares an invalid index, or the backend's error if an index of the
    /// same name exists with different fields.
    pub async fn register<D: Document>(&self) -> DocumentStoreResult<()> {
        let schema = D::schema();
        schema.validate()?;

        debug!(collection = schema.name(), indexes = schema.user_indexes().len(), "registering collection");

        for index in schema.user_indexes() {
            StoreBackend::add_index(&self.backend, schema.name(), index.clone()).await?;
        }

        Ok(())
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the shutdown operation fails.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(self.backend).await
    }
}

/// A document store over a backend chosen at runtime.
pub type DynDocumentStore = DocumentStore<Box<dyn DynStoreBackend>>;

impl DynDocumentStore {
    /// Returns the backend as its concrete type, if it is a `T`.
    pub fn downcast_backend<T: StoreBackend + 'static>(&self) -> Option<&T> {
        DynStoreBackend::as_any(&*self.backend).downcast_ref::<T>()
    }
}

/// Conversion into a [`DynDocumentStore`].
pub trait IntoDynDocumentStore {
    /// Converts this store into a store over a boxed backend, keeping its options.
    ///
    /// The backend is boxed as is; converting a [`DynDocumentStore`] again nests it.
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        let backend: Box<dyn DynStoreBackend> = Box::new(self.backend);

        DocumentStore::with_options(backend, self.options)
    }
}
