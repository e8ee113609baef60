//! Relationship resolution between documents.
//!
//! This module follows references between collections without writing queries by hand:
//!
//! - **Batch fetch** - [`get_all`], [`get_all_or_throw`]: identifiers to documents
//! - **Index lookup** - [`get_one_from`], [`get_one_from_or_throw`], [`get_many_from`]:
//!   documents whose indexed field equals a value
//! - **Join traversal** - [`get_many_via`], [`get_many_via_or_throw`]: look join records
//!   up by one field, then resolve the reference stored in another
//!
//! Every operation is available as a free function over a backend and as a method on
//! [`Relations`], which [`DocumentStore::relations`](crate::store::DocumentStore::relations)
//! returns preconfigured with the store's options.
//!
//! Output sequences always follow input order (or, for joins, the order the join records
//! were found in), even though the individual fetches run concurrently.
//!
//! # Example
//!
//! ```ignore
//! use doclink::relations;
//!
//! // users::TokenIdentifier is an index named after its only field
//! let user = relations::get_one_from_or_throw(&backend, users::TokenIdentifier, "b").await?;
//!
//! // every session of a user, through the `edges` join collection
//! let sessions = relations::get_many_via(&backend, edges::SessionId, edges::UserId, user.id).await?;
//! ```

use bson::{Bson, ser::serialize_to_bson};
use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, trace, warn};

use crate::{
    backend::StoreBackend,
    document::{CollectionKind, Document, DocumentExt, Id},
    error::{DocumentStoreError, DocumentStoreResult},
    schema::{DistinctField, Field, ForeignKey, JoinFields, Lookup},
};

/// Number of fetches a relation operation keeps in flight when not configured otherwise.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 16;

/// The value type a lookup compares against.
pub type LookupValue<L> = <<L as Lookup>::Field as Field>::Value;

/// Relation operations bound to a backend.
#[derive(Debug)]
pub struct Relations<'a, B: StoreBackend> {
    backend: &'a B,
    concurrency: usize,
}

impl<'a, B: StoreBackend> Clone for Relations<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B: StoreBackend> Copy for Relations<'a, B> {}

impl<'a, B: StoreBackend> Relations<'a, B> {
    /// Creates relation operations over `backend` with the default fetch concurrency.
    pub fn new(backend: &'a B) -> Self {
        Self { backend, concurrency: DEFAULT_FETCH_CONCURRENCY }
    }

    /// Sets how many fetches may be in flight at once. Values below one are raised to one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Returns the configured fetch concurrency.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Resolves each identifier to its document.
    ///
    /// The result has one element per identifier, in input order, with `None` where no
    /// document exists.
    ///
    /// # Errors
    ///
    /// Returns the first backend or deserialization error encountered.
    pub async fn get_all<D: Document>(
        &self,
        ids: impl IntoIterator<Item = Id<D>>,
    ) -> DocumentStoreResult<Vec<Option<D>>> {
        let ids = ids.into_iter().map(Some).collect::<Vec<_>>();

        debug!(collection = D::collection_name(), count = ids.len(), "fetching documents by id");

        self.resolve_all(ids).await
    }

    /// Resolves each identifier to its document, failing if any is missing.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] naming the first missing identifier
    /// in input order. No partial result is returned.
    pub async fn get_all_or_throw<D: Document>(
        &self,
        ids: impl IntoIterator<Item = Id<D>>,
    ) -> DocumentStoreResult<Vec<D>> {
        let ids = ids.into_iter().collect::<Vec<_>>();
        let documents = self.get_all(ids.iter().copied()).await?;

        ids.iter()
            .zip(documents)
            .map(|(id, document)| {
                document.ok_or_else(|| {
                    DocumentStoreError::DocumentNotFound(id.to_string(), D::collection_name().to_string())
                })
            })
            .collect()
    }

    /// Returns the single document whose lookup field equals `value`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::AmbiguousMatch`] if more than one document matches.
    pub async fn get_one_from<L: Lookup>(
        &self,
        _lookup: L,
        value: impl Into<LookupValue<L>>,
    ) -> DocumentStoreResult<Option<L::Collection>> {
        let value = serialize_to_bson(&value.into())?;

        self.one_from::<L>(&value).await
    }

    /// Returns the single document whose lookup field equals `value`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NoIndexMatch`] naming the collection, field and value
    /// when nothing matches, and [`DocumentStoreError::AmbiguousMatch`] when several do.
    pub async fn get_one_from_or_throw<L: Lookup>(
        &self,
        _lookup: L,
        value: impl Into<LookupValue<L>>,
    ) -> DocumentStoreResult<L::Collection> {
        let value = serialize_to_bson(&value.into())?;

        self.one_from::<L>(&value)
            .await?
            .ok_or_else(|| {
                DocumentStoreError::NoIndexMatch(
                    L::Collection::collection_name().to_string(),
                    <L::Field as Field>::NAME.to_string(),
                    value.to_string(),
                )
            })
    }

    /// Returns every document whose lookup field equals `value`, in the backend's
    /// index-scan order.
    pub async fn get_many_from<L: Lookup>(
        &self,
        _lookup: L,
        value: impl Into<LookupValue<L>>,
    ) -> DocumentStoreResult<Vec<L::Collection>> {
        let value = serialize_to_bson(&value.into())?;

        self.many_from::<L>(&value).await
    }

    /// Looks join records up through `lookup`, then resolves the reference each one holds
    /// in `target`.
    ///
    /// The result has one element per join record, in the order they were found, with
    /// `None` where the reference is empty or points at nothing. Whether the target is
    /// fetched from an ordinary or a system collection follows from the target field's
    /// declared type.
    pub async fn get_many_via<T, L>(
        &self,
        _target: T,
        _lookup: L,
        value: impl Into<LookupValue<L>>,
    ) -> DocumentStoreResult<Vec<Option<T::Target>>>
    where
        L: Lookup,
        T: ForeignKey<Collection = L::Collection> + DistinctField<L::Field>,
    {
        let () = JoinFields::<T, L>::DISTINCT;
        let value = serialize_to_bson(&value.into())?;

        self.via::<T, L>(&value).await
    }

    /// Like [`get_many_via`](Self::get_many_via), but every join record must resolve.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::UnresolvedJoinTarget`] naming the join collection, the
    /// target field and the lookup value if any reference is unresolved. No partial result
    /// is returned.
    pub async fn get_many_via_or_throw<T, L>(
        &self,
        _target: T,
        _lookup: L,
        value: impl Into<LookupValue<L>>,
    ) -> DocumentStoreResult<Vec<T::Target>>
    where
        L: Lookup,
        T: ForeignKey<Collection = L::Collection> + DistinctField<L::Field>,
    {
        let () = JoinFields::<T, L>::DISTINCT;
        let value = serialize_to_bson(&value.into())?;

        self.via::<T, L>(&value)
            .await?
            .into_iter()
            .map(|document| {
                document.ok_or_else(|| {
                    DocumentStoreError::UnresolvedJoinTarget(
                        L::Collection::collection_name().to_string(),
                        T::NAME.to_string(),
                        value.to_string(),
                    )
                })
            })
            .collect()
    }

    async fn many_from<L: Lookup>(&self, value: &Bson) -> DocumentStoreResult<Vec<L::Collection>> {
        let collection = L::Collection::collection_name();
        let field = <L::Field as Field>::NAME;

        trace!(collection, index = L::INDEX, field, %value, "querying index");

        self.backend
            .query_index(collection, L::INDEX, field, value.clone())
            .await?
            .into_iter()
            .map(<L::Collection as DocumentExt>::from_bson)
            .collect()
    }

    async fn one_from<L: Lookup>(&self, value: &Bson) -> DocumentStoreResult<Option<L::Collection>> {
        let mut documents = self.many_from::<L>(value).await?;

        match documents.len() {
            0 | 1 => Ok(documents.pop()),
            count => {
                let collection = L::Collection::collection_name();
                let field = <L::Field as Field>::NAME;

                warn!(collection, index = L::INDEX, field, %value, count, "unique lookup matched several documents");

                Err(DocumentStoreError::AmbiguousMatch(
                    collection.to_string(),
                    field.to_string(),
                    value.to_string(),
                    count,
                ))
            }
        }
    }

    async fn via<T, L>(&self, value: &Bson) -> DocumentStoreResult<Vec<Option<T::Target>>>
    where
        L: Lookup,
        T: ForeignKey<Collection = L::Collection>,
    {
        let edges = self.many_from::<L>(value).await?;

        debug!(
            join = L::Collection::collection_name(),
            target_field = T::NAME,
            target = T::Target::collection_name(),
            edges = edges.len(),
            "resolving join targets"
        );

        self.resolve_all(edges.iter().map(T::target_id).collect())
            .await
    }

    async fn resolve_all<D: Document>(
        &self,
        ids: Vec<Option<Id<D>>>,
    ) -> DocumentStoreResult<Vec<Option<D>>> {
        let backend = self.backend;

        stream::iter(ids)
            .map(move |id| async move {
                match id {
                    Some(id) => fetch_document(backend, id).await,
                    None => Ok(None),
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

/// Fetches one document through the path its collection kind dictates.
pub(crate) async fn fetch_document<B, D>(backend: &B, id: Id<D>) -> DocumentStoreResult<Option<D>>
where
    B: StoreBackend,
    D: Document,
{
    <D::Kind as CollectionKind>::fetch(backend, id.uuid(), D::collection_name())
        .await?
        .map(D::from_bson)
        .transpose()
}

/// Resolves each identifier to its document. See [`Relations::get_all`].
pub async fn get_all<B, D>(
    backend: &B,
    ids: impl IntoIterator<Item = Id<D>>,
) -> DocumentStoreResult<Vec<Option<D>>>
where
    B: StoreBackend,
    D: Document,
{
    Relations::new(backend).get_all(ids).await
}

/// Resolves each identifier to its document, failing if any is missing.
/// See [`Relations::get_all_or_throw`].
pub async fn get_all_or_throw<B, D>(
    backend: &B,
    ids: impl IntoIterator<Item = Id<D>>,
) -> DocumentStoreResult<Vec<D>>
where
    B: StoreBackend,
    D: Document,
{
    Relations::new(backend).get_all_or_throw(ids).await
}

/// See [`Relations::get_one_from`].
pub async fn get_one_from<B, L>(
    backend: &B,
    lookup: L,
    value: impl Into<LookupValue<L>>,
) -> DocumentStoreResult<Option<L::Collection>>
where
    B: StoreBackend,
    L: Lookup,
{
    Relations::new(backend)
        .get_one_from(lookup, value)
        .await
}

/// See [`Relations::get_one_from_or_throw`].
pub async fn get_one_from_or_throw<B, L>(
    backend: &B,
    lookup: L,
    value: impl Into<LookupValue<L>>,
) -> DocumentStoreResult<L::Collection>
where
    B: StoreBackend,
    L: Lookup,
{
    Relations::new(backend)
        .get_one_from_or_throw(lookup, value)
        .await
}

/// See [`Relations::get_many_from`].
pub async fn get_many_from<B, L>(
    backend: &B,
    lookup: L,
    value: impl Into<LookupValue<L>>,
) -> DocumentStoreResult<Vec<L::Collection>>
where
    B: StoreBackend,
    L: Lookup,
{
    Relations::new(backend)
        .get_many_from(lookup, value)
        .await
}

/// See [`Relations::get_many_via`].
pub async fn get_many_via<B, T, L>(
    backend: &B,
    target: T,
    lookup: L,
    value: impl Into<LookupValue<L>>,
) -> DocumentStoreResult<Vec<Option<T::Target>>>
where
    B: StoreBackend,
    L: Lookup,
    T: ForeignKey<Collection = L::Collection> + DistinctField<L::Field>,
{
    Relations::new(backend)
        .get_many_via(target, lookup, value)
        .await
}

/// See [`Relations::get_many_via_or_throw`].
pub async fn get_many_via_or_throw<B, T, L>(
    backend: &B,
    target: T,
    lookup: L,
    value: impl Into<LookupValue<L>>,
) -> DocumentStoreResult<Vec<T::Target>>
where
    B: StoreBackend,
    L: Lookup,
    T: ForeignKey<Collection = L::Collection> + DistinctField<L::Field>,
{
    Relations::new(backend)
        .get_many_via_or_throw(target, lookup, value)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::Ordinary, schema::IndexDef};
    use async_trait::async_trait;
    use bson::Uuid;
    use serde::{Deserialize, Serialize};
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: Id<Note>,
        rank: usize,
    }

    impl Document for Note {
        type Kind = Ordinary;

        fn id(&self) -> &Id<Note> {
            &self.id
        }

        fn collection_name() -> &'static str {
            "notes"
        }
    }

    /// Answers reads after yielding `rank` times, so later-ranked notes finish first.
    #[derive(Debug, Default)]
    struct SlowReads {
        notes: HashMap<Uuid, Note>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl StoreBackend for SlowReads {
        async fn insert_documents(&self, _: Vec<(Uuid, Bson)>, _: &str) -> DocumentStoreResult<()> {
            Ok(())
        }

        async fn update_documents(&self, _: Vec<(Uuid, Bson)>, _: &str) -> DocumentStoreResult<()> {
            Ok(())
        }

        async fn delete_documents(&self, _: Vec<Uuid>, _: &str) -> DocumentStoreResult<()> {
            Ok(())
        }

        async fn get_document(&self, id: Uuid, _: &str) -> DocumentStoreResult<Option<Bson>> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);

            let note = self.notes.get(&id).cloned();
            let yields = note.as_ref().map_or(0, |note| 20 - note.rank);
            for _ in 0..yields {
                tokio::task::yield_now().await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            note.map(|note| note.to_bson()).transpose()
        }

        async fn system_get(&self, _: Uuid, _: &str) -> DocumentStoreResult<Option<Bson>> {
            Ok(None)
        }

        async fn query_index(&self, _: &str, _: &str, _: &str, _: Bson) -> DocumentStoreResult<Vec<Bson>> {
            Ok(Vec::new())
        }

        async fn add_index(&self, _: &str, _: IndexDef) -> DocumentStoreResult<()> {
            Ok(())
        }

        async fn drop_index(&self, _: &str, _: &str) -> DocumentStoreResult<()> {
            Ok(())
        }

        async fn list_indexes(&self, _: &str) -> DocumentStoreResult<Vec<IndexDef>> {
            Ok(Vec::new())
        }
    }

    fn backend(count: usize) -> (SlowReads, Vec<Note>) {
        let notes = (0..count).map(|rank| Note { id: Id::new(), rank }).collect::<Vec<_>>();
        let backend = SlowReads {
            notes: notes.iter().map(|note| (note.id.uuid(), note.clone())).collect(),
            ..SlowReads::default()
        };

        (backend, notes)
    }

    #[tokio::test]
    async fn results_follow_input_order_not_completion_order() {
        let (backend, notes) = backend(10);
        let missing = Id::<Note>::new();

        let mut ids = notes.iter().map(|note| note.id).collect::<Vec<_>>();
        ids.insert(4, missing);

        let found = Relations::new(&backend).get_all(ids).await.unwrap();

        assert_eq!(found.len(), 11);
        assert_eq!(found[4], None);
        assert_eq!(
            found.into_iter().flatten().collect::<Vec<_>>(),
            notes
        );
    }

    #[tokio::test]
    async fn fetches_stay_within_the_concurrency_bound() {
        let (backend, notes) = backend(12);

        Relations::new(&backend)
            .with_concurrency(3)
            .get_all_or_throw(notes.iter().map(|note| note.id))
            .await
            .unwrap();

        let peak = backend.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight fetches was {}", peak);
        assert!(peak > 1);
    }

    #[test]
    fn concurrency_is_at_least_one() {
        let (backend, _) = backend(0);

        assert_eq!(Relations::new(&backend).concurrency(), DEFAULT_FETCH_CONCURRENCY);
        assert_eq!(Relations::new(&backend).with_concurrency(0).concurrency(), 1);
    }
}
