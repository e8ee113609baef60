//! Collection handles for document store operations.
//!
//! - [`TypedCollection`] - Type-safe access to the collection of a [`Document`] type
//! - [`Collection`] - Untyped access through raw BSON, with relation lookups validated
//!   at runtime against a [`CollectionSchema`]
//!
//! The typed relation operations live in [`relations`](crate::relations); the untyped
//! variants here exist for callers that only learn collection, index and field names at
//! runtime.
//!
//! # Example
//!
//! ```ignore
//! let users = store.typed_collection::<User>();
//! users.insert(vec![user.clone()]).await?;
//!
//! let edges = store.collection(Edge::schema());
//! let sessions = edges.get_many_via("session_id", "user_id", user.id.uuid(), None).await?;
//! ```

use bson::{Bson, Uuid};
use futures::{StreamExt, TryStreamExt, stream};
use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt, Id},
    error::{DocumentStoreError, DocumentStoreResult},
    relations::fetch_document,
    schema::CollectionSchema,
};

/// A type-safe handle on the collection of `D`.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    backend: &'a B,
    _marker: PhantomData<fn() -> D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Self { backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &'static str {
        D::collection_name()
    }

    /// Inserts new documents.
    ///
    /// # Errors
    ///
    /// Fails if serialization fails or a document with the same identifier exists.
    pub async fn insert(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(to_pairs(&documents)?, D::collection_name())
            .await
    }

    /// Replaces existing documents.
    pub async fn update(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.backend
            .update_documents(to_pairs(&documents)?, D::collection_name())
            .await
    }

    /// Deletes documents by identifier.
    pub async fn delete(&self, ids: Vec<Id<D>>) -> DocumentStoreResult<()> {
        self.backend
            .delete_documents(ids.into_iter().map(Into::into).collect(), D::collection_name())
            .await
    }

    /// Fetches one document, through the system path for reserved collections.
    pub async fn get(&self, id: Id<D>) -> DocumentStoreResult<Option<D>> {
        fetch_document(self.backend, id).await
    }
}

fn to_pairs<D: Document>(documents: &[D]) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
    documents
        .iter()
        .map(|document| Ok((document.id().uuid(), document.to_bson()?)))
        .collect()
}

/// An untyped collection handle described by a [`CollectionSchema`].
///
/// Documents are raw BSON. Relation lookups take index and field names as strings and are
/// checked against the schema before the backend is queried, so an invalid combination
/// fails with [`DocumentStoreError::ConstraintViolation`] (or
/// [`DocumentStoreError::IndexNotFound`]) instead of a compile error.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    schema: CollectionSchema,
    backend: &'a B,
    concurrency: usize,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(schema: CollectionSchema, backend: &'a B, concurrency: usize) -> Self {
        Self { schema, backend, concurrency: concurrency.max(1) }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    /// Inserts new documents.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(documents, self.name())
            .await
    }

    /// Replaces existing documents.
    pub async fn update(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .update_documents(documents, self.name())
            .await
    }

    /// Deletes documents by identifier.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<()>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .delete_documents(ids.into_iter().map(Into::into).collect(), self.name())
            .await
    }

    /// Fetches one document through the primary path.
    pub async fn get(&self, id: impl Into<Uuid>) -> DocumentStoreResult<Option<Bson>> {
        self.backend
            .get_document(id.into(), self.name())
            .await
    }

    /// Returns every document whose `field` equals `value`.
    ///
    /// Without `field`, `index` must be named after its single field.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::IndexNotFound`] if the schema has no such index and
    /// [`DocumentStoreError::ConstraintViolation`] if the field is not valid for it.
    pub async fn get_many_from(
        &self,
        index: &str,
        value: impl Into<Bson>,
        field: Option<&str>,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let field = self.schema.resolve_lookup_field(index, field)?;

        self.backend
            .query_index(self.name(), index, field, value.into())
            .await
    }

    /// Returns the single document whose `field` equals `value`, if any.
    ///
    /// # Errors
    ///
    /// Fails like [`get_many_from`](Self::get_many_from), and with
    /// [`DocumentStoreError::AmbiguousMatch`] if several documents match.
    pub async fn get_one_from(
        &self,
        index: &str,
        value: impl Into<Bson>,
        field: Option<&str>,
    ) -> DocumentStoreResult<Option<Bson>> {
        let value = value.into();
        let field = self.schema.resolve_lookup_field(index, field)?;

        let mut documents = self
            .backend
            .query_index(self.name(), index, field, value.clone())
            .await?;

        match documents.len() {
            0 | 1 => Ok(documents.pop()),
            count => {
                warn!(collection = self.name(), index, field, %value, count, "unique lookup matched several documents");

                Err(DocumentStoreError::AmbiguousMatch(
                    self.name().to_string(),
                    field.to_string(),
                    value.to_string(),
                    count,
                ))
            }
        }
    }

    /// Returns the single document whose `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::NoIndexMatch`] when nothing matches.
    pub async fn get_one_from_or_throw(
        &self,
        index: &str,
        value: impl Into<Bson>,
        field: Option<&str>,
    ) -> DocumentStoreResult<Bson> {
        let value = value.into();
        let lookup_field = self.schema.resolve_lookup_field(index, field)?;

        self.get_one_from(index, value.clone(), field)
            .await?
            .ok_or_else(|| {
                DocumentStoreError::NoIndexMatch(
                    self.name().to_string(),
                    lookup_field.to_string(),
                    value.to_string(),
                )
            })
    }

    /// Looks join records up through `index`, then resolves the reference each holds in
    /// `target_field`.
    ///
    /// One element per join record, in scan order, `None` where the reference is empty,
    /// malformed or points at nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::ConstraintViolation`] if `target_field` is not a
    /// reference field of this collection or is the lookup field itself.
    pub async fn get_many_via(
        &self,
        target_field: &str,
        index: &str,
        value: impl Into<Bson>,
        field: Option<&str>,
    ) -> DocumentStoreResult<Vec<Option<Bson>>> {
        let plan = self.schema.resolve_join(target_field, index, field)?;

        let edges = self
            .backend
            .query_index(self.name(), index, &plan.lookup_field, value.into())
            .await?;

        debug!(
            join = self.name(),
            target_field = plan.target_field.as_str(),
            target = plan.target_collection.as_str(),
            edges = edges.len(),
            "resolving join targets"
        );

        let ids = edges
            .iter()
            .map(|edge| reference_at(edge, &plan.target_field))
            .collect::<Vec<_>>();
        let backend = self.backend;
        let plan = &plan;

        stream::iter(ids)
            .map(move |id| async move {
                match id {
                    Some(id) if plan.target_is_system => {
                        backend.system_get(id, &plan.target_collection).await
                    }
                    Some(id) => backend.get_document(id, &plan.target_collection).await,
                    None => Ok(None),
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Like [`get_many_via`](Self::get_many_via), but every join record must resolve.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::UnresolvedJoinTarget`] if any reference is unresolved.
    pub async fn get_many_via_or_throw(
        &self,
        target_field: &str,
        index: &str,
        value: impl Into<Bson>,
        field: Option<&str>,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let value = value.into();

        self.get_many_via(target_field, index, value.clone(), field)
            .await?
            .into_iter()
            .map(|document| {
                document.ok_or_else(|| {
                    DocumentStoreError::UnresolvedJoinTarget(
                        self.name().to_string(),
                        target_field.to_string(),
                        value.to_string(),
                    )
                })
            })
            .collect()
    }
}

/// Reads the identifier stored at `field`, accepting binary and string UUIDs.
fn reference_at(document: &Bson, field: &str) -> Option<Uuid> {
    match document.as_document()?.get(field)? {
        Bson::Binary(binary) => binary.to_uuid().ok(),
        Bson::String(uuid) => Uuid::parse_str(uuid).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn reads_binary_and_string_references() {
        let id = Uuid::new();
        let edge = Bson::Document(doc! {
            "binary": id,
            "string": id.to_string(),
            "missing": Bson::Null,
            "number": 7,
        });

        assert_eq!(reference_at(&edge, "binary"), Some(id));
        assert_eq!(reference_at(&edge, "string"), Some(id));
        assert_eq!(reference_at(&edge, "missing"), None);
        assert_eq!(reference_at(&edge, "number"), None);
        assert_eq!(reference_at(&edge, "absent"), None);
        assert_eq!(reference_at(&Bson::Int32(1), "binary"), None);
    }
}
