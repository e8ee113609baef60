//! Core traits and types for document representation, identity and serialization.
//!
//! This module provides the fundamental traits that all stored documents must implement,
//! the typed [`Id`] used to reference documents across collections, and the
//! [`CollectionKind`] markers that decide how a referenced document is fetched.

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use futures::future::BoxFuture;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, from_value, to_value};
use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use crate::{backend::StoreBackend, error::DocumentStoreResult, schema::CollectionSchema};

/// Core trait that all documents stored in a document store must implement.
///
/// Every document has a typed identifier pointing at its own collection and names the
/// collection it belongs to. The [`Kind`](Document::Kind) decides whether the collection
/// is an ordinary one or a reserved system collection.
///
/// In most cases this trait is derived with `#[derive(Document)]` from the `doclink`
/// crate, which also generates the field and index markers used by the relation
/// operations.
///
/// # Example
///
/// ```ignore
/// use doclink::document::{Document, Id, Ordinary};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub id: Id<User>,
///     pub name: String,
/// }
///
/// impl Document for User {
///     type Kind = Ordinary;
///
///     fn id(&self) -> &Id<User> {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "users"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Whether documents of this type live in an ordinary or a reserved collection.
    type Kind: CollectionKind;

    /// Returns a reference to this document's identifier.
    fn id(&self) -> &Id<Self>;

    /// Returns the name of the collection this document belongs to.
    ///
    /// Reserved collections use names starting with `_` (e.g. `_storage`).
    fn collection_name() -> &'static str;

    /// Returns the runtime description of the collection: its declared indexes and
    /// reference fields.
    ///
    /// The default describes a collection without user indexes.
    fn schema() -> CollectionSchema {
        CollectionSchema::new(Self::collection_name())
    }
}

/// Extension trait providing serialization/deserialization utilities for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Creates a document from a BSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// A reference to a document in the collection of `T`.
///
/// The target collection is carried in the type, so a field declared as `Id<Session>`
/// can only ever hold identifiers of `sessions` documents. On the wire an `Id` is the
/// bare UUID.
pub struct Id<T> {
    uuid: Uuid,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self { uuid, _marker: PhantomData }
    }

    /// Returns the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Reinterprets this identifier as pointing at another collection.
    ///
    /// Only useful at untyped boundaries; the result is not checked.
    pub fn cast<U>(self) -> Id<U> {
        Id::from_uuid(self.uuid)
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.uuid).finish()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.uuid, f)
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T> From<uuid::Uuid> for Id<T> {
    fn from(uuid: uuid::Uuid) -> Self {
        Self::from_uuid(uuid.into())
    }
}

impl<T> From<Id<T>> for Uuid {
    fn from(id: Id<T>) -> Self {
        id.uuid
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.uuid.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

/// A field value that points at another document.
///
/// Implemented for `Id<T>` and `Option<Id<T>>`. Fields whose value implements this trait
/// are foreign keys: they can be the target field of a join traversal, and the target
/// collection is read from the type.
pub trait Reference: Send + Sync {
    /// The document type being referenced.
    type Target: Document;

    /// Returns the referenced identifier, or `None` for an empty optional reference.
    fn target_id(&self) -> Option<Id<Self::Target>>;
}

impl<T: Document> Reference for Id<T> {
    type Target = T;

    fn target_id(&self) -> Option<Id<T>> {
        Some(*self)
    }
}

impl<T: Document> Reference for Option<Id<T>> {
    type Target = T;

    fn target_id(&self) -> Option<Id<T>> {
        *self
    }
}

/// How documents of a collection kind are fetched by identifier.
///
/// The kind is chosen statically through [`Document::Kind`], so resolving a reference
/// never needs to try one path and fall back to the other at runtime.
pub trait CollectionKind: Send + Sync + 'static {
    /// `true` for reserved system collections.
    const IS_SYSTEM: bool;

    /// Fetches a single raw document from the backend.
    fn fetch<'a, B: StoreBackend>(
        backend: &'a B,
        id: Uuid,
        collection: &'a str,
    ) -> BoxFuture<'a, DocumentStoreResult<Option<Bson>>>;
}

/// Marker for ordinary user collections, resolved through the primary `get` path.
#[derive(Debug, Clone, Copy)]
pub enum Ordinary {}

/// Marker for reserved system collections (file blobs and other built-in data),
/// resolved through the backend's system lookup.
#[derive(Debug, Clone, Copy)]
pub enum System {}

impl CollectionKind for Ordinary {
    const IS_SYSTEM: bool = false;

    fn fetch<'a, B: StoreBackend>(
        backend: &'a B,
        id: Uuid,
        collection: &'a str,
    ) -> BoxFuture<'a, DocumentStoreResult<Option<Bson>>> {
        Box::pin(async move { backend.get_document(id, collection).await })
    }
}

impl CollectionKind for System {
    const IS_SYSTEM: bool = true;

    fn fetch<'a, B: StoreBackend>(
        backend: &'a B,
        id: Uuid,
        collection: &'a str,
    ) -> BoxFuture<'a, DocumentStoreResult<Option<Bson>>> {
        Box::pin(async move { backend.system_get(id, collection).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: Id<Note>,
        body: String,
        parent: Option<Id<Note>>,
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

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = Id::<Note>::new();
        let json = serde_json::to_value(id).unwrap();

        assert_eq!(json, serde_json::to_value(id.uuid()).unwrap());
        assert_eq!(serde_json::from_value::<Id<Note>>(json).unwrap(), id);
    }

    #[test]
    fn bson_conversion_keeps_references() {
        let parent = Id::new();
        let note = Note { id: Id::new(), body: "hello".into(), parent: Some(parent) };

        let restored = Note::from_bson(note.to_bson().unwrap()).unwrap();

        assert_eq!(restored, note);
        assert_eq!(restored.parent.target_id(), Some(parent));
    }

    #[test]
    fn empty_optional_reference_has_no_target() {
        let reference: Option<Id<Note>> = None;

        assert_eq!(reference.target_id(), None);
    }

    #[test]
    fn kinds_report_system_flag() {
        assert!(!<Note as Document>::Kind::IS_SYSTEM);
        assert!(System::IS_SYSTEM);
    }
}
