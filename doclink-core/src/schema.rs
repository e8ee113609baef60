//! Index and field constraints for relation lookups.
//!
//! Relation operations only accept (collection, index, field) combinations that are
//! proven valid by the traits in this module:
//!
//! - [`Field`] - a named field of a collection with a known value type
//! - [`Index`] - a declared index with its ordered field list
//! - [`IndexCovers`] - the index declares the given field
//! - [`FieldNamedIndex`] - the index is named after its single field, so the field
//!   argument may be omitted
//! - [`Lookup`] - either a field-named index, or an `(index, field)` pair
//! - [`ForeignKey`] - a field holding a [`Reference`] into a target collection
//! - [`DistinctField`] - two different fields of the same collection
//!
//! These are normally generated by `#[derive(Document)]`. Invalid combinations fail to
//! compile: a missing trait impl is a type error, and the name checks that traits cannot
//! express are const assertions evaluated when the call is monomorphized.
//!
//! [`CollectionSchema`] mirrors the same rules at runtime for untyped callers and for
//! backends that need to know which indexes exist.

use serde::Serialize;
use std::marker::PhantomData;

use crate::{
    document::{CollectionKind, Document, Id, Reference},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Name of the implicit creation-order index present on every collection.
pub const CREATION_INDEX: &str = "by_creation_time";

/// Field backing the implicit creation-order index.
pub const CREATION_TIME_FIELD: &str = "_creation_time";

/// A named field of a collection.
pub trait Field: Send + Sync + 'static {
    /// The collection declaring this field.
    type Collection: Document;
    /// The declared value type.
    type Value: Serialize + Send + Sync;
    /// The stored field name.
    const NAME: &'static str;

    /// Reads the field from a document.
    fn get(document: &Self::Collection) -> &Self::Value;
}

/// A user-declared index on a collection.
pub trait Index: Send + Sync + 'static {
    /// The indexed collection.
    type Collection: Document;
    /// The index name.
    const NAME: &'static str;
    /// The indexed fields, in declaration order. Never empty and never contains
    /// [`CREATION_TIME_FIELD`].
    const FIELDS: &'static [&'static str];
}

/// Proof that an index declares field `F`.
pub trait IndexCovers<F: Field>: Index {}

/// An index whose field list is exactly `[its own name]`.
///
/// Lookups through such an index may omit the field argument.
pub trait FieldNamedIndex: Index {
    /// The single indexed field.
    type Field: Field<Collection = Self::Collection>;
}

/// The index and field an equality lookup goes through.
///
/// Implemented for every [`FieldNamedIndex`] (the field is implied) and for
/// `(index, field)` pairs where the index covers the field.
pub trait Lookup: Send + Sync {
    /// The collection being searched.
    type Collection: Document;
    /// The field compared against the lookup value.
    type Field: Field<Collection = Self::Collection>;
    /// The index used for the lookup.
    const INDEX: &'static str;
}

impl<I: FieldNamedIndex> Lookup for I {
    type Collection = I::Collection;
    type Field = I::Field;
    const INDEX: &'static str = {
        assert!(
            I::FIELDS.len() == 1
                && str_eq(I::FIELDS[0], I::NAME)
                && str_eq(<I::Field as Field>::NAME, I::NAME),
            "a field-named index must index exactly the field it is named after"
        );
        I::NAME
    };
}

impl<I, F> Lookup for (I, F)
where
    I: IndexCovers<F>,
    F: Field<Collection = I::Collection>,
{
    type Collection = I::Collection;
    type Field = F;
    const INDEX: &'static str = {
        assert!(contains(I::FIELDS, F::NAME), "the index does not declare the lookup field");
        I::NAME
    };
}

/// A field whose value references a document in another (or the same) collection.
///
/// Implemented for every [`Field`] whose value is a [`Reference`]; the target collection
/// is read from the declared value type.
pub trait ForeignKey: Field {
    /// The referenced document type.
    type Target: Document;

    /// Reads the referenced identifier from a document.
    fn target_id(document: &Self::Collection) -> Option<Id<Self::Target>>;
}

impl<F> ForeignKey for F
where
    F: Field,
    F::Value: Reference,
{
    type Target = <F::Value as Reference>::Target;

    fn target_id(document: &Self::Collection) -> Option<Id<Self::Target>> {
        F::get(document).target_id()
    }
}

/// Proof that `Self` and `F` are different fields of the same collection.
///
/// Joins require it between the target field and the lookup field. The derive implements
/// it for every ordered pair of distinct fields.
pub trait DistinctField<F: Field>: Field {}

/// Compile-time check that a join resolves through a different field than the one it
/// looks edges up by. Re-checks hand-written [`DistinctField`] impls by name.
pub(crate) struct JoinFields<T, L>(PhantomData<(T, L)>);

impl<T: ForeignKey, L: Lookup> JoinFields<T, L> {
    pub(crate) const DISTINCT: () = assert!(
        !str_eq(T::NAME, <L::Field as Field>::NAME),
        "the join target field must differ from the lookup field"
    );
}

const fn str_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }

    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }

    true
}

const fn contains(fields: &[&str], field: &str) -> bool {
    let mut i = 0;
    while i < fields.len() {
        if str_eq(fields[i], field) {
            return true;
        }
        i += 1;
    }

    false
}

/// Runtime description of a declared index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    name: String,
    fields: Vec<String>,
}

impl IndexDef {
    /// Describes an index. Use [`IndexDef::validate`] before trusting the definition.
    pub fn new<S: Into<String>>(name: impl Into<String>, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the indexed fields in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns `true` if the index is named after its single field.
    pub fn is_field_named(&self) -> bool {
        matches!(self.fields.as_slice(), [only] if *only == self.name)
    }

    /// Returns `true` if the index declares `field`.
    pub fn covers(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Checks the definition against the rules every user index must follow.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::ConstraintViolation`] if the index is empty, reuses the
    /// reserved creation-order index name, or lists the creation time field.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        if self.name == CREATION_INDEX {
            return Err(DocumentStoreError::ConstraintViolation(format!(
                "index name {} is reserved",
                CREATION_INDEX
            )));
        }

        if self.fields.is_empty() {
            return Err(DocumentStoreError::ConstraintViolation(format!(
                "index {} declares no fields",
                self.name
            )));
        }

        if self.covers(CREATION_TIME_FIELD) {
            return Err(DocumentStoreError::ConstraintViolation(format!(
                "index {} may not list {}",
                self.name, CREATION_TIME_FIELD
            )));
        }

        Ok(())
    }
}

/// Runtime description of a reference field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDef {
    field: String,
    target: String,
    system: bool,
}

impl ReferenceDef {
    pub fn new(field: impl Into<String>, target: impl Into<String>) -> Self {
        Self { field: field.into(), target: target.into(), system: false }
    }

    /// Describes the reference stored at `field`, reading the target collection and its
    /// kind from the value type `R`.
    pub fn of<R: Reference>(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            target: R::Target::collection_name().to_string(),
            system: <<R::Target as Document>::Kind as CollectionKind>::IS_SYSTEM,
        }
    }

    /// Describes a reference into a reserved system collection.
    pub fn system(field: impl Into<String>, target: impl Into<String>) -> Self {
        Self { system: true, ..Self::new(field, target) }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Name of the referenced collection.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_system(&self) -> bool {
        self.system
    }
}

/// A validated join: where to look edges up and where their targets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    pub lookup_field: String,
    pub target_field: String,
    pub target_collection: String,
    pub target_is_system: bool,
}

/// Runtime description of a collection's indexes and reference fields.
///
/// The primary identifier is never listed as a reference field, and the implicit
/// creation-order index is never listed as an index.
///
/// # Example
///
/// ```ignore
/// use doclink::schema::{CollectionSchema, IndexDef, ReferenceDef};
///
/// let edges = CollectionSchema::new("edges")
///     .with_index(IndexDef::new("user_id", ["user_id"]))
///     .with_reference(ReferenceDef::new("user_id", "users"))
///     .with_reference(ReferenceDef::new("session_id", "sessions"));
///
/// assert!(edges.is_join_collection());
/// assert_eq!(edges.resolve_lookup_field("user_id", None)?, "user_id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    name: String,
    indexes: Vec<IndexDef>,
    references: Vec<ReferenceDef>,
}

impl CollectionSchema {
    /// Creates a schema for a collection without indexes or references.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), indexes: Vec::new(), references: Vec::new() }
    }

    /// Adds an index definition.
    pub fn with_index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a reference field definition.
    pub fn with_reference(mut self, reference: ReferenceDef) -> Self {
        self.references.push(reference);
        self
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the user-declared indexes.
    pub fn user_indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    /// Returns the index with the given name.
    pub fn index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|index| index.name() == name)
    }

    /// Returns the reference fields (the join-target candidates).
    pub fn reference_fields(&self) -> &[ReferenceDef] {
        &self.references
    }

    /// Returns `true` if `index` exists and is named after its single field.
    pub fn is_field_named(&self, index: &str) -> bool {
        self.index(index).is_some_and(IndexDef::is_field_named)
    }

    /// Returns `true` if the collection has at least one user index.
    pub fn is_lookup_capable(&self) -> bool {
        !self.indexes.is_empty()
    }

    /// Returns `true` if some reference field can be resolved after looking records up
    /// through a different indexed field.
    pub fn is_join_collection(&self) -> bool {
        self.references.iter().any(|reference| {
            self.indexes
                .iter()
                .flat_map(|index| index.fields())
                .any(|field| field != reference.field())
        })
    }

    /// Checks every index definition.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        self.indexes.iter().try_for_each(IndexDef::validate)
    }

    /// Resolves the field an equality lookup through `index` compares.
    ///
    /// Without an explicit field the index must be field-named; with one, the index
    /// must declare it.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::IndexNotFound`] for an undeclared index and
    /// [`DocumentStoreError::ConstraintViolation`] for an invalid field.
    pub fn resolve_lookup_field<'a>(
        &'a self,
        index: &str,
        field: Option<&'a str>,
    ) -> DocumentStoreResult<&'a str> {
        let def = self
            .index(index)
            .ok_or_else(|| DocumentStoreError::IndexNotFound(index.to_string(), self.name.clone()))?;

        match field {
            Some(field) if def.covers(field) => Ok(field),
            Some(field) => Err(DocumentStoreError::ConstraintViolation(format!(
                "index {} on {} does not declare field {}",
                index, self.name, field
            ))),
            None if def.is_field_named() => Ok(def.name()),
            None => Err(DocumentStoreError::ConstraintViolation(format!(
                "index {} on {} is not named after its field; a field must be given",
                index, self.name
            ))),
        }
    }

    /// Validates a join traversal through this collection.
    ///
    /// # Errors
    ///
    /// Fails like [`resolve_lookup_field`](Self::resolve_lookup_field), and with
    /// [`DocumentStoreError::ConstraintViolation`] when `target_field` is not a reference
    /// field or is the lookup field itself.
    pub fn resolve_join(
        &self,
        target_field: &str,
        index: &str,
        field: Option<&str>,
    ) -> DocumentStoreResult<JoinPlan> {
        let lookup_field = self.resolve_lookup_field(index, field)?;

        let reference = self
            .references
            .iter()
            .find(|reference| reference.field() == target_field)
            .ok_or_else(|| {
                DocumentStoreError::ConstraintViolation(format!(
                    "{} is not a reference field of {}",
                    target_field, self.name
                ))
            })?;

        if reference.field() == lookup_field {
            return Err(DocumentStoreError::ConstraintViolation(format!(
                "join on {} resolves and looks up through the same field {}",
                self.name, lookup_field
            )));
        }

        Ok(JoinPlan {
            lookup_field: lookup_field.to_string(),
            target_field: reference.field().to_string(),
            target_collection: reference.target().to_string(),
            target_is_system: reference.is_system(),
        })
    }
}
