//! Convenient re-exports of commonly used types from doclink.
//!
//! ```ignore
//! use doclink::prelude::*;
//! ```
//!
//! This provides access to:
//! - Document traits, identifiers and the derive macro
//! - Store backends and builders
//! - Relation operations and lookup constraints
//! - Collection interfaces
//! - Error types

pub use doclink_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::{Collection, TypedCollection},
    document::{Document, DocumentExt, Id, Reference},
    error::{DocumentStoreError, DocumentStoreResult},
    relations::Relations,
    schema::{CollectionSchema, DistinctField, ForeignKey, IndexDef, Lookup},
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore, StoreOptions},
};
pub use doclink_macros::Document;
