//! Procedural macros for the doclink project.
//!
//! ### `Document`
//!
//! Derives the `Document` trait for a struct with named fields, together with a module of
//! marker types that the relation operations use as compile-time proofs:
//!
//! - one **field marker** per field (except the primary identifier), implementing `Field`
//! - one **index marker** per declared index, implementing `Index` and `IndexCovers` for
//!   each of its fields. An index named after its single field has no separate marker:
//!   the field marker itself is the index, and implements `FieldNamedIndex`.
//! - `DistinctField` impls between every pair of field markers, so a join cannot target
//!   the field it looks records up by.
//!
//! The trait impls are emitted next to the struct, so field types resolve in the struct's
//! scope even when a marker shares a type's name (`session: Id<Session>`).
//!
//! Container attributes, under `#[document(...)]`:
//!
//! - `collection = "name"` (required)
//! - `module = "name"` - name of the generated marker module, defaults to the collection name
//! - `system` - the collection is a reserved system collection (implied by a leading `_`)
//! - `index(name = "...", fields = "a, b")` - declares an index, repeatable
//!
//! Field attribute: `#[document(id)]` marks the primary identifier. Without it, the field
//! named `id` is used.
//!
//! # Examples
//!
//! ```rust,ignore
//! use doclink::{Document, document::Id};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(
//!     collection = "edges",
//!     index(name = "user_id", fields = "user_id"),
//!     index(name = "by_user_and_session", fields = "user_id, session_id"),
//! )]
//! pub struct Edge {
//!     pub id: Id<Edge>,
//!     pub user_id: Id<User>,
//!     pub session_id: Id<Session>,
//! }
//!
//! // edges::UserId is a field-named index, edges::ByUserAndSession a composite one.
//! let sessions = relations::get_many_via(&backend, edges::SessionId, edges::UserId, user.id).await?;
//! ```
//!
//! ## Errors
//!
//! Derivation fails with a compile error when an index declares no fields, lists
//! `_creation_time`, reuses the reserved `by_creation_time` name, names an unknown field,
//! or is named after a field without indexing exactly that field.

extern crate proc_macro;
mod document;

use proc_macro::TokenStream;
use syn::{Data, DeriveInput};

use crate::document::generate_document_for_struct;

/// Derives the `Document` trait and the field and index markers of a collection.
///
/// See the [crate documentation](crate) for the supported attributes.
#[proc_macro_derive(Document, attributes(document))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    let result = match ast.data {
        Data::Struct(ref data) => generate_document_for_struct(&ast, data),
        _ => Err(syn::Error::new_spanned(
            &ast.ident,
            "Document can only be derived for structs with named fields",
        )),
    };

    result
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
