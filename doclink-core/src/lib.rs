//! Typed relationship resolution over a document store abstraction.
//!
//! This crate is the core of the doclink project and provides:
//!
//! - **Document traits** ([`document`]) - Documents, typed identifiers and references
//! - **Store backend abstraction** ([`backend`]) - The traits storage backends implement
//! - **Schema constraints** ([`schema`]) - Field, index and foreign-key proofs, plus their
//!   runtime mirror
//! - **Relation operations** ([`relations`]) - Batch fetch, index lookup and join traversal
//! - **Collections interface** ([`collection`]) - Typed and untyped collection handles
//! - **Document store** ([`store`]) - The entry point tying a backend to its options
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use doclink_core::{document::{Document, Id, Ordinary}, relations};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub id: Id<User>,
//!     pub name: String,
//! }
//!
//! impl Document for User {
//!     type Kind = Ordinary;
//!
//!     fn id(&self) -> &Id<User> {
//!         &self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "users"
//!     }
//! }
//!
//! let users = relations::get_all(&backend, [alice, bob]).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclink_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod relations;
pub mod schema;
pub mod store;
