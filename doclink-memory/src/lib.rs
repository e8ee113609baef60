//! In-memory document storage backend for doclink.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for
//! development, testing and as a reference for other backends.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion-ordered storage** - Index lookups scan documents in the order they were inserted
//! - **Declared indexes** - Lookups through undeclared indexes or fields are rejected
//! - **System collections** - Reserved collections reachable only through `system_get`
//!
//! # Quick Start
//!
//! ```ignore
//! use doclink::{Document, DocumentStore, document::Id, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users", index(name = "token_identifier", fields = "token_identifier"))]
//! pub struct User {
//!     pub id: Id<User>,
//!     pub token_identifier: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     store.register::<User>().await?;
//!
//!     let user = User { id: Id::new(), token_identifier: "b".to_string() };
//!     store.typed_collection::<User>().insert(vec![user.clone()]).await?;
//!
//!     let found = store.relations().get_one_from_or_throw(users::TokenIdentifier, "b").await?;
//!     assert_eq!(found.id, user.id);
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclink_memory;

mod matcher;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
