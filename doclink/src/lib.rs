//! Typed relationship resolution over a document store abstraction.
//!
//! This crate is the primary entry point for users of doclink. It re-exports the core
//! types from the sub-crates, the `Document` derive macro and the bundled backends.
//!
//! # Features
//!
//! - **Typed references** - `Id<T>` fields carry the collection they point into
//! - **Compile-time lookups** - Index and field combinations are proven valid by the types
//!   the derive macro generates; an invalid lookup does not compile
//! - **Relation operations** - Batch fetch, unique and multi-valued index lookups, and
//!   join traversal, all order-preserving with bounded concurrency
//! - **Pluggable backends** - Anything implementing `StoreBackend`, selected statically or
//!   at runtime
//!
//! # Quick Start
//!
//! ```ignore
//! use doclink::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users", index(name = "token_identifier", fields = "token_identifier"))]
//! pub struct User {
//!     pub id: Id<User>,
//!     pub token_identifier: String,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "sessions")]
//! pub struct Session {
//!     pub id: Id<Session>,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "edges", index(name = "user_id", fields = "user_id"))]
//! pub struct Edge {
//!     pub id: Id<Edge>,
//!     pub user_id: Id<User>,
//!     pub session_id: Id<Session>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     store.register::<User>().await?;
//!     store.register::<Edge>().await?;
//!
//!     let relations = store.relations();
//!
//!     // The user whose token is "b", or an error naming the collection, field and value.
//!     let user = relations.get_one_from_or_throw(users::TokenIdentifier, "b").await?;
//!
//!     // Every session linked to the user through `edges`, in edge order.
//!     let sessions = relations
//!         .get_many_via(edges::SessionId, edges::UserId, user.id)
//!         .await?;
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Compile-Time Checks
//!
//! Lookups and joins that the schema does not allow are type errors. In the examples below
//! (models hidden), `users` has an index `token_identifier` on the field of the same name
//! and an index `by_name` on `name`. `edges` joins users to sessions and has an index
//! `user_id` on `user_id`. Valid calls compile:
//!
//! ```no_run
//! # use doclink::{prelude::*, memory::InMemoryStore};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(
//! #     collection = "users",
//! #     index(name = "token_identifier", fields = "token_identifier"),
//! #     index(name = "by_name", fields = "name"),
//! # )]
//! # pub struct User { pub id: Id<User>, pub token_identifier: String, pub name: String }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "sessions")]
//! # pub struct Session { pub id: Id<Session> }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "edges", index(name = "user_id", fields = "user_id"))]
//! # pub struct Edge { pub id: Id<Edge>, pub user_id: Id<User>, pub session_id: Id<Session> }
//! # #[tokio::main]
//! # async fn main() -> DocumentStoreResult<()> {
//! # let store = DocumentStore::new(InMemoryStore::new());
//! # let relations = store.relations();
//! # let user_id: Id<User> = Id::new();
//! relations.get_one_from(users::TokenIdentifier, "b").await?;
//! relations.get_many_from((users::ByName, users::Name), "Ann").await?;
//! relations.get_many_via(edges::SessionId, edges::UserId, user_id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! An index that is not named after its field needs the field spelled out:
//!
//! ```compile_fail
//! # use doclink::{prelude::*, memory::InMemoryStore};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(
//! #     collection = "users",
//! #     index(name = "token_identifier", fields = "token_identifier"),
//! #     index(name = "by_name", fields = "name"),
//! # )]
//! # pub struct User { pub id: Id<User>, pub token_identifier: String, pub name: String }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "sessions")]
//! # pub struct Session { pub id: Id<Session> }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "edges", index(name = "user_id", fields = "user_id"))]
//! # pub struct Edge { pub id: Id<Edge>, pub user_id: Id<User>, pub session_id: Id<Session> }
//! # #[tokio::main]
//! # async fn main() -> DocumentStoreResult<()> {
//! # let store = DocumentStore::new(InMemoryStore::new());
//! # let relations = store.relations();
//! # let user_id: Id<User> = Id::new();
//! relations.get_many_from(users::ByName, "Ann").await?;
//! # Ok(())
//! # }
//! ```
//!
//! The field must be one the index declares:
//!
//! ```compile_fail
//! # use doclink::{prelude::*, memory::InMemoryStore};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(
//! #     collection = "users",
//! #     index(name = "token_identifier", fields = "token_identifier"),
//! #     index(name = "by_name", fields = "name"),
//! # )]
//! # pub struct User { pub id: Id<User>, pub token_identifier: String, pub name: String }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "sessions")]
//! # pub struct Session { pub id: Id<Session> }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "edges", index(name = "user_id", fields = "user_id"))]
//! # pub struct Edge { pub id: Id<Edge>, pub user_id: Id<User>, pub session_id: Id<Session> }
//! # #[tokio::main]
//! # async fn main() -> DocumentStoreResult<()> {
//! # let store = DocumentStore::new(InMemoryStore::new());
//! # let relations = store.relations();
//! # let user_id: Id<User> = Id::new();
//! relations.get_one_from((users::ByName, users::TokenIdentifier), "b").await?;
//! # Ok(())
//! # }
//! ```
//!
//! Index and field must belong to the same collection:
//!
//! ```compile_fail
//! # use doclink::{prelude::*, memory::InMemoryStore};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(
//! #     collection = "users",
//! #     index(name = "token_identifier", fields = "token_identifier"),
//! #     index(name = "by_name", fields = "name"),
//! # )]
//! # pub struct User { pub id: Id<User>, pub token_identifier: String, pub name: String }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "sessions")]
//! # pub struct Session { pub id: Id<Session> }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "edges", index(name = "user_id", fields = "user_id"))]
//! # pub struct Edge { pub id: Id<Edge>, pub user_id: Id<User>, pub session_id: Id<Session> }
//! # #[tokio::main]
//! # async fn main() -> DocumentStoreResult<()> {
//! # let store = DocumentStore::new(InMemoryStore::new());
//! # let relations = store.relations();
//! # let user_id: Id<User> = Id::new();
//! relations.get_many_from((users::ByName, edges::UserId), user_id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! A join target field must hold a reference:
//!
//! ```compile_fail
//! # use doclink::{prelude::*, memory::InMemoryStore};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(
//! #     collection = "users",
//! #     index(name = "token_identifier", fields = "token_identifier"),
//! #     index(name = "by_name", fields = "name"),
//! # )]
//! # pub struct User { pub id: Id<User>, pub token_identifier: String, pub name: String }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "sessions")]
//! # pub struct Session { pub id: Id<Session> }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "edges", index(name = "user_id", fields = "user_id"))]
//! # pub struct Edge { pub id: Id<Edge>, pub user_id: Id<User>, pub session_id: Id<Session> }
//! # #[tokio::main]
//! # async fn main() -> DocumentStoreResult<()> {
//! # let store = DocumentStore::new(InMemoryStore::new());
//! # let relations = store.relations();
//! # let user_id: Id<User> = Id::new();
//! relations.get_many_via(users::Name, users::TokenIdentifier, "b").await?;
//! # Ok(())
//! # }
//! ```
//!
//! The join target field must live on the collection being searched:
//!
//! ```compile_fail
//! # use doclink::{prelude::*, memory::InMemoryStore};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(
//! #     collection = "users",
//! #     index(name = "token_identifier", fields = "token_identifier"),
//! #     index(name = "by_name", fields = "name"),
//! # )]
//! # pub struct User { pub id: Id<User>, pub token_identifier: String, pub name: String }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "sessions")]
//! # pub struct Session { pub id: Id<Session> }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "edges", index(name = "user_id", fields = "user_id"))]
//! # pub struct Edge { pub id: Id<Edge>, pub user_id: Id<User>, pub session_id: Id<Session> }
//! # #[tokio::main]
//! # async fn main() -> DocumentStoreResult<()> {
//! # let store = DocumentStore::new(InMemoryStore::new());
//! # let relations = store.relations();
//! # let user_id: Id<User> = Id::new();
//! relations.get_many_via(edges::SessionId, users::TokenIdentifier, "b").await?;
//! # Ok(())
//! # }
//! ```
//!
//! A join cannot resolve through the field it looks join records up by:
//!
//! ```compile_fail
//! # use doclink::{prelude::*, memory::InMemoryStore};
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(
//! #     collection = "users",
//! #     index(name = "token_identifier", fields = "token_identifier"),
//! #     index(name = "by_name", fields = "name"),
//! # )]
//! # pub struct User { pub id: Id<User>, pub token_identifier: String, pub name: String }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "sessions")]
//! # pub struct Session { pub id: Id<Session> }
//! # #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! # #[document(collection = "edges", index(name = "user_id", fields = "user_id"))]
//! # pub struct Edge { pub id: Id<Edge>, pub user_id: Id<User>, pub session_id: Id<Session> }
//! # #[tokio::main]
//! # async fn main() -> DocumentStoreResult<()> {
//! # let store = DocumentStore::new(InMemoryStore::new());
//! # let relations = store.relations();
//! # let user_id: Id<User> = Id::new();
//! relations.get_many_via(edges::UserId, edges::UserId, user_id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Index declarations are checked by the derive. This one is valid:
//!
//! ```
//! # use doclink::prelude::*;
//! # use serde::{Deserialize, Serialize};
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users", index(name = "by_name_and_token", fields = "name, token_identifier"))]
//! pub struct User {
//!     pub id: Id<User>,
//!     pub token_identifier: String,
//!     pub name: String,
//! }
//! # fn main() {}
//! ```
//!
//! The creation-order index name is reserved:
//!
//! ```compile_fail
//! # use doclink::prelude::*;
//! # use serde::{Deserialize, Serialize};
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users", index(name = "by_creation_time", fields = "name"))]
//! pub struct User {
//!     pub id: Id<User>,
//!     pub token_identifier: String,
//!     pub name: String,
//! }
//! # fn main() {}
//! ```
//!
//! An index needs at least one field:
//!
//! ```compile_fail
//! # use doclink::prelude::*;
//! # use serde::{Deserialize, Serialize};
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users", index(name = "by_name", fields = ""))]
//! pub struct User {
//!     pub id: Id<User>,
//!     pub token_identifier: String,
//!     pub name: String,
//! }
//! # fn main() {}
//! ```
//!
//! Every listed field must exist:
//!
//! ```compile_fail
//! # use doclink::prelude::*;
//! # use serde::{Deserialize, Serialize};
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users", index(name = "by_email", fields = "email"))]
//! pub struct User {
//!     pub id: Id<User>,
//!     pub token_identifier: String,
//!     pub name: String,
//! }
//! # fn main() {}
//! ```
//!
//! The creation time cannot be indexed explicitly:
//!
//! ```compile_fail
//! # use doclink::prelude::*;
//! # use serde::{Deserialize, Serialize};
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users", index(name = "by_name", fields = "name, _creation_time"))]
//! pub struct User {
//!     pub id: Id<User>,
//!     pub token_identifier: String,
//!     pub name: String,
//! }
//! # fn main() {}
//! ```
//!
//! An index named after a field must index exactly that field:
//!
//! ```compile_fail
//! # use doclink::prelude::*;
//! # use serde::{Deserialize, Serialize};
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "users", index(name = "name", fields = "token_identifier"))]
//! pub struct User {
//!     pub id: Id<User>,
//!     pub token_identifier: String,
//!     pub name: String,
//! }
//! # fn main() {}
//! ```
//!
//! # Dynamic Dispatch
//!
//! A `DocumentStore` can be converted into a [`DynDocumentStore`](store::DynDocumentStore)
//! with `into_dyn` when the backend is only known at runtime. Relations work the same on
//! both.
//!
//! ```ignore
//! use doclink::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new()).into_dyn();
//! let users = store.relations().get_all([alice, bob]).await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing

#[allow(unused_extern_crates)]
extern crate self as doclink;

pub mod prelude;

pub use doclink_core::{backend, collection, document, error, relations, schema, store};
pub use doclink_macros::Document;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use doclink_memory::{InMemoryStore, InMemoryStoreBuilder};
}
