#![allow(dead_code)]

use doclink::{
    Document,
    document::Id,
    memory::InMemoryStore,
    store::{DocumentStore, StoreOptions},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(
    collection = "users",
    index(name = "token_identifier", fields = "token_identifier"),
    index(name = "by_name", fields = "name"),
)]
pub struct User {
    pub id: Id<User>,
    pub token_identifier: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "sessions")]
pub struct Session {
    pub id: Id<Session>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(
    collection = "edges",
    index(name = "user_id", fields = "user_id"),
    index(name = "by_user_and_session", fields = "user_id, session_id"),
)]
pub struct Edge {
    pub id: Id<Edge>,
    pub user_id: Id<User>,
    pub session_id: Id<Session>,
}

/// A blob record kept by the engine in a reserved collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "_storage", module = "storage")]
pub struct StoredFile {
    pub id: Id<StoredFile>,
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(collection = "attachments", index(name = "owner", fields = "owner"))]
pub struct Attachment {
    #[document(id)]
    pub key: Id<Attachment>,
    pub owner: Id<User>,
    pub file: Option<Id<StoredFile>>,
}

/// Join record whose reference fields are named after the collections they point into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
#[document(
    collection = "logins",
    index(name = "user", fields = "user"),
    index(name = "user_key", fields = "user_key"),
)]
pub struct Login {
    pub id: Id<Login>,
    pub user_key: String,
    pub user: Id<User>,
    pub session: Id<Session>,
}

pub fn user(token: &str, name: &str) -> User {
    User { id: Id::new(), token_identifier: token.to_string(), name: name.to_string() }
}

pub fn session(label: &str) -> Session {
    Session { id: Id::new(), label: label.to_string() }
}

pub fn edge(user: &User, session: &Session) -> Edge {
    Edge { id: Id::new(), user_id: user.id, session_id: session.id }
}

pub async fn store() -> DocumentStore<InMemoryStore> {
    store_with(StoreOptions::default()).await
}

pub async fn store_with(options: StoreOptions) -> DocumentStore<InMemoryStore> {
    let store = DocumentStore::with_options(InMemoryStore::new(), options);

    store.register::<User>().await.unwrap();
    store.register::<Session>().await.unwrap();
    store.register::<Edge>().await.unwrap();
    store.register::<StoredFile>().await.unwrap();
    store.register::<Attachment>().await.unwrap();
    store.register::<Login>().await.unwrap();

    store
}
