//! Integration tests for the relation operations.

mod support;

use async_trait::async_trait;
use doclink::{
    backend::StoreBackend,
    bson::{Bson, Uuid},
    document::Id,
    error::{DocumentStoreError, DocumentStoreResult},
    memory::InMemoryStore,
    relations,
    schema::IndexDef,
    store::{DocumentStore, StoreOptions},
};
use support::{
    Attachment, Edge, Login, Session, StoredFile, User, attachments, edge, edges, logins,
    session, store, store_with, user, users,
};

#[tokio::test]
async fn get_all_preserves_order_and_absence() {
    let store = store().await;
    let (alice, bob) = (user("a", "Alice"), user("b", "Bob"));
    store.typed_collection::<User>().insert(vec![alice.clone(), bob.clone()]).await.unwrap();

    let missing = Id::<User>::new();
    let found = store
        .relations()
        .get_all([bob.id, missing, alice.id, bob.id])
        .await
        .unwrap();

    assert_eq!(found, vec![Some(bob.clone()), None, Some(alice), Some(bob)]);
}

#[tokio::test]
async fn get_all_of_nothing_is_empty() {
    let store = store().await;

    let found = store.relations().get_all(Vec::<Id<User>>::new()).await.unwrap();

    assert!(found.is_empty());
}

#[tokio::test]
async fn get_all_or_throw_names_first_missing_id() {
    let store = store().await;
    let alice = user("a", "Alice");
    store.typed_collection::<User>().insert(vec![alice.clone()]).await.unwrap();

    let (first, second) = (Id::<User>::new(), Id::<User>::new());
    let err = store
        .relations()
        .get_all_or_throw([alice.id, first, second])
        .await
        .unwrap_err();

    assert!(err.is_missing_record());
    assert!(matches!(
        err,
        DocumentStoreError::DocumentNotFound(id, collection) if id == first.to_string() && collection == "users"
    ));

    let all = store.relations().get_all_or_throw([alice.id]).await.unwrap();
    assert_eq!(all, vec![alice]);
}

#[tokio::test]
async fn user_by_token_identifier() {
    let store = store().await;
    let (a, b) = (user("a", "Alice"), user("b", "Bob"));
    store.typed_collection::<User>().insert(vec![a, b.clone()]).await.unwrap();

    let relations = store.relations();

    assert_eq!(relations.get_one_from(users::TokenIdentifier, "b").await.unwrap(), Some(b.clone()));
    assert_eq!(relations.get_one_from(users::TokenIdentifier, "z").await.unwrap(), None);
    assert_eq!(relations.get_one_from_or_throw(users::TokenIdentifier, "b").await.unwrap(), b);

    let err = relations
        .get_one_from_or_throw(users::TokenIdentifier, "z")
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        DocumentStoreError::NoIndexMatch(collection, field, _) if collection == "users" && field == "token_identifier"
    ));
    assert_eq!(err.to_string(), "No document in collection users where token_identifier = \"z\"");

    store.typed_collection::<User>().delete(vec![b.id]).await.unwrap();

    assert_eq!(relations.get_one_from(users::TokenIdentifier, "b").await.unwrap(), None);
    assert!(
        relations
            .get_one_from_or_throw(users::TokenIdentifier, "b")
            .await
            .unwrap_err()
            .is_missing_record()
    );
}

#[tokio::test]
async fn unique_lookup_rejects_several_matches() {
    let store = store().await;
    store
        .typed_collection::<User>()
        .insert(vec![user("a", "First"), user("a", "Second")])
        .await
        .unwrap();

    let err = store
        .relations()
        .get_one_from(users::TokenIdentifier, "a")
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::AmbiguousMatch(_, _, _, 2)));
    assert!(!err.is_missing_record());
}

#[tokio::test]
async fn get_many_from_returns_scan_order() {
    let store = store().await;
    let docs = vec![user("a", "Sam"), user("b", "Kim"), user("c", "Sam"), user("d", "Sam")];
    store.typed_collection::<User>().insert(docs.clone()).await.unwrap();

    let sams = store
        .relations()
        .get_many_from((users::ByName, users::Name), "Sam")
        .await
        .unwrap();

    assert_eq!(sams, vec![docs[0].clone(), docs[2].clone(), docs[3].clone()]);

    let nobody = store
        .relations()
        .get_many_from((users::ByName, users::Name), "Lee")
        .await
        .unwrap();

    assert!(nobody.is_empty());
}

#[tokio::test]
async fn field_named_index_accepts_explicit_field() {
    let store = store().await;
    let b = user("b", "Bob");
    store.typed_collection::<User>().insert(vec![b.clone()]).await.unwrap();

    let found = store
        .relations()
        .get_one_from((users::TokenIdentifier, users::TokenIdentifier), "b")
        .await
        .unwrap();

    assert_eq!(found, Some(b));
}

#[tokio::test]
async fn sessions_via_edges() {
    let store = store().await;
    let (u, other) = (user("u", "You"), user("o", "Other"));
    let (s1, s2, s3) = (session("one"), session("two"), session("three"));

    store.typed_collection::<User>().insert(vec![u.clone(), other.clone()]).await.unwrap();
    store
        .typed_collection::<Session>()
        .insert(vec![s1.clone(), s2.clone(), s3.clone()])
        .await
        .unwrap();
    store
        .typed_collection::<Edge>()
        .insert(vec![edge(&u, &s2), edge(&other, &s3), edge(&u, &s1)])
        .await
        .unwrap();

    let relations = store.relations();

    let sessions = relations
        .get_many_via(edges::SessionId, edges::UserId, u.id)
        .await
        .unwrap();
    assert_eq!(sessions, vec![Some(s2.clone()), Some(s1.clone())]);

    let through_composite = relations
        .get_many_via(edges::SessionId, (edges::ByUserAndSession, edges::UserId), u.id)
        .await
        .unwrap();
    assert_eq!(through_composite, sessions);

    store.typed_collection::<Session>().delete(vec![s1.id]).await.unwrap();

    let sessions = relations
        .get_many_via(edges::SessionId, edges::UserId, u.id)
        .await
        .unwrap();
    assert_eq!(sessions, vec![Some(s2), None]);

    let err = relations
        .get_many_via_or_throw(edges::SessionId, edges::UserId, u.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DocumentStoreError::UnresolvedJoinTarget(join, field, _) if join == "edges" && field == "session_id"
    ));
}

#[tokio::test]
async fn join_fields_named_after_their_targets() {
    let store = store().await;
    let u = user("u", "You");
    let (s1, s2) = (session("one"), session("two"));

    store.typed_collection::<User>().insert(vec![u.clone()]).await.unwrap();
    store.typed_collection::<Session>().insert(vec![s1.clone(), s2.clone()]).await.unwrap();
    store
        .typed_collection::<Login>()
        .insert(vec![
            Login { id: Id::new(), user_key: "k2".to_string(), user: u.id, session: s2.id },
            Login { id: Id::new(), user_key: "k1".to_string(), user: u.id, session: s1.id },
        ])
        .await
        .unwrap();

    let relations = store.relations();

    let sessions: Vec<Option<Session>> = relations
        .get_many_via(logins::Session, logins::User, u.id)
        .await
        .unwrap();
    assert_eq!(sessions, vec![Some(s2), Some(s1.clone())]);

    let login = relations.get_one_from_or_throw(logins::UserKey, "k1").await.unwrap();
    assert_eq!(login.session, s1.id);
}

#[tokio::test]
async fn join_without_edges_is_empty() {
    let store = store().await;
    let lonely = user("l", "Lonely");

    let sessions = store
        .relations()
        .get_many_via(edges::SessionId, edges::UserId, lonely.id)
        .await
        .unwrap();
    assert!(sessions.is_empty());

    let sessions = store
        .relations()
        .get_many_via_or_throw(edges::SessionId, edges::UserId, lonely.id)
        .await
        .unwrap();
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn join_resolves_system_targets() {
    let store = store().await;
    let owner = user("o", "Owner");
    let file = StoredFile { id: Id::new(), size: 512 };

    store.typed_collection::<StoredFile>().insert(vec![file.clone()]).await.unwrap();
    store
        .typed_collection::<Attachment>()
        .insert(vec![
            Attachment { key: Id::new(), owner: owner.id, file: Some(file.id) },
            Attachment { key: Id::new(), owner: owner.id, file: None },
        ])
        .await
        .unwrap();

    let files = store
        .relations()
        .get_many_via(attachments::File, attachments::Owner, owner.id)
        .await
        .unwrap();
    assert_eq!(files, vec![Some(file.clone()), None]);

    assert_eq!(store.relations().get_all([file.id]).await.unwrap(), vec![Some(file.clone())]);
    assert_eq!(store.typed_collection::<StoredFile>().get(file.id).await.unwrap(), Some(file));
}

#[tokio::test]
async fn repeated_calls_agree() {
    let store = store().await;
    let u = user("u", "You");
    let sessions = vec![session("one"), session("two")];

    store.typed_collection::<User>().insert(vec![u.clone()]).await.unwrap();
    store.typed_collection::<Session>().insert(sessions.clone()).await.unwrap();
    store
        .typed_collection::<Edge>()
        .insert(sessions.iter().map(|s| edge(&u, s)).collect())
        .await
        .unwrap();

    let relations = store.relations();
    let first = relations.get_many_via(edges::SessionId, edges::UserId, u.id).await.unwrap();
    let second = relations.get_many_via(edges::SessionId, edges::UserId, u.id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        relations.get_one_from(users::TokenIdentifier, "u").await.unwrap(),
        relations.get_one_from(users::TokenIdentifier, "u").await.unwrap()
    );
}

#[tokio::test]
async fn order_holds_at_any_concurrency() {
    let store = store_with(StoreOptions::new().with_fetch_concurrency(0)).await;
    assert_eq!(store.options().fetch_concurrency(), 1);
    assert_eq!(store.relations().concurrency(), 1);

    let docs = (0..40).map(|i| user(&i.to_string(), "n")).collect::<Vec<_>>();
    store.typed_collection::<User>().insert(docs.clone()).await.unwrap();

    let ids = docs.iter().rev().map(|u| u.id).collect::<Vec<_>>();
    let expected = docs.iter().rev().cloned().map(Some).collect::<Vec<_>>();

    assert_eq!(store.relations().get_all(ids.clone()).await.unwrap(), expected);
    assert_eq!(
        store.relations().with_concurrency(64).get_all(ids).await.unwrap(),
        expected
    );
}

#[tokio::test]
async fn free_functions_match_store_relations() {
    let store = store().await;
    let (u, s) = (user("u", "You"), session("one"));

    store.typed_collection::<User>().insert(vec![u.clone()]).await.unwrap();
    store.typed_collection::<Session>().insert(vec![s.clone()]).await.unwrap();
    store.typed_collection::<Edge>().insert(vec![edge(&u, &s)]).await.unwrap();

    let backend = store.backend();

    assert_eq!(relations::get_all(backend, [u.id]).await.unwrap(), vec![Some(u.clone())]);
    assert_eq!(relations::get_all_or_throw(backend, [u.id]).await.unwrap(), vec![u.clone()]);
    assert_eq!(
        relations::get_one_from(backend, users::TokenIdentifier, "u").await.unwrap(),
        Some(u.clone())
    );
    assert_eq!(
        relations::get_one_from_or_throw(backend, users::TokenIdentifier, "u").await.unwrap(),
        u.clone()
    );
    assert_eq!(
        relations::get_many_from(backend, (users::ByName, users::Name), "You").await.unwrap(),
        vec![u.clone()]
    );
    assert_eq!(
        relations::get_many_via(backend, edges::SessionId, edges::UserId, u.id).await.unwrap(),
        vec![Some(s.clone())]
    );
    assert_eq!(
        relations::get_many_via_or_throw(backend, edges::SessionId, edges::UserId, u.id).await.unwrap(),
        vec![s]
    );
}

#[tokio::test]
async fn updated_documents_are_seen_by_lookups() {
    let store = store().await;
    let mut u = user("old", "You");
    store.typed_collection::<User>().insert(vec![u.clone()]).await.unwrap();

    u.token_identifier = "new".to_string();
    store.typed_collection::<User>().update(vec![u.clone()]).await.unwrap();

    let relations = store.relations();
    assert_eq!(relations.get_one_from(users::TokenIdentifier, "old").await.unwrap(), None);
    assert_eq!(relations.get_one_from(users::TokenIdentifier, "new").await.unwrap(), Some(u));
}

#[tokio::test]
async fn lookups_need_registered_indexes() {
    let store = DocumentStore::new(InMemoryStore::new());

    let err = store
        .relations()
        .get_one_from(users::TokenIdentifier, "b")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DocumentStoreError::IndexNotFound(index, collection) if index == "token_identifier" && collection == "users"
    ));
}

/// Delegates writes to an in-memory store and fails every read.
#[derive(Debug, Default)]
struct FailingReads(InMemoryStore);

fn read_failure() -> DocumentStoreError {
    DocumentStoreError::Backend("read failed".to_string())
}

#[async_trait]
impl StoreBackend for FailingReads {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        self.0.insert_documents(documents, collection).await
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        self.0.update_documents(documents, collection).await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        self.0.delete_documents(ids, collection).await
    }

    async fn get_document(&self, _id: Uuid, _collection: &str) -> DocumentStoreResult<Option<Bson>> {
        Err(read_failure())
    }

    async fn system_get(&self, _id: Uuid, _collection: &str) -> DocumentStoreResult<Option<Bson>> {
        Err(read_failure())
    }

    async fn query_index(
        &self,
        _collection: &str,
        _index: &str,
        _field: &str,
        _value: Bson,
    ) -> DocumentStoreResult<Vec<Bson>> {
        Err(read_failure())
    }

    async fn add_index(&self, collection: &str, index: IndexDef) -> DocumentStoreResult<()> {
        self.0.add_index(collection, index).await
    }

    async fn drop_index(&self, collection: &str, index: &str) -> DocumentStoreResult<()> {
        self.0.drop_index(collection, index).await
    }

    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexDef>> {
        self.0.list_indexes(collection).await
    }
}

#[tokio::test]
async fn backend_errors_propagate() {
    let store = DocumentStore::new(FailingReads::default());
    let u = user("u", "You");
    store.typed_collection::<User>().insert(vec![u.clone()]).await.unwrap();

    let relations = store.relations();

    assert!(matches!(relations.get_all([u.id]).await, Err(DocumentStoreError::Backend(_))));
    assert!(matches!(
        relations.get_one_from(users::TokenIdentifier, "u").await,
        Err(DocumentStoreError::Backend(_))
    ));
    assert!(matches!(
        relations.get_many_via(edges::SessionId, edges::UserId, u.id).await,
        Err(DocumentStoreError::Backend(_))
    ));
}
