//! Integration tests for stores over a runtime-selected backend.

mod support;

use doclink::{
    memory::InMemoryStore,
    store::{DynDocumentStore, IntoDynDocumentStore, StoreOptions},
};
use support::{Edge, Session, User, edge, edges, session, store_with, user, users};

async fn dyn_store() -> DynDocumentStore {
    store_with(StoreOptions::new().with_fetch_concurrency(4))
        .await
        .into_dyn()
}

#[tokio::test]
async fn relations_work_through_a_boxed_backend() {
    let store = dyn_store().await;
    let u = user("u", "You");
    let s = session("one");

    store.typed_collection::<User>().insert(vec![u.clone()]).await.unwrap();
    store.typed_collection::<Session>().insert(vec![s.clone()]).await.unwrap();
    store.typed_collection::<Edge>().insert(vec![edge(&u, &s)]).await.unwrap();

    let relations = store.relations();

    assert_eq!(relations.concurrency(), 4);
    assert_eq!(relations.get_all([u.id]).await.unwrap(), vec![Some(u.clone())]);
    assert_eq!(relations.get_one_from(users::TokenIdentifier, "u").await.unwrap(), Some(u.clone()));
    assert_eq!(
        relations.get_many_via(edges::SessionId, edges::UserId, u.id).await.unwrap(),
        vec![Some(s)]
    );
}

#[tokio::test]
async fn boxed_backend_downcasts_to_its_type() {
    let store = dyn_store().await;

    assert!(store.downcast_backend::<InMemoryStore>().is_some());
    assert_eq!(store.options().fetch_concurrency(), 4);

    store.shutdown().await.unwrap();
}
