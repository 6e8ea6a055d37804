use kvledger::domain::ports::{CheckedSub, KvStoreBox};
use kvledger::infrastructure::in_memory::InMemoryKvStore;

#[tokio::test]
async fn test_store_as_trait_object() {
    let store: KvStoreBox = Box::new(InMemoryKvStore::new());

    // Verify Send + Sync by moving the boxed store into a task
    let handle = tokio::spawn(async move {
        store.set_if_absent("alice", 0).await.unwrap();
        store.atomic_add("alice", 10).await.unwrap();
        store.checked_sub("alice", 4).await.unwrap()
    });

    assert_eq!(handle.await.unwrap(), CheckedSub::Applied(6));
}

#[tokio::test]
async fn test_clones_share_state() {
    let store = InMemoryKvStore::new();
    let boxed: KvStoreBox = Box::new(store.clone());

    boxed.set("bob", 3).await.unwrap();
    assert_eq!(
        kvledger::domain::ports::KvStore::get(&store, "bob").await.unwrap(),
        3
    );
}
