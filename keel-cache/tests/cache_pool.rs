use bytes::Bytes;
use keel_cache::{CachePool, CacheStore, FileStore, InMemoryStore};
use std::sync::Arc;

#[test]
fn test_cache_miss() {
    let pool = CachePool::in_memory("orm");
    let item = pool.get_item("missing");
    assert!(!item.is_hit());
    assert!(item.get().is_none());
}

#[test]
fn test_save_then_hit() {
    let pool = CachePool::in_memory("orm");
    let mut item = pool.get_item("metadata.User");
    item.set("payload");
    pool.save(&item).unwrap();

    let item = pool.get_item("metadata.User");
    assert!(item.is_hit());
    assert_eq!(item.get(), Some(&Bytes::from("payload")));
    assert!(pool.has_item("metadata.User"));
}

#[test]
fn test_pools_share_store_by_namespace() {
    let store = Arc::new(InMemoryStore::new());
    let a = CachePool::new(store.clone(), "a");
    let b = CachePool::new(store.clone(), "b");

    let mut item = a.get_item("key");
    item.set("1");
    a.save(&item).unwrap();

    assert!(!b.get_item("key").is_hit());
    assert_eq!(store.get("a.key"), Some(Bytes::from("1")));

    a.clear().unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_in_memory_store_prefix_removal() {
    let store = InMemoryStore::new();
    store.set("users:1", Bytes::from("a")).unwrap();
    store.set("users:2", Bytes::from("b")).unwrap();
    store.set("posts:1", Bytes::from("c")).unwrap();

    store.remove_by_prefix("users:").unwrap();
    assert_eq!(store.get("users:1"), None);
    assert_eq!(store.get("users:2"), None);
    assert_eq!(store.get("posts:1"), Some(Bytes::from("c")));
}

#[test]
fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let pool = CachePool::new(Arc::new(FileStore::open(dir.path()).unwrap()), "orm");
        let mut item = pool.get_item("connection.Article|Tag");
        item.set("junction");
        pool.save(&item).unwrap();
    }

    let pool = CachePool::new(Arc::new(FileStore::open(dir.path()).unwrap()), "orm");
    let item = pool.get_item("connection.Article|Tag");
    assert!(item.is_hit());
    assert_eq!(item.get(), Some(&Bytes::from("junction")));
}

#[test]
fn test_file_store_remove_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("cache")).unwrap();
    store.set("orm.a", Bytes::from("1")).unwrap();
    store.set("orm.b", Bytes::from("2")).unwrap();
    store.set("other.c", Bytes::from("3")).unwrap();

    store.remove("orm.a").unwrap();
    store.remove("orm.a").unwrap();
    assert_eq!(store.get("orm.a"), None);

    store.remove_by_prefix("orm.").unwrap();
    assert_eq!(store.get("orm.b"), None);
    assert_eq!(store.get("other.c"), Some(Bytes::from("3")));

    store.clear().unwrap();
    assert_eq!(store.get("other.c"), None);
}
