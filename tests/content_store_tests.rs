use bytes::Bytes;
use bitswap_depot::content_store::{content_hash, ContentStore, ContentStoreError, LocalStore};
use tokio::io::AsyncReadExt;

async fn read_object(store: &LocalStore, hash: &str) -> Vec<u8> {
    let mut object = store.get(hash).await.unwrap();
    let mut buf = Vec::new();
    object.reader.read_to_end(&mut buf).await.unwrap();
    assert_eq!(object.len, buf.len() as u64);
    buf
}

#[tokio::test]
async fn test_put_get_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path());

    let data = Bytes::from("hello world");
    let stored = store.put(data.clone()).await.unwrap();

    assert_eq!(stored.hash, content_hash(&data));
    assert_eq!(stored.size, 11);
    assert!(stored.created);
    assert_eq!(stored.path, format!("{}/data", stored.hash));
    assert_eq!(read_object(&store, &stored.hash).await, data.to_vec());
}

#[tokio::test]
async fn test_put_is_idempotent_for_equal_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path());

    let first = store.put(Bytes::from("same")).await.unwrap();
    let second = store.put(Bytes::from("same")).await.unwrap();

    assert_eq!(first.hash, second.hash);
    assert!(first.created);
    assert!(!second.created);
    // No second copy is written
    assert_eq!(second.path, first.path);
    let entries = std::fs::read_dir(dir.path().join(&first.hash)).unwrap().count();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_distinct_content_gets_distinct_objects() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path());

    let a = store.put(Bytes::from("alpha")).await.unwrap();
    let b = store.put(Bytes::from("beta")).await.unwrap();

    assert_ne!(a.hash, b.hash);
    assert_eq!(read_object(&store, &a.hash).await, b"alpha");
    assert_eq!(read_object(&store, &b.hash).await, b"beta");
}

#[tokio::test]
async fn test_exists() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path());

    let missing = content_hash(b"missing");
    assert!(!store.exists(&missing).await.unwrap());

    let stored = store.put(Bytes::from("data")).await.unwrap();
    assert!(store.exists(&stored.hash).await.unwrap());
}

#[tokio::test]
async fn test_get_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path());

    let result = store.get(&content_hash(b"never stored")).await;
    assert!(matches!(result, Err(ContentStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_non_hash_keys_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("store"));
    std::fs::write(dir.path().join("secret"), b"outside").unwrap();

    assert!(!store.exists("../secret").await.unwrap());
    assert!(matches!(
        store.get("../secret").await,
        Err(ContentStoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_root_is_created_lazily() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("uploads");
    let store = LocalStore::new(&root);
    assert_eq!(store.base_path(), root.as_path());

    assert!(!root.exists());
    assert!(!store.exists(&content_hash(b"x")).await.unwrap());
    assert!(!root.exists());

    store.put(Bytes::from("x")).await.unwrap();
    assert!(root.is_dir());
}

#[tokio::test]
async fn test_concurrent_puts_share_one_object() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path());
    let data = Bytes::from("raced bytes");

    let (a, b) = tokio::join!(store.put(data.clone()), store.put(data.clone()));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.hash, b.hash);
    assert_eq!(a.path, b.path);
    let entries = std::fs::read_dir(dir.path().join(&a.hash)).unwrap().count();
    assert_eq!(entries, 1);
    assert_eq!(read_object(&store, &a.hash).await, data.to_vec());

    // Nothing is left behind in the staging area
    let staged = std::fs::read_dir(dir.path().join(".tmp")).unwrap().count();
    assert_eq!(staged, 0);
}
