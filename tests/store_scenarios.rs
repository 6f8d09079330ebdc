//! End-to-end key store walkthrough against a database file

use apikeys::store::{ApiKeyStore, KeyField, StoreError};

#[tokio::test]
async fn key_lifecycle_walkthrough() {
    let dir = tempfile::tempdir().unwrap();
    let store = ApiKeyStore::new(dir.path().join("apikeys.db"));
    store.open().await.unwrap();

    // Fresh store
    assert!(store.list().await.unwrap().is_empty());
    assert!(store.get_active().await.unwrap().is_none());

    // Two keys, newest first, both inactive
    let prod = store.add("prod", "key1").await.unwrap();
    let dev = store.add("dev", "key2").await.unwrap();
    let keys = store.list().await.unwrap();
    assert_eq!(keys.iter().map(|k| k.name.as_str()).collect::<Vec<_>>(), vec!["dev", "prod"]);
    assert!(keys.iter().all(|k| !k.active));

    // Activate dev
    store.activate(dev).await.unwrap();
    assert_eq!(store.get_active().await.unwrap().unwrap().name, "dev");
    let keys = store.list().await.unwrap();
    assert!(keys.iter().find(|k| k.id == dev).unwrap().active);
    assert!(!keys.iter().find(|k| k.id == prod).unwrap().active);

    // Duplicate add is rejected and changes nothing
    let err = store.add("prod", "key1").await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { field: KeyField::Name }));
    assert_eq!(store.list().await.unwrap().len(), 2);

    // Activate prod, then delete it: nothing is active
    store.activate(prod).await.unwrap();
    store.delete(prod).await.unwrap();
    assert!(store.get_active().await.unwrap().is_none());
    let keys = store.list().await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].name, "dev");

    // Rename dev, keeping id, flag and value
    store.update(dev, "dev2", "key2").await.unwrap();
    let renamed = store.get(dev).await.unwrap().unwrap();
    assert_eq!(renamed.name, "dev2");
    assert_eq!(renamed.value(), "key2");
    assert!(!renamed.active);

    store.close().await.unwrap();

    // Data survives reopening the file
    let reopened = ApiKeyStore::new(dir.path().join("apikeys.db"));
    reopened.open().await.unwrap();
    assert_eq!(reopened.list().await.unwrap().len(), 1);
}
