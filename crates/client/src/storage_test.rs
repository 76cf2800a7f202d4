use super::*;

#[test]
fn memory_store_round_trips_auth_token() {
    let store = MemoryStore::new();
    assert_eq!(load_auth_token(&store), None);

    assert!(save_auth_token(&store, "abc"));
    assert_eq!(load_auth_token(&store).as_deref(), Some("abc"));
    assert!(store.exists(AUTH_TOKEN_KEY));

    clear_auth_token(&store);
    assert_eq!(load_auth_token(&store), None);
}

#[test]
fn empty_token_reads_as_absent() {
    let store = MemoryStore::new();
    save_auth_token(&store, "");
    assert_eq!(load_auth_token(&store), None);
}

#[test]
fn load_ignores_values_that_fail_to_decode() {
    let store = MemoryStore::new();
    store.save_raw("prefs", "{not json");
    assert_eq!(load::<serde_json::Value>(&store, "prefs"), None);
}

#[test]
fn file_store_creates_directory_and_persists() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::new(tmp.path().join("nested").join("gather"));

    assert!(save_auth_token(&store, "file-token"));
    assert!(store.dir().join("token.json").exists());

    let reopened = FileStore::new(store.dir());
    assert_eq!(load_auth_token(&reopened).as_deref(), Some("file-token"));

    clear_auth_token(&reopened);
    assert!(!reopened.exists(AUTH_TOKEN_KEY));
}

#[test]
fn file_store_sanitizes_keys() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::new(tmp.path());

    assert!(store.save_raw("a/b:c", "\"v\""));
    assert!(tmp.path().join("a_b_c.json").exists());
    assert_eq!(store.load_raw("a/b:c").as_deref(), Some("\"v\""));
}
