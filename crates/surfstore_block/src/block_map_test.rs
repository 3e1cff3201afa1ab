use pretty_assertions::assert_eq;

use super::BlockMap;

#[test]
fn round_trip_store_has_get() {
    let map = BlockMap::new();
    assert!(!map.has("h1"));
    map.store("h1".to_string(), b"cat_block0".to_vec());
    assert!(map.has("h1"));
    assert_eq!(map.get("h1").unwrap(), b"cat_block0".to_vec());
}

#[test]
fn get_on_absent_key_returns_none() {
    let map = BlockMap::new();
    assert_eq!(map.get("missing"), None);
}

#[test]
fn store_is_idempotent() {
    let map = BlockMap::new();
    map.store("h1".to_string(), b"a".to_vec());
    map.store("h1".to_string(), b"a".to_vec());
    assert_eq!(map.get("h1").unwrap(), b"a".to_vec());
}

#[test]
fn store_overwrites_existing_block() {
    let map = BlockMap::new();
    map.store("h1".to_string(), b"first".to_vec());
    map.store("h1".to_string(), b"second".to_vec());
    assert_eq!(map.get("h1").unwrap(), b"second".to_vec());
}
