//! Cursor persistence tests

use lead_collector::state::{Cursor, CursorStore};
use tempfile::TempDir;

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = CursorStore::new(dir.path().join("state.json"));

    let cursor = Cursor {
        offset: 40,
        index_in_page: 3,
        limit: 20,
    };
    store.save(&cursor).unwrap();
    assert_eq!(store.load(20), cursor);
}

#[test]
fn test_missing_file_loads_initial_cursor() {
    let dir = TempDir::new().unwrap();
    let store = CursorStore::new(dir.path().join("state.json"));
    assert_eq!(store.load(25), Cursor::initial(25));
}

#[test]
fn test_corrupt_file_loads_initial_cursor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{broken").unwrap();

    let store = CursorStore::new(&path);
    assert_eq!(store.load(20), Cursor::initial(20));
}

#[test]
fn test_latest_save_wins() {
    let dir = TempDir::new().unwrap();
    let store = CursorStore::new(dir.path().join("state.json"));

    store
        .save(&Cursor {
            offset: 0,
            index_in_page: 1,
            limit: 20,
        })
        .unwrap();
    store
        .save(&Cursor {
            offset: 20,
            index_in_page: 0,
            limit: 20,
        })
        .unwrap();

    let loaded = store.load(20);
    assert_eq!(loaded.offset, 20);
    assert_eq!(loaded.index_in_page, 0);
}

#[test]
fn test_document_layout_wraps_cursor_in_directory_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    let store = CursorStore::new(&path);

    store.save(&Cursor::initial(20)).unwrap();

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(doc.get("directory").is_some());
    assert_eq!(
        doc.pointer("/directory/offset").and_then(|v| v.as_u64()),
        Some(0)
    );
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let store = CursorStore::new(dir.path().join("nested/deeper/state.json"));
    store.save(&Cursor::initial(20)).unwrap();
    assert_eq!(store.load(20), Cursor::initial(20));
}
