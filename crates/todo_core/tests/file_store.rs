use std::fs;
use std::path::Path;
use todo_core::{FileTodoStore, StoreError, TodoStore};

const TWO_ITEMS: &str = r#"[
    {"id": 1, "name": "first", "created_at": "2022-04-20T14:32:28.901094+01:00", "updated_at": "2022-04-20T14:32:28.901094+01:00"},
    {"id": 2, "name": "second", "created_at": "2022-04-20T14:33:00+01:00", "updated_at": "2022-04-21T09:00:00+01:00"}
]"#;

fn store_with(dir: &Path, contents: &str) -> FileTodoStore {
    let path = dir.join("todo.json");
    fs::write(&path, contents).unwrap();
    FileTodoStore::open(path)
}

#[test]
fn reads_all_items_from_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(dir.path(), TWO_ITEMS);

    let items = store.get_all_items();
    assert_eq!(items.count, 2);
    assert_eq!(items.items[0].id, 1);
    assert_eq!(items.items[0].name, "first");
    assert_eq!(items.items[1].id, 2);
    assert_eq!(items.items[1].name, "second");
    assert_eq!(store.max_id(), 2);
}

#[test]
fn gets_single_item_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(dir.path(), TWO_ITEMS);

    let item = store.get_item(2).unwrap();
    assert_eq!(item.id, 2);
    assert_eq!(item.name, "second");
    assert!(store.get_item(3).is_none());
}

#[test]
fn add_two_items_to_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileTodoStore::open(dir.path().join("todo.json"));

    assert!(store.get_all_items().is_empty());
    store.add_item("first").unwrap();
    store.add_item("second").unwrap();

    let items = store.get_all_items();
    let summary: Vec<_> = items
        .items
        .iter()
        .map(|item| (item.id, item.name.as_str()))
        .collect();
    assert_eq!(summary, vec![(1, "first"), (2, "second")]);
    assert_eq!(items.count, 2);
    assert_eq!(items.max_name_length, 6);
}

#[test]
fn new_item_has_equal_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileTodoStore::open(dir.path().join("todo.json"));

    let item = store.add_item("").unwrap();
    assert_eq!(item.name, "");
    assert_eq!(item.created_at, item.updated_at);
}

#[test]
fn missing_file_opens_empty_and_is_created_on_first_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.json");
    let mut store = FileTodoStore::open(&path);

    assert!(store.get_all_items().is_empty());
    assert!(!path.exists());

    store.add_item("created").unwrap();
    assert!(path.exists());
}

#[test]
fn unparseable_or_empty_file_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(store_with(dir.path(), "").get_all_items().is_empty());
    assert!(store_with(dir.path(), "   \n").get_all_items().is_empty());

    let mut store = store_with(dir.path(), "{not json");
    assert!(store.get_all_items().is_empty());

    let added = store.add_item("fresh start").unwrap();
    assert_eq!(added.id, 1);
    let reopened = FileTodoStore::open(dir.path().join("todo.json"));
    assert_eq!(reopened.get_all_items().count, 1);
}

#[test]
fn reopen_preserves_id_name_and_full_precision_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.json");

    let added = {
        let mut store = FileTodoStore::open(&path);
        store.add_item("Buy milk").unwrap()
    };

    let reopened = FileTodoStore::open(&path);
    let loaded = reopened.get_item(added.id).unwrap();
    assert_eq!(loaded, added);
}

#[test]
fn persisted_file_is_a_json_array_of_items() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.json");
    let mut store = FileTodoStore::open(&path);
    store.add_item("Buy milk").unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let first = &raw.as_array().unwrap()[0];
    assert_eq!(first["id"], 1);
    assert_eq!(first["name"], "Buy milk");
    assert!(first["created_at"].is_string());
    assert!(first["updated_at"].is_string());
}

#[test]
fn ids_are_not_reused_after_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileTodoStore::open(dir.path().join("todo.json"));

    store.add_item("a").unwrap();
    let b = store.add_item("b").unwrap();
    store.delete_items(&[b.id]).unwrap();
    assert_eq!(store.add_item("c").unwrap().id, 3);

    store.delete_all_items().unwrap();
    assert_eq!(store.add_item("d").unwrap().id, 4);
}

#[test]
fn fail_fast_delete_reports_missing_id_without_removing_anything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.json");
    let mut store = store_with(dir.path(), TWO_ITEMS);
    let before_on_disk = fs::read_to_string(&path).unwrap();

    let err = store.delete_items(&[1, 99]).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(99)));
    assert!(!err.is_persistence_failure());

    assert!(store.get_item(1).is_some());
    assert_eq!(store.get_all_items().count, 2);
    assert_eq!(fs::read_to_string(&path).unwrap(), before_on_disk);
}

#[test]
fn delete_counts_each_id_once_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.json");
    let mut store = store_with(dir.path(), TWO_ITEMS);

    assert_eq!(store.delete_items(&[1, 1]).unwrap(), 1);
    assert_eq!(store.delete_items(&[]).unwrap(), 0);

    let reopened = FileTodoStore::open(&path);
    let ids: Vec<_> = reopened.get_all_items().items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![2]);
}

#[test]
fn delete_all_returns_prior_count_and_empties_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.json");
    let mut store = store_with(dir.path(), TWO_ITEMS);

    assert_eq!(store.delete_all_items().unwrap(), 2);
    assert!(store.get_all_items().is_empty());
    assert!(FileTodoStore::open(&path).get_all_items().is_empty());
}

#[test]
fn edit_changes_name_and_advances_updated_at_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileTodoStore::open(dir.path().join("todo.json"));
    let original = store.add_item("value1").unwrap();

    let edited = store.edit_item(original.id, "value2").unwrap();
    assert_eq!(edited.id, original.id);
    assert_eq!(edited.name, "value2");
    assert_eq!(edited.created_at, original.created_at);
    assert!(edited.updated_at > original.updated_at);
    assert_eq!(store.get_item(original.id).unwrap(), edited);
}

#[test]
fn edit_missing_item_is_not_found_and_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_with(dir.path(), TWO_ITEMS);
    let before = store.get_all_items();

    let err = store.edit_item(42, "nope").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(42)));
    assert_eq!(store.get_all_items(), before);
}

#[test]
fn legacy_items_without_updated_at_load_with_created_at() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with(
        dir.path(),
        r#"[{"id": 1,"name": "first","created_at": "2022-04-20T14:32:28.901094+01:00"}]"#,
    );

    let item = store.get_item(1).unwrap();
    assert_eq!(item.updated_at, item.created_at);
}

#[test]
fn save_failure_is_reported_but_memory_keeps_the_change() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileTodoStore::open(dir.path().join("missing-dir").join("todo.json"));

    let err = store.add_item("unsaved").unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
    assert!(err.is_persistence_failure());

    let items = store.get_all_items();
    assert_eq!(items.count, 1);
    assert_eq!(items.items[0].name, "unsaved");
}

#[test]
fn returned_items_are_copies() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileTodoStore::open(dir.path().join("todo.json"));
    store.add_item("keep me").unwrap();

    let mut copy = store.get_item(1).unwrap();
    copy.name = "changed outside".to_string();
    let mut listed = store.get_all_items();
    listed.items[0].name.clear();

    assert_eq!(store.get_item(1).unwrap().name, "keep me");
}

#[test]
fn id_space_exhaustion_fails_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.json");
    let mut store = store_with(
        dir.path(),
        r#"[{"id": 9223372036854775807, "name": "last", "created_at": "2022-04-20T10:00:00Z"}]"#,
    );
    let before_on_disk = fs::read_to_string(&path).unwrap();

    let err = store.add_item("next").unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
    assert_eq!(store.max_id(), i64::MAX);
    assert_eq!(store.get_all_items().count, 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), before_on_disk);
}

#[test]
fn reopen_after_delete_all_restarts_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.json");
    {
        let mut store = FileTodoStore::open(&path);
        store.add_item("a").unwrap();
        store.add_item("b").unwrap();
        store.delete_all_items().unwrap();
    }

    let mut reopened = FileTodoStore::open(&path);
    assert_eq!(reopened.add_item("c").unwrap().id, 1);
}
