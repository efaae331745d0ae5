//! JSON file backed todo store.
//!
//! # Responsibility
//! - Hold the whole collection in memory, keyed and ordered by id.
//! - Mirror it to a single JSON array file after every mutation.
//!
//! # Invariants
//! - Ids come from `max_id + 1` and `max_id` never decreases, so ids are
//!   not reused while the store is alive, even after `delete_all_items`.
//! - `max_id` itself is not written to the file. Reopening derives it from
//!   the largest id still present, so ids freed before a reopen (all of
//!   them after `delete_all_items`) can be handed out again. The SQLite
//!   store does not reuse ids across reopen; this one does.
//! - Allocation past `TodoId::MAX` fails without touching memory or disk.
//! - A missing, empty or unparseable file opens as an empty collection.
//! - `delete_items` checks every id before removing any of them.
//!
//! # Known risks
//! - Saves truncate and rewrite the file in place. A failed save leaves the
//!   in-memory mutation applied, so memory and disk can diverge until the
//!   next successful save.
//! - Two processes sharing one file overwrite each other's changes.

use crate::model::todo::{Todo, TodoCollection, TodoId};
use crate::store::{StoreError, StoreResult, TodoStore};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default snapshot file name.
pub const FILE_NAME: &str = "todo.json";

/// On-disk record. Files written before `updated_at` existed omit it.
#[derive(Debug, Deserialize)]
struct StoredTodo {
    id: TodoId,
    name: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl StoredTodo {
    fn into_todo(self) -> Todo {
        let mut todo = Todo::new(self.id, self.name, self.created_at);
        match self.updated_at {
            Some(updated_at) if updated_at >= todo.created_at => todo.updated_at = updated_at,
            Some(_) => warn!(
                "event=todo_load module=file_store status=repaired id={} reason=updated_before_created",
                todo.id
            ),
            None => {}
        }
        todo
    }
}

/// Todo store persisted as a JSON array snapshot.
#[derive(Debug)]
pub struct FileTodoStore {
    path: PathBuf,
    items: BTreeMap<TodoId, Todo>,
    max_id: TodoId,
}

impl FileTodoStore {
    /// Loads the snapshot at `path`.
    ///
    /// Never fails: load problems are logged and produce an empty store.
    /// The file is not created until the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut items = BTreeMap::new();
        let mut max_id: TodoId = 0;

        for todo in load_items(&path) {
            max_id = max_id.max(todo.id);
            items.insert(todo.id, todo);
        }

        debug!(
            "event=todo_load module=file_store status=ok count={} max_id={}",
            items.len(),
            max_id
        );

        Self {
            path,
            items,
            max_id,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest id allocated or loaded so far.
    pub fn max_id(&self) -> TodoId {
        self.max_id
    }

    fn save(&self, operation: &'static str) -> StoreResult<()> {
        let result = encode_items(self.items.values())
            .and_then(|bytes| fs::write(&self.path, bytes).map_err(StoreError::from));

        match &result {
            Ok(()) => debug!(
                "event=todo_save module=file_store status=ok op={operation} count={}",
                self.items.len()
            ),
            Err(err) => error!(
                "event=todo_save module=file_store status=error op={operation} path={} error={err}",
                self.path.display()
            ),
        }
        result
    }
}

impl TodoStore for FileTodoStore {
    fn get_all_items(&self) -> TodoCollection {
        TodoCollection::from_items(self.items.values().cloned().collect())
    }

    fn get_item(&self, id: TodoId) -> Option<Todo> {
        self.items.get(&id).cloned()
    }

    fn add_item(&mut self, name: &str) -> StoreResult<Todo> {
        let id = next_id(self.max_id)?;
        self.max_id = id;
        let todo = Todo::new(id, name, Utc::now());
        self.items.insert(todo.id, todo.clone());

        self.save("add")?;
        info!("event=todo_add module=file_store status=ok id={}", todo.id);
        Ok(todo)
    }

    fn delete_items(&mut self, ids: &[TodoId]) -> StoreResult<usize> {
        if let Some(missing) = ids.iter().find(|id| !self.items.contains_key(*id)) {
            warn!(
                "event=todo_delete module=file_store status=not_found id={missing} batch_size={}",
                ids.len()
            );
            return Err(StoreError::NotFound(*missing));
        }

        let unique: BTreeSet<TodoId> = ids.iter().copied().collect();
        if unique.is_empty() {
            return Ok(0);
        }
        for id in &unique {
            self.items.remove(id);
        }

        self.save("delete")?;
        info!(
            "event=todo_delete module=file_store status=ok count={}",
            unique.len()
        );
        Ok(unique.len())
    }

    fn delete_all_items(&mut self) -> StoreResult<usize> {
        let count = self.items.len();
        self.items.clear();

        self.save("delete_all")?;
        info!("event=todo_delete_all module=file_store status=ok count={count}");
        Ok(count)
    }

    fn edit_item(&mut self, id: TodoId, name: &str) -> StoreResult<Todo> {
        let todo = self.items.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        todo.rename(name, Utc::now());
        let updated = todo.clone();

        self.save("edit")?;
        info!("event=todo_edit module=file_store status=ok id={id}");
        Ok(updated)
    }
}

fn next_id(max_id: TodoId) -> StoreResult<TodoId> {
    max_id.checked_add(1).ok_or_else(|| {
        error!(
            "event=todo_add module=file_store status=error error_code=id_space_exhausted max_id={max_id}"
        );
        StoreError::InvalidData(format!("id space exhausted after {max_id}"))
    })
}

fn encode_items<'a>(items: impl Iterator<Item = &'a Todo>) -> StoreResult<Vec<u8>> {
    let items: Vec<&Todo> = items.collect();
    let mut bytes = serde_json::to_vec(&items)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn load_items(path: &Path) -> Vec<Todo> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(
                "event=todo_load module=file_store status=empty reason=missing_file path={}",
                path.display()
            );
            return Vec::new();
        }
        Err(err) => {
            warn!(
                "event=todo_load module=file_store status=error error_code=read_failed path={} error={err}",
                path.display()
            );
            return Vec::new();
        }
    };

    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<StoredTodo>>(&raw) {
        Ok(records) => records.into_iter().map(StoredTodo::into_todo).collect(),
        Err(err) => {
            warn!(
                "event=todo_load module=file_store status=error error_code=parse_failed path={} error={err}",
                path.display()
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_items, StoredTodo};
    use chrono::{DateTime, Utc};

    #[test]
    fn legacy_record_without_updated_at_uses_created_at() {
        let record: StoredTodo = serde_json::from_str(
            r#"{"id": 1, "name": "first", "created_at": "2022-04-20T14:32:28.901094+01:00"}"#,
        )
        .unwrap();
        let todo = record.into_todo();

        assert_eq!(todo.updated_at, todo.created_at);
        assert_eq!(
            todo.created_at,
            "2022-04-20T13:32:28.901094Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn record_with_updated_before_created_is_clamped() {
        let record: StoredTodo = serde_json::from_str(
            r#"{"id": 4, "name": "x", "created_at": "2022-04-20T10:00:00Z", "updated_at": "2022-04-19T10:00:00Z"}"#,
        )
        .unwrap();
        let todo = record.into_todo();
        assert_eq!(todo.updated_at, todo.created_at);
    }

    #[test]
    fn empty_collection_encodes_as_empty_array() {
        let bytes = encode_items(std::iter::empty()).unwrap();
        assert_eq!(bytes, b"[]\n");
    }
}
