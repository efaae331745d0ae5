//! SQLite backed todo store.
//!
//! # Responsibility
//! - Persist todos in the `todo_item` table, one row per item.
//! - Run every mutation in its own explicit transaction.
//!
//! # Invariants
//! - Timestamps are stored as integer epoch milliseconds; values handed out
//!   by this store are already truncated to milliseconds.
//! - Ids come from SQLite `AUTOINCREMENT` and are never reused.
//! - `delete_items` is best-effort: it commits whatever matched and rolls back
//!   only when nothing matched.
//! - `max_name_length` is computed in SQL and counts characters, the same
//!   measure the other backends use. `LENGTH()` stops at the first NUL, so
//!   NULs are swapped for a single-character placeholder before measuring.

use crate::db::{bootstrap_connection, open_db, open_db_in_memory};
use crate::model::todo::{now_millis, Todo, TodoCollection, TodoId};
use crate::store::{StoreError, StoreResult, TodoStore};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;

/// Default database file name.
pub const DB_FILE_NAME: &str = "todo.db";

const TODO_SELECT_SQL: &str = "SELECT
    id,
    created_at,
    updated_at,
    name
FROM todo_item";

/// Todo store over a migrated SQLite connection.
pub struct SqliteTodoStore {
    conn: Connection,
}

impl SqliteTodoStore {
    /// Opens (creating if missing) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Wraps an existing connection, applying pending migrations first.
    pub fn from_connection(mut conn: Connection) -> StoreResult<Self> {
        bootstrap_connection(&mut conn)?;
        Ok(Self { conn })
    }

    /// Underlying connection, for inspection and fixtures.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn load_all(&self) -> StoreResult<Vec<Todo>> {
        let mut stmt = self.conn.prepare(&format!("{TODO_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut todos = Vec::new();

        while let Some(row) = rows.next()? {
            match parse_todo_row(row) {
                Ok(todo) => todos.push(todo),
                Err(err) => warn!(
                    "event=todo_list module=sqlite_store status=skipped error_code=invalid_row error={err}"
                ),
            }
        }

        Ok(todos)
    }

    fn max_name_length(&self) -> StoreResult<usize> {
        let length: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(LENGTH(REPLACE(name, char(0), ' '))), 0) FROM todo_item;",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(length).unwrap_or(0))
    }
}

impl TodoStore for SqliteTodoStore {
    fn get_all_items(&self) -> TodoCollection {
        let result = self
            .load_all()
            .and_then(|items| Ok((items, self.max_name_length()?)));

        match result {
            Ok((items, max_name_length)) => {
                TodoCollection::with_max_name_length(items, max_name_length)
            }
            Err(err) => {
                warn!("event=todo_list module=sqlite_store status=error error={err}");
                TodoCollection::default()
            }
        }
    }

    fn get_item(&self, id: TodoId) -> Option<Todo> {
        match fetch_todo(&self.conn, id) {
            Ok(todo) => todo,
            Err(err) => {
                warn!("event=todo_get module=sqlite_store status=error id={id} error={err}");
                None
            }
        }
    }

    fn add_item(&mut self, name: &str) -> StoreResult<Todo> {
        let now = now_millis();
        let tx = self.conn.transaction()?;

        let inserted = {
            let mut stmt = tx.prepare(
                "INSERT INTO todo_item (created_at, updated_at, name)
                 VALUES (?1, ?2, ?3);",
            )?;
            stmt.execute(params![now.timestamp_millis(), now.timestamp_millis(), name])
        };

        match inserted {
            Ok(_) => {
                let id = tx.last_insert_rowid();
                tx.commit()?;
                info!("event=todo_add module=sqlite_store status=ok id={id}");
                Ok(Todo::new(id, name, now))
            }
            Err(err) => {
                error!("event=todo_add module=sqlite_store status=error error={err}");
                rollback(tx, "add");
                Err(err.into())
            }
        }
    }

    fn delete_items(&mut self, ids: &[TodoId]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        let matched = {
            let mut stmt = tx.prepare("DELETE FROM todo_item WHERE id = ?1;")?;
            let mut matched = 0;
            for id in ids {
                match stmt.execute(params![id]) {
                    Ok(changed) => matched += changed,
                    Err(err) => warn!(
                        "event=todo_delete module=sqlite_store status=error id={id} error={err}"
                    ),
                }
            }
            matched
        };

        if matched == 0 {
            debug!(
                "event=todo_delete module=sqlite_store status=none_matched batch_size={}",
                ids.len()
            );
            rollback(tx, "delete");
            return Ok(0);
        }

        tx.commit()?;
        info!(
            "event=todo_delete module=sqlite_store status=ok count={matched} batch_size={}",
            ids.len()
        );
        Ok(matched)
    }

    fn delete_all_items(&mut self) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;

        match tx.execute("DELETE FROM todo_item;", []) {
            Ok(changed) => {
                tx.commit()?;
                info!("event=todo_delete_all module=sqlite_store status=ok count={changed}");
                Ok(changed)
            }
            Err(err) => {
                error!("event=todo_delete_all module=sqlite_store status=error error={err}");
                rollback(tx, "delete_all");
                Err(err.into())
            }
        }
    }

    fn edit_item(&mut self, id: TodoId, name: &str) -> StoreResult<Todo> {
        let now = now_millis();
        let tx = self.conn.transaction()?;

        // MAX keeps updated_at strictly increasing when edits share a millisecond.
        let updated = {
            let mut stmt = tx.prepare(
                "UPDATE todo_item
                 SET
                    name = ?1,
                    updated_at = MAX(?2, updated_at + 1)
                 WHERE id = ?3;",
            )?;
            stmt.execute(params![name, now.timestamp_millis(), id])
        };

        match updated {
            Ok(0) => {
                rollback(tx, "edit");
                Err(StoreError::NotFound(id))
            }
            Ok(_) => {
                let todo = fetch_todo(&tx, id)?.ok_or(StoreError::NotFound(id))?;
                tx.commit()?;
                info!("event=todo_edit module=sqlite_store status=ok id={id}");
                Ok(todo)
            }
            Err(err) => {
                error!("event=todo_edit module=sqlite_store status=error id={id} error={err}");
                rollback(tx, "edit");
                Err(err.into())
            }
        }
    }
}

fn fetch_todo(conn: &Connection, id: TodoId) -> StoreResult<Option<Todo>> {
    let mut stmt = conn.prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
    let row = stmt
        .query_row(params![id], |row| Ok(parse_todo_row(row)))
        .optional()?;
    row.transpose()
}

fn parse_todo_row(row: &Row<'_>) -> StoreResult<Todo> {
    let id: TodoId = row.get("id")?;
    let created_at = millis_to_datetime(row.get("created_at")?, id, "created_at")?;
    let updated_at = millis_to_datetime(row.get("updated_at")?, id, "updated_at")?;

    let todo = Todo {
        id,
        name: row.get("name")?,
        created_at,
        updated_at,
    };
    todo.validate()?;
    Ok(todo)
}

fn millis_to_datetime(value: i64, id: TodoId, column: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "timestamp `{value}` out of range in todo_item.{column} for id {id}"
        ))
    })
}

fn rollback(tx: Transaction<'_>, operation: &'static str) {
    if let Err(err) = tx.rollback() {
        warn!("event=todo_rollback module=sqlite_store status=error op={operation} error={err}");
    }
}
