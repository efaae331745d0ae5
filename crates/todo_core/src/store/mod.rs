//! Todo store contract and backend implementations.
//!
//! # Responsibility
//! - Define the CRUD contract every persistence backend satisfies.
//! - Provide the JSON file, SQLite and remote document backends.
//!
//! # Invariants
//! - Stores own id allocation; callers never supply ids on create.
//! - Reads never fail observably: internal errors are logged and yield an
//!   empty collection or `None`.
//! - Not-found, persistence failure and partial batch matches stay distinct:
//!   `StoreError::NotFound`, the persistence variants, and a count lower than
//!   the number of requested ids.
//!
//! # Backend differences
//! - `delete_items` is fail-fast on the file backend, best-effort on SQLite,
//!   and visit-counting on the document backend.
//! - The document backend allocates ids without any locking and can hand out
//!   the same id to two concurrent writers.

use crate::db::DbError;
use crate::model::todo::{Todo, TodoCollection, TodoId, TodoValidationError};
use crate::remote::RemoteError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod document_store;
pub mod file_store;
pub mod sqlite_store;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error returned by mutating store operations.
#[derive(Debug)]
pub enum StoreError {
    /// No item carries the requested id.
    NotFound(TodoId),
    /// File read/write failure.
    Io(std::io::Error),
    /// JSON snapshot could not be produced.
    Encode(serde_json::Error),
    /// SQLite failure, including rolled-back transactions.
    Db(DbError),
    /// Remote document service failure.
    Remote(RemoteError),
    /// Persisted state violates an item invariant.
    InvalidData(String),
    /// Store could not be constructed from the given settings.
    InvalidConfig(String),
}

impl StoreError {
    /// True for failures to durably write or read back state.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Encode(_) | Self::Db(_) | Self::Remote(_)
        )
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::Io(err) => write!(f, "todo file i/o failed: {err}"),
            Self::Encode(err) => write!(f, "todo file encoding failed: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
            Self::InvalidConfig(message) => write!(f, "invalid store configuration: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) | Self::InvalidConfig(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RemoteError> for StoreError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<TodoValidationError> for StoreError {
    fn from(value: TodoValidationError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// CRUD contract shared by every todo backend.
pub trait TodoStore {
    /// Returns every item sorted by id with summary stats. Never fails.
    fn get_all_items(&self) -> TodoCollection;
    /// Exact-id lookup.
    fn get_item(&self, id: TodoId) -> Option<Todo>;
    /// Allocates the next id and persists a new item stamped with "now".
    fn add_item(&mut self, name: &str) -> StoreResult<Todo>;
    /// Deletes a batch of ids and returns how many were removed.
    fn delete_items(&mut self, ids: &[TodoId]) -> StoreResult<usize>;
    /// Deletes everything and returns how many items were removed.
    fn delete_all_items(&mut self) -> StoreResult<usize>;
    /// Renames one item and advances its `updated_at`.
    fn edit_item(&mut self, id: TodoId, name: &str) -> StoreResult<Todo>;
}

impl<S: TodoStore + ?Sized> TodoStore for Box<S> {
    fn get_all_items(&self) -> TodoCollection {
        (**self).get_all_items()
    }

    fn get_item(&self, id: TodoId) -> Option<Todo> {
        (**self).get_item(id)
    }

    fn add_item(&mut self, name: &str) -> StoreResult<Todo> {
        (**self).add_item(name)
    }

    fn delete_items(&mut self, ids: &[TodoId]) -> StoreResult<usize> {
        (**self).delete_items(ids)
    }

    fn delete_all_items(&mut self) -> StoreResult<usize> {
        (**self).delete_all_items()
    }

    fn edit_item(&mut self, id: TodoId, name: &str) -> StoreResult<Todo> {
        (**self).edit_item(id, name)
    }
}
