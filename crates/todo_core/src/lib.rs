//! Storage core for a personal todo list.
//! One CRUD contract, three persistence backends: JSON file, SQLite and a
//! remote document collection.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod store;

pub use config::{open_store, ConfigError, StoreConfig, StoreMode};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::todo::{Todo, TodoCollection, TodoId, TodoValidationError};
pub use remote::{DocumentClient, MemoryDocumentClient, RemoteError};
pub use store::document_store::{DocumentStoreConfig, DocumentTodoStore};
pub use store::file_store::FileTodoStore;
pub use store::sqlite_store::SqliteTodoStore;
pub use store::{StoreError, StoreResult, TodoStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
