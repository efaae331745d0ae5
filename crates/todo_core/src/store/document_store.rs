//! Remote document collection backed todo store.
//!
//! # Responsibility
//! - Map each todo onto one document in a flat collection.
//! - Translate the store contract into client queries and batched writes.
//!
//! # Invariants
//! - The todo id lives in the `ID` field; lookups are `ID == ?` queries.
//! - Reads skip documents that do not decode into a valid todo.
//!
//! # Consistency limits
//! - Id allocation reads the newest document (by `CreatedAt`) and adds one.
//!   Two concurrent writers can compute the same id, and deleting the newest
//!   item lets its id be handed out again. There is no compare-and-swap.
//!   A newest id of `TodoId::MAX` makes `add_item` fail instead of wrapping.
//! - Deletes report the number of documents visited, not confirmed deleted.
//!   A failed batch flush is logged but still counted.

use crate::model::todo::{now_millis, Todo, TodoCollection, TodoId};
use crate::remote::{
    BulkWriter, Direction, Document, DocumentClient, DocumentQuery, FieldUpdate, FieldValue,
    Fields, MAX_IN_FILTER_VALUES,
};
use crate::store::{StoreError, StoreResult, TodoStore};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::collections::BTreeSet;

/// Default collection holding todo documents.
pub const COLLECTION: &str = "todos";

const FIELD_ID: &str = "ID";
const FIELD_NAME: &str = "Name";
const FIELD_CREATED_AT: &str = "CreatedAt";
const FIELD_UPDATED_AT: &str = "UpdatedAt";

/// Connection settings for the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStoreConfig {
    /// Hosted project the collection belongs to. Must not be empty.
    pub project_id: String,
    pub collection: String,
}

impl DocumentStoreConfig {
    /// Settings for the default `todos` collection of `project_id`.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            collection: COLLECTION.to_string(),
        }
    }
}

/// Todo store over a [`DocumentClient`].
pub struct DocumentTodoStore<C: DocumentClient> {
    client: C,
    config: DocumentStoreConfig,
}

impl<C: DocumentClient> DocumentTodoStore<C> {
    /// Validates settings and wraps the client.
    pub fn new(config: DocumentStoreConfig, client: C) -> StoreResult<Self> {
        if config.project_id.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "a document store project id is required".to_string(),
            ));
        }
        if config.collection.trim().is_empty() {
            return Err(StoreError::InvalidConfig(
                "a document store collection name is required".to_string(),
            ));
        }

        info!(
            "event=remote_open module=document_store status=ok project={} collection={}",
            config.project_id, config.collection
        );
        Ok(Self { client, config })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &DocumentStoreConfig {
        &self.config
    }

    fn collection(&self) -> &str {
        &self.config.collection
    }

    fn next_id(&self) -> StoreResult<TodoId> {
        let newest = self.client.query(
            self.collection(),
            &DocumentQuery::all()
                .order_by(FIELD_CREATED_AT, Direction::Descending)
                .limit(1),
        )?;

        let Some(document) = newest.first() else {
            return Ok(1);
        };
        let newest_id = integer_field(&document.fields, FIELD_ID)?;
        newest_id.checked_add(1).ok_or_else(|| {
            StoreError::InvalidData(format!("id space exhausted after {newest_id}"))
        })
    }

    fn find_document(&self, id: TodoId) -> StoreResult<Option<Document>> {
        let mut documents = self.client.query(
            self.collection(),
            &DocumentQuery::where_eq(FIELD_ID, FieldValue::Integer(id)).limit(1),
        )?;
        Ok(documents.pop())
    }

    fn delete_documents(&self, documents: Vec<Document>, operation: &'static str) -> usize {
        let mut writer = BulkWriter::new(&self.client);
        for document in documents {
            writer.delete(document.reference);
        }
        let visited = writer.pending();

        if let Err(err) = writer.flush() {
            error!(
                "event=todo_{operation} module=document_store status=error count={visited} error={err}"
            );
        } else {
            info!("event=todo_{operation} module=document_store status=ok count={visited}");
        }
        visited
    }
}

impl<C: DocumentClient> TodoStore for DocumentTodoStore<C> {
    fn get_all_items(&self) -> TodoCollection {
        let documents = match self.client.query(self.collection(), &DocumentQuery::all()) {
            Ok(documents) => documents,
            Err(err) => {
                warn!("event=todo_list module=document_store status=error error={err}");
                return TodoCollection::default();
            }
        };

        let items = documents
            .iter()
            .filter_map(|document| match todo_from_fields(&document.fields) {
                Ok(todo) => Some(todo),
                Err(err) => {
                    warn!(
                        "event=todo_list module=document_store status=skipped document={} error={err}",
                        document.reference.id
                    );
                    None
                }
            })
            .collect();

        TodoCollection::from_items(items)
    }

    fn get_item(&self, id: TodoId) -> Option<Todo> {
        let result = self
            .find_document(id)
            .and_then(|document| document.map(|doc| todo_from_fields(&doc.fields)).transpose());

        match result {
            Ok(todo) => todo,
            Err(err) => {
                warn!("event=todo_get module=document_store status=error id={id} error={err}");
                None
            }
        }
    }

    fn add_item(&mut self, name: &str) -> StoreResult<Todo> {
        let id = self.next_id()?;
        let todo = Todo::new(id, name, now_millis());

        match self.client.add(self.collection(), todo_to_fields(&todo)) {
            Ok(reference) => {
                info!(
                    "event=todo_add module=document_store status=ok id={id} document={}",
                    reference.id
                );
                Ok(todo)
            }
            Err(err) => {
                error!("event=todo_add module=document_store status=error id={id} error={err}");
                Err(err.into())
            }
        }
    }

    fn delete_items(&mut self, ids: &[TodoId]) -> StoreResult<usize> {
        let values: Vec<FieldValue> = ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(FieldValue::Integer)
            .collect();

        let mut documents = Vec::new();
        for chunk in values.chunks(MAX_IN_FILTER_VALUES) {
            documents.extend(self.client.query(
                self.collection(),
                &DocumentQuery::where_in(FIELD_ID, chunk.to_vec()),
            )?);
        }

        Ok(self.delete_documents(documents, "delete"))
    }

    fn delete_all_items(&mut self) -> StoreResult<usize> {
        let documents = self.client.query(self.collection(), &DocumentQuery::all())?;
        Ok(self.delete_documents(documents, "delete_all"))
    }

    fn edit_item(&mut self, id: TodoId, name: &str) -> StoreResult<Todo> {
        let document = self.find_document(id)?.ok_or(StoreError::NotFound(id))?;
        let mut todo = todo_from_fields(&document.fields)?;
        todo.rename(name, now_millis());

        let updates = [
            FieldUpdate::new(FIELD_NAME, FieldValue::Text(todo.name.clone())),
            FieldUpdate::new(FIELD_UPDATED_AT, FieldValue::Timestamp(todo.updated_at)),
        ];
        if let Err(err) = self.client.update(&document.reference, &updates) {
            error!("event=todo_edit module=document_store status=error id={id} error={err}");
            return Err(err.into());
        }

        info!("event=todo_edit module=document_store status=ok id={id}");
        Ok(todo)
    }
}

fn todo_to_fields(todo: &Todo) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_ID.to_string(), FieldValue::Integer(todo.id));
    fields.insert(FIELD_NAME.to_string(), FieldValue::Text(todo.name.clone()));
    fields.insert(
        FIELD_CREATED_AT.to_string(),
        FieldValue::Timestamp(todo.created_at),
    );
    fields.insert(
        FIELD_UPDATED_AT.to_string(),
        FieldValue::Timestamp(todo.updated_at),
    );
    fields
}

fn todo_from_fields(fields: &Fields) -> StoreResult<Todo> {
    let id = integer_field(fields, FIELD_ID)?;
    let name = match fields.get(FIELD_NAME) {
        Some(FieldValue::Text(name)) => name.clone(),
        other => return Err(field_error(FIELD_NAME, other)),
    };
    let created_at = timestamp_field(fields, FIELD_CREATED_AT)?;
    // Documents written before edits tracked UpdatedAt only carry CreatedAt.
    let updated_at = match fields.get(FIELD_UPDATED_AT) {
        None => created_at,
        Some(_) => timestamp_field(fields, FIELD_UPDATED_AT)?,
    };

    let todo = Todo {
        id,
        name,
        created_at,
        updated_at,
    };
    todo.validate()?;
    Ok(todo)
}

fn integer_field(fields: &Fields, field: &'static str) -> StoreResult<i64> {
    match fields.get(field) {
        Some(FieldValue::Integer(value)) => Ok(*value),
        other => Err(field_error(field, other)),
    }
}

fn timestamp_field(fields: &Fields, field: &'static str) -> StoreResult<DateTime<Utc>> {
    match fields.get(field) {
        Some(FieldValue::Timestamp(value)) => Ok(*value),
        other => Err(field_error(field, other)),
    }
}

fn field_error(field: &str, value: Option<&FieldValue>) -> StoreError {
    match value {
        None => StoreError::InvalidData(format!("document is missing field `{field}`")),
        Some(value) => StoreError::InvalidData(format!(
            "document field `{field}` has unexpected value {value:?}"
        )),
    }
}
