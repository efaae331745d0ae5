//! Remote document collection client seam.
//!
//! # Responsibility
//! - Describe the minimal document-database surface the remote todo store
//!   needs: filtered/ordered queries, inserts, field updates, batched deletes.
//! - Keep the wire client swappable; [`MemoryDocumentClient`] is the
//!   in-process implementation used offline and in tests.
//!
//! # Invariants
//! - Document identity ([`DocumentRef`]) is assigned by the client and is
//!   unrelated to any field stored inside the document.
//! - Clients provide no compare-and-swap; callers must not rely on one.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;

pub use memory::{FailurePoint, MemoryDocumentClient, MAX_IN_FILTER_VALUES};

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Typed field value, mirroring the scalar types of hosted document stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Orders values of the same type. Mixed types are incomparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Field map stored in one document.
pub type Fields = BTreeMap<String, FieldValue>;

/// Opaque client-assigned document identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

/// One document read from a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub reference: DocumentRef,
    pub fields: Fields,
}

/// Single-field filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter {
    Eq(String, FieldValue),
    In(String, Vec<FieldValue>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Collection query. The default value selects every document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentQuery {
    pub filter: Option<FieldFilter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn where_eq(field: impl Into<String>, value: FieldValue) -> Self {
        Self {
            filter: Some(FieldFilter::Eq(field.into(), value)),
            ..Self::default()
        }
    }

    pub fn where_in(field: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self {
            filter: Some(FieldFilter::In(field.into(), values)),
            ..Self::default()
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Field assignment applied by [`DocumentClient::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub field: String,
    pub value: FieldValue,
}

impl FieldUpdate {
    pub fn new(field: impl Into<String>, value: FieldValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

/// Remote transport/service errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Service could not be reached or refused the request.
    Unavailable(String),
    /// Target document does not exist.
    DocumentNotFound(DocumentRef),
    /// Filter not supported by the service (e.g. too many `in` values).
    InvalidQuery(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "remote store unavailable: {message}"),
            Self::DocumentNotFound(reference) => write!(
                f,
                "document not found: {}/{}",
                reference.collection, reference.id
            ),
            Self::InvalidQuery(message) => write!(f, "invalid remote query: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Blocking client for a remote document collection.
pub trait DocumentClient {
    /// Runs a query and returns matching documents in result order.
    fn query(&self, collection: &str, query: &DocumentQuery) -> RemoteResult<Vec<Document>>;
    /// Inserts a document under a new client-assigned identity.
    fn add(&self, collection: &str, fields: Fields) -> RemoteResult<DocumentRef>;
    /// Overwrites the given fields of an existing document.
    fn update(&self, reference: &DocumentRef, updates: &[FieldUpdate]) -> RemoteResult<()>;
    /// Deletes documents in one batched write. Missing documents are ignored.
    fn batch_delete(&self, references: &[DocumentRef]) -> RemoteResult<()>;
}

impl<C: DocumentClient + ?Sized> DocumentClient for &C {
    fn query(&self, collection: &str, query: &DocumentQuery) -> RemoteResult<Vec<Document>> {
        (**self).query(collection, query)
    }

    fn add(&self, collection: &str, fields: Fields) -> RemoteResult<DocumentRef> {
        (**self).add(collection, fields)
    }

    fn update(&self, reference: &DocumentRef, updates: &[FieldUpdate]) -> RemoteResult<()> {
        (**self).update(reference, updates)
    }

    fn batch_delete(&self, references: &[DocumentRef]) -> RemoteResult<()> {
        (**self).batch_delete(references)
    }
}

/// Buffers deletions and sends them in a single batch on [`BulkWriter::flush`].
pub struct BulkWriter<'c, C: DocumentClient + ?Sized> {
    client: &'c C,
    pending: Vec<DocumentRef>,
}

impl<'c, C: DocumentClient + ?Sized> BulkWriter<'c, C> {
    pub fn new(client: &'c C) -> Self {
        Self {
            client,
            pending: Vec::new(),
        }
    }

    /// Queues one document for deletion.
    pub fn delete(&mut self, reference: DocumentRef) {
        self.pending.push(reference);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Sends all queued deletions. The buffer is emptied even on failure.
    pub fn flush(&mut self) -> RemoteResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        self.client.batch_delete(&batch)
    }
}
