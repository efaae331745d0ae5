//! In-process document client with fault injection.
//!
//! Behaves like a hosted document collection for the subset of features the
//! todo store uses: documents are ordered by identity unless a query orders
//! them, ordering by a field skips documents lacking it and breaks ties by
//! identity, and `in` filters are capped at [`MAX_IN_FILTER_VALUES`].

use super::{
    Direction, Document, DocumentClient, DocumentQuery, DocumentRef, FieldFilter, FieldUpdate,
    Fields, RemoteError, RemoteResult,
};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};

/// Largest value list accepted by an `in` filter.
pub const MAX_IN_FILTER_VALUES: usize = 30;

/// Operation that an injected fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Query,
    Add,
    Update,
    BatchDelete,
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<String, BTreeMap<String, Fields>>,
    next_document: u64,
    pending_failures: VecDeque<FailurePoint>,
    unavailable: bool,
}

impl MemoryState {
    fn check(&mut self, point: FailurePoint) -> RemoteResult<()> {
        if self.unavailable {
            return Err(RemoteError::Unavailable("service marked unavailable".to_string()));
        }
        if let Some(index) = self.pending_failures.iter().position(|p| *p == point) {
            self.pending_failures.remove(index);
            return Err(RemoteError::Unavailable(format!(
                "injected failure on {point:?}"
            )));
        }
        Ok(())
    }
}

/// Single-threaded simulated document store.
#[derive(Debug, Default)]
pub struct MemoryDocumentClient {
    state: RefCell<MemoryState>,
}

impl MemoryDocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of the given kind fail with `Unavailable`.
    pub fn fail_next(&self, point: FailurePoint) {
        self.state.borrow_mut().pending_failures.push_back(point);
    }

    /// Fails every call while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.borrow_mut().unavailable = unavailable;
    }

    /// Number of documents currently stored in `collection`.
    pub fn document_count(&self, collection: &str) -> usize {
        self.state
            .borrow()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

impl DocumentClient for MemoryDocumentClient {
    fn query(&self, collection: &str, query: &DocumentQuery) -> RemoteResult<Vec<Document>> {
        let mut state = self.state.borrow_mut();
        state.check(FailurePoint::Query)?;

        if let Some(FieldFilter::In(_, values)) = &query.filter {
            if values.len() > MAX_IN_FILTER_VALUES {
                return Err(RemoteError::InvalidQuery(format!(
                    "`in` filter accepts at most {MAX_IN_FILTER_VALUES} values, got {}",
                    values.len()
                )));
            }
        }

        let Some(documents) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<Document> = documents
            .iter()
            .filter(|(_, fields)| matches_filter(fields, query.filter.as_ref()))
            .map(|(id, fields)| Document {
                reference: DocumentRef {
                    collection: collection.to_string(),
                    id: id.clone(),
                },
                fields: fields.clone(),
            })
            .collect();

        if let Some((field, direction)) = &query.order_by {
            matches.retain(|doc| doc.fields.contains_key(field));
            // Ties fall back to document identity in the same direction.
            matches.sort_by(|a, b| {
                let ordering = match (a.fields.get(field), b.fields.get(field)) {
                    (Some(left), Some(right)) => left.compare(right).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                }
                .then_with(|| a.reference.id.cmp(&b.reference.id));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }

        Ok(matches)
    }

    fn add(&self, collection: &str, fields: Fields) -> RemoteResult<DocumentRef> {
        let mut state = self.state.borrow_mut();
        state.check(FailurePoint::Add)?;

        state.next_document += 1;
        let id = format!("doc-{:08}", state.next_document);
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);

        Ok(DocumentRef {
            collection: collection.to_string(),
            id,
        })
    }

    fn update(&self, reference: &DocumentRef, updates: &[FieldUpdate]) -> RemoteResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(FailurePoint::Update)?;

        let fields = state
            .collections
            .get_mut(&reference.collection)
            .and_then(|documents| documents.get_mut(&reference.id))
            .ok_or_else(|| RemoteError::DocumentNotFound(reference.clone()))?;

        for update in updates {
            fields.insert(update.field.clone(), update.value.clone());
        }
        Ok(())
    }

    fn batch_delete(&self, references: &[DocumentRef]) -> RemoteResult<()> {
        let mut state = self.state.borrow_mut();
        state.check(FailurePoint::BatchDelete)?;

        for reference in references {
            if let Some(documents) = state.collections.get_mut(&reference.collection) {
                documents.remove(&reference.id);
            }
        }
        Ok(())
    }
}

fn matches_filter(fields: &Fields, filter: Option<&FieldFilter>) -> bool {
    match filter {
        None => true,
        Some(FieldFilter::Eq(field, value)) => fields.get(field) == Some(value),
        Some(FieldFilter::In(field, values)) => fields
            .get(field)
            .is_some_and(|actual| values.contains(actual)),
    }
}
