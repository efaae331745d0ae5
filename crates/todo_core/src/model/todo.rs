//! Todo item and collection summary model.
//!
//! # Responsibility
//! - Define the canonical todo record shared by every store backend.
//! - Derive the read-only collection summary used for display padding.
//!
//! # Invariants
//! - `updated_at >= created_at`; both are equal on creation.
//! - `id` is store-assigned and never changes after creation.
//! - Name length is measured in Unicode scalar values on every backend.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned identifier of a todo item.
pub type TodoId = i64;

/// Single task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Positive id, unique within one store.
    pub id: TodoId,
    /// Free text. Empty names are legal.
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Never earlier than `created_at`.
    pub updated_at: DateTime<Utc>,
}

/// Validation errors for todo invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    UpdatedBeforeCreated {
        id: TodoId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    },
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpdatedBeforeCreated {
                id,
                created_at,
                updated_at,
            } => write!(
                f,
                "todo {id} has updated_at {updated_at} earlier than created_at {created_at}"
            ),
        }
    }
}

impl Error for TodoValidationError {}

impl Todo {
    /// Creates a todo whose `updated_at` equals `created_at`.
    pub fn new(id: TodoId, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Checks the timestamp ordering invariant.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.updated_at < self.created_at {
            return Err(TodoValidationError::UpdatedBeforeCreated {
                id: self.id,
                created_at: self.created_at,
                updated_at: self.updated_at,
            });
        }
        Ok(())
    }

    /// Replaces the name and advances `updated_at`.
    ///
    /// `id` and `created_at` are left untouched.
    pub fn rename(&mut self, name: impl Into<String>, now: DateTime<Utc>) {
        self.name = name.into();
        self.updated_at = next_update_instant(self.updated_at, now);
    }

    /// Name length used by [`TodoCollection::max_name_length`].
    pub fn name_length(&self) -> usize {
        name_length(&self.name)
    }
}

/// Returns `now` when it is later than `prior`, otherwise `prior + 1ms`.
///
/// Edits issued within the same clock tick must still move `updated_at`
/// strictly forward, at millisecond granularity so the relational backend
/// can store it losslessly.
pub fn next_update_instant(prior: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > prior {
        now
    } else {
        prior + Duration::milliseconds(1)
    }
}

/// Current instant truncated to whole milliseconds.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Unicode scalar count of a name.
pub fn name_length(name: &str) -> usize {
    name.chars().count()
}

/// Derived, read-only view over a store's items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoCollection {
    /// Sorted ascending by id.
    pub items: Vec<Todo>,
    pub count: usize,
    /// Longest name in Unicode scalar values, `0` when empty.
    pub max_name_length: usize,
}

impl TodoCollection {
    /// Builds a summary from unordered items.
    pub fn from_items(mut items: Vec<Todo>) -> Self {
        items.sort_by_key(|item| item.id);
        let max_name_length = items.iter().map(Todo::name_length).max().unwrap_or(0);
        Self {
            count: items.len(),
            items,
            max_name_length,
        }
    }

    /// Builds a summary with a max length computed elsewhere (e.g. in SQL).
    pub fn with_max_name_length(mut items: Vec<Todo>, max_name_length: usize) -> Self {
        items.sort_by_key(|item| item.id);
        Self {
            count: items.len(),
            items,
            max_name_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
