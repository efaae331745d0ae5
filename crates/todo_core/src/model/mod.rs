//! Domain model for todo items.
//!
//! # Responsibility
//! - Define the record every store persists and returns.
//! - Keep summary derivation (count, longest name) in one place.
//!
//! # Invariants
//! - Read paths hand out owned copies; callers never alias store state.

pub mod todo;
