//! Domain model for poems and their annotations.
//!
//! # Responsibility
//! - Define canonical, word-addressable poem text and its storage format.
//! - Define quotes, notes and the invalid-annotation log shapes.
//!
//! # Invariants
//! - Word occurrences are identified by `(surface, instance)`; the marked
//!   string form is only a serialization at storage and wire boundaries.
//! - Poem records are keyed by title.

pub mod annotation;
pub mod canonical;
pub mod invalid_log;
pub mod poem;
