//! Annotation consistency engine.
//!
//! # Responsibility
//! - Validity rules for quotes and notes (`rules`).
//! - Bulk reconciliation after a poem edit (`checker`).
//! - Poem-order sorting of annotations (`ordering`).
//!
//! # Invariants
//! - Everything here is stateless; inputs arrive as explicit parameters.
//! - Nested scans over annotations are O(n^2) in annotation count, which
//!   stays in the tens per poem.

pub mod checker;
pub mod ordering;
pub mod rules;
