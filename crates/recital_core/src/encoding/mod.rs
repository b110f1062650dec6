//! Word encoding and addressing.
//!
//! # Responsibility
//! - Turn raw poem text into canonical text (`word_encoder`).
//! - Derive identifiers for occurrences and letters (`addressing`).

pub mod addressing;
pub mod word_encoder;
