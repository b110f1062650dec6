//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define poem-record data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`PoemNotFound`) in addition to
//!   DB transport errors.

pub mod poem_repo;
