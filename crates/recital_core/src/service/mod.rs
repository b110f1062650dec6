//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the CLI and UI layers decoupled from storage details.

pub mod annotation_service;
pub mod ingest_service;
