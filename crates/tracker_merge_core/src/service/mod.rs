//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the import and collapse use cases.
//! - Own the transaction boundaries of each unit of work.

pub mod collapse_service;
pub mod import_service;
