//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence gateway the import and collapse services need.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Every write happens inside a `RecordStore::transaction` unit of work.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod record_repo;
