//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record store and locale configuration contracts the
//!   localization engine consumes.
//! - Isolate SQLite query details from engine and lifecycle orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod entry_repo;
pub mod locale_repo;
