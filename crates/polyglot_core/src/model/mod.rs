//! Domain model for localized content records.
//!
//! # Responsibility
//! - Define the content model descriptor consumed by the localization engine.
//! - Define the persisted entry shape and its partial-update payload.
//!
//! # Invariants
//! - An entry never lists its own id in `localizations`.
//! - Every persisted entry carries a non-empty, well-formed locale tag.
//! - Attributes without an explicit `localized: true` marking are shared.

pub mod content_model;
pub mod entry;
pub mod locale;
