//! Localization consistency engine for multi-locale content records.
//! This crate is the single source of truth for locale group invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, EngineConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::content_model::{AttributeSpec, ContentModel};
pub use model::entry::{Entry, EntryId, EntryInput, EntryPatch, EntryValidationError};
pub use model::locale::is_valid_locale_tag;
pub use repo::entry_repo::{EntryStore, RepoError, RepoResult, SqliteEntryRepository};
pub use repo::locale_repo::{
    LocaleError, LocaleProvider, SqliteLocaleRepository, StaticLocaleProvider,
};
pub use service::entry_lifecycle::{EntryLifecycle, LifecycleError, LifecycleResult, SyncReport};
pub use service::localization_service::{
    assign_default_locale, sibling_localizations, sync_localizations, update_non_localized_fields,
};

/// Minimal health-check API for integration probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
