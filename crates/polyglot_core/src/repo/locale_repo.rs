//! Locale configuration lookups.
//!
//! # Responsibility
//! - Answer "which locale is the default" for entries created without one.
//!
//! # Invariants
//! - Providers never invent a locale: no configured default is an error.
//! - Returned defaults always pass `is_valid_locale_tag`.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::locale::{is_valid_locale_tag, normalize_locale};
use rusqlite::{Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from locale configuration lookups.
#[derive(Debug)]
pub enum LocaleError {
    NoDefaultLocale,
    InvalidLocale(String),
    /// Connection schema predates the `locales` table.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    Db(DbError),
}

impl Display for LocaleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDefaultLocale => write!(f, "no default locale is configured"),
            Self::InvalidLocale(tag) => write!(f, "configured default locale `{tag}` is invalid"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "locale repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LocaleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for LocaleError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LocaleError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Locale configuration collaborator.
pub trait LocaleProvider {
    /// Returns the configured default locale tag.
    fn default_locale(&self) -> Result<String, LocaleError>;
}

impl<T: LocaleProvider + ?Sized> LocaleProvider for &T {
    fn default_locale(&self) -> Result<String, LocaleError> {
        (**self).default_locale()
    }
}

/// Default locale fixed at construction, typically from `EngineConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticLocaleProvider {
    default_locale: Option<String>,
}

impl StaticLocaleProvider {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: Some(default_locale.into()),
        }
    }

    /// Provider with no default; every lookup fails with `NoDefaultLocale`.
    pub fn unconfigured() -> Self {
        Self::default()
    }
}

impl LocaleProvider for StaticLocaleProvider {
    fn default_locale(&self) -> Result<String, LocaleError> {
        let tag = normalize_locale(self.default_locale.as_deref())
            .ok_or(LocaleError::NoDefaultLocale)?;
        checked_tag(tag)
    }
}

/// Reads the default locale from the `locales` table.
pub struct SqliteLocaleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLocaleRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> Result<Self, LocaleError> {
        let expected_version = latest_version();
        let actual_version = current_version(conn)?;
        if actual_version != expected_version {
            return Err(LocaleError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl LocaleProvider for SqliteLocaleRepository<'_> {
    fn default_locale(&self) -> Result<String, LocaleError> {
        let code: Option<String> = self
            .conn
            .query_row(
                "SELECT code FROM locales WHERE is_default = 1 LIMIT 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let code = code.ok_or(LocaleError::NoDefaultLocale)?;
        let tag = normalize_locale(Some(code.as_str())).ok_or(LocaleError::NoDefaultLocale)?;
        checked_tag(tag)
    }
}

fn checked_tag(tag: &str) -> Result<String, LocaleError> {
    if !is_valid_locale_tag(tag) {
        return Err(LocaleError::InvalidLocale(tag.to_string()));
    }
    Ok(tag.to_string())
}

#[cfg(test)]
mod tests {
    use super::{LocaleError, LocaleProvider, StaticLocaleProvider};

    #[test]
    fn static_provider_returns_configured_default() {
        let provider = StaticLocaleProvider::new(" fr-FR ");
        assert_eq!(provider.default_locale().unwrap(), "fr-FR");
    }

    #[test]
    fn static_provider_without_default_fails() {
        let err = StaticLocaleProvider::unconfigured()
            .default_locale()
            .unwrap_err();
        assert!(matches!(err, LocaleError::NoDefaultLocale));
    }

    #[test]
    fn static_provider_rejects_malformed_default() {
        let err = StaticLocaleProvider::new("en_US")
            .default_locale()
            .unwrap_err();
        assert!(matches!(err, LocaleError::InvalidLocale(tag) if tag == "en_US"));
    }
}
