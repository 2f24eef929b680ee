//! Entry store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the point-update contract (`id -> partial payload`) the
//!   localization engine writes through.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate input before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - One `update_entry` call is one unit of work: it either fully applies or
//!   leaves the entry unchanged.

use crate::db::migrations::{current_version, latest_version};
use crate::db::DbError;
use crate::model::entry::{Entry, EntryId, EntryInput, EntryPatch, EntryValidationError};
use crate::model::locale::normalize_locale;
use log::{error, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ENTRY_WRITE_SAVEPOINT: &str = "entry_write";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for entry persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntryValidationError),
    Db(DbError),
    NotFound(EntryId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "entry repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record store used by the localization engine and the entry lifecycle.
pub trait EntryStore {
    /// Persists a new entry and returns its assigned id.
    fn create_entry(&self, input: &EntryInput) -> RepoResult<EntryId>;
    /// Loads one entry with its ordered sibling list.
    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>>;
    /// Applies a partial update to the entry addressed by `id`.
    ///
    /// Returns `RepoError::NotFound` when no entry has that id.
    fn update_entry(&self, id: EntryId, patch: &EntryPatch) -> RepoResult<()>;

    /// Loads `id` followed by its siblings in list order.
    ///
    /// Sibling ids with no stored entry are skipped. Returns
    /// `RepoError::NotFound` when `id` itself does not exist.
    fn list_group(&self, id: EntryId) -> RepoResult<Vec<Entry>> {
        let entry = self.get_entry(id)?.ok_or(RepoError::NotFound(id))?;
        let sibling_ids = entry.localizations.clone();
        let mut group = Vec::with_capacity(sibling_ids.len() + 1);
        group.push(entry);
        for sibling_id in sibling_ids {
            match self.get_entry(sibling_id)? {
                Some(sibling) => group.push(sibling),
                None => warn!(
                    "event=group_load module=repo status=degraded entry_id={id} missing_sibling_id={sibling_id}"
                ),
            }
        }
        Ok(group)
    }
}

impl<T: EntryStore + ?Sized> EntryStore for &T {
    fn create_entry(&self, input: &EntryInput) -> RepoResult<EntryId> {
        (**self).create_entry(input)
    }

    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        (**self).get_entry(id)
    }

    fn update_entry(&self, id: EntryId, patch: &EntryPatch) -> RepoResult<()> {
        (**self).update_entry(id, patch)
    }

    fn list_group(&self, id: EntryId) -> RepoResult<Vec<Entry>> {
        (**self).list_group(id)
    }
}

/// SQLite-backed entry store.
///
/// Works on a plain connection or on a borrowed transaction; each write runs
/// inside its own savepoint so it nests under an outer transaction.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EntryStore for SqliteEntryRepository<'_> {
    fn create_entry(&self, input: &EntryInput) -> RepoResult<EntryId> {
        input.validate()?;
        let locale = normalize_locale(input.locale.as_deref())
            .ok_or(EntryValidationError::MissingLocale)?;
        let attributes = encode_attributes(&input.attributes)?;

        with_savepoint(self.conn, |conn| {
            conn.execute(
                "INSERT INTO entries (model_uid, locale, attributes)
                 VALUES (?1, ?2, ?3);",
                params![input.model_uid.trim(), locale, attributes],
            )?;
            let id = conn.last_insert_rowid();
            if input.localizations.contains(&id) {
                return Err(EntryValidationError::SelfReference(id).into());
            }
            replace_localizations(conn, id, &input.localizations)?;
            Ok(id)
        })
    }

    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, model_uid, locale, attributes
                 FROM entries
                 WHERE id = ?1;",
                [id],
                |row| {
                    Ok((
                        row.get::<_, EntryId>("id")?,
                        row.get::<_, String>("model_uid")?,
                        row.get::<_, String>("locale")?,
                        row.get::<_, String>("attributes")?,
                    ))
                },
            )
            .optional()?;

        let Some((id, model_uid, locale, attributes_json)) = row else {
            return Ok(None);
        };

        let entry = Entry {
            id,
            model_uid,
            locale,
            attributes: decode_attributes(id, &attributes_json)?,
            localizations: load_localizations(self.conn, id)?,
        };
        entry.validate().map_err(|err| {
            RepoError::InvalidData(format!("entry {id} violates invariants: {err}"))
        })?;
        Ok(Some(entry))
    }

    fn update_entry(&self, id: EntryId, patch: &EntryPatch) -> RepoResult<()> {
        patch.validate_for(id)?;

        with_savepoint(self.conn, |conn| {
            let stored: Option<String> = conn
                .query_row(
                    "SELECT attributes FROM entries WHERE id = ?1;",
                    [id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(stored) = stored else {
                return Err(RepoError::NotFound(id));
            };

            if !patch.attributes.is_empty() {
                let mut attributes = decode_attributes(id, &stored)?;
                for (name, value) in &patch.attributes {
                    attributes.insert(name.clone(), value.clone());
                }
                conn.execute(
                    "UPDATE entries SET attributes = ?2 WHERE id = ?1;",
                    params![id, encode_attributes(&attributes)?],
                )?;
            }

            if let Some(localizations) = patch.localizations.as_deref() {
                replace_localizations(conn, id, localizations)?;
            }

            conn.execute(
                "UPDATE entries
                 SET updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                [id],
            )?;
            Ok(())
        })
    }
}

fn replace_localizations(
    conn: &Connection,
    id: EntryId,
    localizations: &[EntryId],
) -> RepoResult<()> {
    conn.execute("DELETE FROM entry_localizations WHERE entry_id = ?1;", [id])?;
    let mut stmt = conn.prepare(
        "INSERT INTO entry_localizations (entry_id, position, sibling_id)
         VALUES (?1, ?2, ?3);",
    )?;
    for (position, sibling_id) in localizations.iter().enumerate() {
        stmt.execute(params![id, position as i64, sibling_id])?;
    }
    Ok(())
}

fn load_localizations(conn: &Connection, id: EntryId) -> RepoResult<Vec<EntryId>> {
    let mut stmt = conn.prepare(
        "SELECT sibling_id
         FROM entry_localizations
         WHERE entry_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([id])?;
    let mut localizations = Vec::new();
    while let Some(row) = rows.next()? {
        localizations.push(row.get(0)?);
    }
    Ok(localizations)
}

fn encode_attributes(attributes: &Map<String, Value>) -> RepoResult<String> {
    serde_json::to_string(attributes)
        .map_err(|err| RepoError::InvalidData(format!("attributes are not serializable: {err}")))
}

fn decode_attributes(id: EntryId, raw: &str) -> RepoResult<Map<String, Value>> {
    serde_json::from_str(raw).map_err(|err| {
        RepoError::InvalidData(format!("entries.attributes for entry {id} is not a JSON object: {err}"))
    })
}

/// Runs `work` under a named savepoint, rolling back to it on error.
fn with_savepoint<T, F>(conn: &Connection, work: F) -> RepoResult<T>
where
    F: FnOnce(&Connection) -> RepoResult<T>,
{
    conn.execute_batch(&format!("SAVEPOINT {ENTRY_WRITE_SAVEPOINT};"))?;
    match work(conn) {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {ENTRY_WRITE_SAVEPOINT};"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = conn.execute_batch(&format!(
                "ROLLBACK TO {ENTRY_WRITE_SAVEPOINT}; RELEASE {ENTRY_WRITE_SAVEPOINT};"
            )) {
                error!(
                    "event=savepoint_rollback module=repo status=error savepoint={ENTRY_WRITE_SAVEPOINT} error={rollback_err} cause={err}"
                );
            }
            Err(err)
        }
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
