//! Entry lifecycle orchestration around the localization engine.
//!
//! # Responsibility
//! - Run default locale assignment before an entry is persisted.
//! - Run link synchronization and shared-field propagation after every
//!   create or update of a localized record type.
//! - Create new localizations of an existing entry.
//!
//! # Invariants
//! - Engine operations run only for models that participate in
//!   localization; other models only get default locale assignment.
//! - Every engine pass reads the subject entry back from the store first, so
//!   it always works from the persisted state.
//! - A locale appears at most once per group when created through
//!   `create_localization`.
//!
//! Writes across siblings are independent store calls. For all-or-nothing
//! behavior, build the lifecycle on a repository borrowed from
//! `crate::db::with_immediate_transaction`.

use crate::model::content_model::ContentModel;
use crate::model::entry::{Entry, EntryId, EntryInput, EntryPatch};
use crate::model::locale::{is_valid_locale_tag, normalize_locale};
use crate::repo::entry_repo::{EntryStore, RepoError};
use crate::repo::locale_repo::{LocaleError, LocaleProvider};
use crate::service::localization_service::{
    assign_default_locale, sync_localizations, update_non_localized_fields,
};
use log::info;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Errors from lifecycle operations.
#[derive(Debug)]
pub enum LifecycleError {
    /// Target entry does not exist.
    EntryNotFound(EntryId),
    /// Entry belongs to a different record type than this lifecycle.
    ModelMismatch { expected: String, actual: String },
    /// Localization requested for a model that does not participate.
    ModelNotLocalized(String),
    /// Requested locale tag is blank or malformed.
    InvalidLocale(String),
    /// The group already holds an entry in the requested locale.
    LocaleAlreadyInGroup { locale: String, entry_id: EntryId },
    Locale(LocaleError),
    Repo(RepoError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::ModelMismatch { expected, actual } => {
                write!(f, "entry model `{actual}` does not match `{expected}`")
            }
            Self::ModelNotLocalized(uid) => write!(f, "model `{uid}` is not localized"),
            Self::InvalidLocale(tag) => write!(f, "invalid locale tag `{tag}`"),
            Self::LocaleAlreadyInGroup { locale, entry_id } => write!(
                f,
                "locale `{locale}` already exists in this group as entry {entry_id}"
            ),
            Self::Locale(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Locale(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LifecycleError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::EntryNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<LocaleError> for LifecycleError {
    fn from(value: LocaleError) -> Self {
        Self::Locale(value)
    }
}

impl From<rusqlite::Error> for LifecycleError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Update counts from one engine pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Siblings whose `localizations` list was rewritten.
    pub links_updated: usize,
    /// Siblings that received the shared-field payload.
    pub fields_propagated: usize,
}

/// Lifecycle entry points for one record type.
pub struct EntryLifecycle<S: EntryStore, P: LocaleProvider> {
    model: ContentModel,
    store: S,
    locales: P,
}

impl<S: EntryStore, P: LocaleProvider> EntryLifecycle<S, P> {
    pub fn new(model: ContentModel, store: S, locales: P) -> Self {
        Self {
            model,
            store,
            locales,
        }
    }

    /// Creates an entry, then links and mirrors it into its group.
    ///
    /// `input.localizations` is taken as the authoritative sibling list of
    /// the new entry.
    pub fn create_entry(&self, mut input: EntryInput) -> LifecycleResult<Entry> {
        self.ensure_model(&input.model_uid)?;
        assign_default_locale(&mut input, &self.locales)?;

        let id = self.store.create_entry(&input)?;
        let entry = self.load(id)?;
        let report = self.after_write(&entry)?;
        info!(
            "event=entry_create module=lifecycle status=ok model={} entry_id={id} locale={} links_updated={} fields_propagated={}",
            self.model.uid, entry.locale, report.links_updated, report.fields_propagated
        );
        Ok(entry)
    }

    /// Applies `patch` to an entry, then re-syncs its group.
    pub fn update_entry(&self, id: EntryId, patch: &EntryPatch) -> LifecycleResult<Entry> {
        let current = self.load(id)?;
        self.ensure_model(&current.model_uid)?;

        self.store.update_entry(id, patch)?;
        let entry = self.load(id)?;
        let report = self.after_write(&entry)?;
        info!(
            "event=entry_update module=lifecycle status=ok model={} entry_id={id} links_updated={} fields_propagated={}",
            self.model.uid, report.links_updated, report.fields_propagated
        );
        Ok(entry)
    }

    /// Creates a sibling of `source_id` in `locale`.
    ///
    /// The new entry starts from `attributes`, then receives the source's
    /// shared attribute values (source wins), and is linked to the whole
    /// group before the group lists are re-synced.
    pub fn create_localization(
        &self,
        source_id: EntryId,
        locale: &str,
        attributes: Map<String, Value>,
    ) -> LifecycleResult<Entry> {
        if !self.model.is_localized() {
            return Err(LifecycleError::ModelNotLocalized(self.model.uid.clone()));
        }
        let locale = normalize_locale(Some(locale))
            .filter(|tag| is_valid_locale_tag(tag))
            .ok_or_else(|| LifecycleError::InvalidLocale(locale.to_string()))?;

        let source = self.load(source_id)?;
        self.ensure_model(&source.model_uid)?;
        for member in self.load_group(source_id)? {
            if member.locale == locale {
                return Err(LifecycleError::LocaleAlreadyInGroup {
                    locale: locale.to_string(),
                    entry_id: member.id,
                });
            }
        }

        let mut merged = attributes;
        merged.extend(self.model.copy_non_localized_attributes(&source.attributes));
        let input = EntryInput {
            model_uid: self.model.uid.clone(),
            locale: Some(locale.to_string()),
            attributes: merged,
            localizations: source.group_ids(),
        };
        let entry = self.create_entry(input)?;
        info!(
            "event=localization_create module=lifecycle status=ok model={} source_id={source_id} entry_id={} locale={locale}",
            self.model.uid, entry.id
        );
        Ok(entry)
    }

    /// Re-runs both engine operations from the persisted state of `id`.
    ///
    /// Safe to call repeatedly, e.g. after a partially failed update.
    pub fn resync_entry(&self, id: EntryId) -> LifecycleResult<SyncReport> {
        let entry = self.load(id)?;
        self.ensure_model(&entry.model_uid)?;
        self.after_write(&entry)
    }

    /// Loads entry `id` followed by its siblings.
    pub fn load_group(&self, id: EntryId) -> LifecycleResult<Vec<Entry>> {
        let group = self.store.list_group(id)?;
        if let Some(entry) = group.first() {
            self.ensure_model(&entry.model_uid)?;
        }
        Ok(group)
    }

    fn after_write(&self, entry: &Entry) -> LifecycleResult<SyncReport> {
        if !self.model.is_localized() {
            return Ok(SyncReport::default());
        }

        let links_updated = sync_localizations(entry, &self.model, &self.store)?;
        let fields_propagated = update_non_localized_fields(entry, &self.model, &self.store)?;
        Ok(SyncReport {
            links_updated,
            fields_propagated,
        })
    }

    fn load(&self, id: EntryId) -> LifecycleResult<Entry> {
        self.store
            .get_entry(id)?
            .ok_or(LifecycleError::EntryNotFound(id))
    }

    fn ensure_model(&self, model_uid: &str) -> LifecycleResult<()> {
        if model_uid != self.model.uid {
            return Err(LifecycleError::ModelMismatch {
                expected: self.model.uid.clone(),
                actual: model_uid.to_string(),
            });
        }
        Ok(())
    }
}
