//! Entry domain model.
//!
//! # Responsibility
//! - Define the persisted record shape (`Entry`), the create input
//!   (`EntryInput`) and the partial update payload (`EntryPatch`).
//! - Validate the structural invariants shared by every write path.
//!
//! # Invariants
//! - `localizations` never contains the entry's own id.
//! - `locale` is non-empty and passes `is_valid_locale_tag`.
//! - Attribute maps never carry reserved fields (`id`, `locale`,
//!   `localizations`).

use crate::model::content_model::RESERVED_FIELDS;
use crate::model::locale::{is_valid_locale_tag, normalize_locale};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned entry identifier.
pub type EntryId = i64;

/// Validation failures for entry writes and persisted reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    EmptyModelUid,
    MissingLocale,
    InvalidLocale(String),
    SelfReference(EntryId),
    ReservedAttribute(String),
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyModelUid => write!(f, "entry model uid must not be empty"),
            Self::MissingLocale => write!(f, "entry locale must not be empty"),
            Self::InvalidLocale(tag) => write!(f, "invalid locale tag `{tag}`"),
            Self::SelfReference(id) => {
                write!(f, "entry {id} must not list itself in localizations")
            }
            Self::ReservedAttribute(name) => {
                write!(f, "attribute name `{name}` is reserved")
            }
        }
    }
}

impl Error for EntryValidationError {}

/// One persisted record in one locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub model_uid: String,
    pub locale: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Sibling ids in other locales, order preserved as written.
    #[serde(default)]
    pub localizations: Vec<EntryId>,
}

impl Entry {
    /// Checks invariants for a persisted entry.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        validate_model_uid(&self.model_uid)?;
        validate_locale(&self.locale)?;
        validate_attribute_names(&self.attributes)?;
        validate_localizations(self.id, &self.localizations)
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Reconstructs the locale group: this entry first, then its siblings.
    pub fn group_ids(&self) -> Vec<EntryId> {
        std::iter::once(self.id)
            .chain(self.localizations.iter().copied())
            .collect()
    }
}

/// Record about to be created. The store assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryInput {
    pub model_uid: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub localizations: Vec<EntryId>,
}

impl EntryInput {
    pub fn new(model_uid: impl Into<String>) -> Self {
        Self {
            model_uid: model_uid.into(),
            ..Self::default()
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_localizations(mut self, localizations: Vec<EntryId>) -> Self {
        self.localizations = localizations;
        self
    }

    /// Whether any locale is set. Only `None` and `""` count as missing;
    /// other values, whitespace included, are left for `validate` to judge.
    pub fn has_locale(&self) -> bool {
        self.locale.as_deref().is_some_and(|locale| !locale.is_empty())
    }

    /// Checks invariants before insertion.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        validate_model_uid(&self.model_uid)?;
        let locale = self
            .locale
            .as_deref()
            .filter(|locale| !locale.is_empty())
            .ok_or(EntryValidationError::MissingLocale)?;
        match normalize_locale(Some(locale)) {
            Some(tag) => validate_locale(tag)?,
            None => return Err(EntryValidationError::InvalidLocale(locale.to_string())),
        }
        validate_attribute_names(&self.attributes)
    }
}

/// Partial update addressed to one entry id.
///
/// `attributes` are merged key by key into the stored map; keys not present
/// in the patch are left untouched. `localizations`, when set, replaces the
/// whole sibling list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localizations: Option<Vec<EntryId>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl EntryPatch {
    /// Patch that only rewrites the sibling list.
    pub fn localizations(localizations: Vec<EntryId>) -> Self {
        Self {
            localizations: Some(localizations),
            attributes: Map::new(),
        }
    }

    /// Patch that only merges attribute values.
    pub fn attributes(attributes: Map<String, Value>) -> Self {
        Self {
            localizations: None,
            attributes,
        }
    }

    /// Checks the patch against the entry it targets.
    pub fn validate_for(&self, target: EntryId) -> Result<(), EntryValidationError> {
        validate_attribute_names(&self.attributes)?;
        match self.localizations.as_deref() {
            Some(localizations) => validate_localizations(target, localizations),
            None => Ok(()),
        }
    }
}

fn validate_model_uid(model_uid: &str) -> Result<(), EntryValidationError> {
    if model_uid.trim().is_empty() {
        return Err(EntryValidationError::EmptyModelUid);
    }
    Ok(())
}

fn validate_locale(locale: &str) -> Result<(), EntryValidationError> {
    if locale.is_empty() {
        return Err(EntryValidationError::MissingLocale);
    }
    if !is_valid_locale_tag(locale) {
        return Err(EntryValidationError::InvalidLocale(locale.to_string()));
    }
    Ok(())
}

fn validate_attribute_names(attributes: &Map<String, Value>) -> Result<(), EntryValidationError> {
    match attributes
        .keys()
        .find(|name| RESERVED_FIELDS.contains(&name.as_str()))
    {
        Some(name) => Err(EntryValidationError::ReservedAttribute(name.clone())),
        None => Ok(()),
    }
}

fn validate_localizations(
    id: EntryId,
    localizations: &[EntryId],
) -> Result<(), EntryValidationError> {
    if localizations.contains(&id) {
        return Err(EntryValidationError::SelfReference(id));
    }
    Ok(())
}
