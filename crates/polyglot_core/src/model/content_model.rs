//! Content model descriptor.
//!
//! # Responsibility
//! - Describe one record type and the localization marking of each attribute.
//! - Derive the shared (non-localized) attribute set used for mirroring.
//!
//! # Invariants
//! - An attribute is localized only when explicitly marked
//!   `pluginOptions.i18n.localized = true`; absence means shared.
//! - Reserved entry fields (`id`, `locale`, `localizations`) are never part
//!   of the shared set, even when a descriptor declares them.
//!
//! The serialized shape mirrors the descriptor JSON used by content schemas:
//!
//! ```json
//! {
//!   "uid": "api::article",
//!   "pluginOptions": { "i18n": { "localized": true } },
//!   "attributes": {
//!     "title": { "type": "string", "pluginOptions": { "i18n": { "localized": true } } },
//!     "stars": { "type": "integer" }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Entry field names owned by the engine itself, never treated as attributes.
pub const RESERVED_FIELDS: &[&str] = &["id", "locale", "localizations"];

/// Localization marking under `pluginOptions.i18n`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct I18nOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized: Option<bool>,
}

/// Plugin option bag attached to models and attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i18n: Option<I18nOptions>,
}

impl PluginOptions {
    fn localized(localized: bool) -> Self {
        Self {
            i18n: Some(I18nOptions {
                localized: Some(localized),
            }),
        }
    }

    /// Explicit `true` only. `None`, `Some(false)` and a missing block are all
    /// treated as not localized.
    fn is_localized(&self) -> bool {
        self.i18n
            .as_ref()
            .and_then(|options| options.localized)
            .unwrap_or(false)
    }
}

/// One attribute declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSpec {
    /// Declared value type (`string`, `integer`, ...). Informational only.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub plugin_options: PluginOptions,
}

impl AttributeSpec {
    /// Attribute whose value may differ per locale.
    pub fn localized(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            plugin_options: PluginOptions::localized(true),
        }
    }

    /// Attribute with no localization marking, mirrored across the group.
    pub fn shared(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            plugin_options: PluginOptions::default(),
        }
    }

    pub fn is_localized(&self) -> bool {
        self.plugin_options.is_localized()
    }
}

/// Read-only descriptor of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModel {
    /// Stable record type identifier.
    pub uid: String,
    #[serde(default)]
    pub plugin_options: PluginOptions,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeSpec>,
}

impl ContentModel {
    /// Creates a descriptor with no attributes.
    pub fn new(uid: impl Into<String>, localized: bool) -> Self {
        Self {
            uid: uid.into(),
            plugin_options: PluginOptions::localized(localized),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute declaration.
    pub fn with_attribute(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attributes.insert(name.into(), spec);
        self
    }

    /// Whether this record type participates in localization at all.
    pub fn is_localized(&self) -> bool {
        self.plugin_options.is_localized()
    }

    /// Whether `name` is a declared attribute explicitly marked localized.
    ///
    /// Undeclared names return `false`.
    pub fn is_localized_attribute(&self, name: &str) -> bool {
        self.attributes
            .get(name)
            .map(AttributeSpec::is_localized)
            .unwrap_or(false)
    }

    /// Returns shared attribute names in declaration-key order.
    pub fn non_localized_attributes(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|(name, spec)| {
                !spec.is_localized() && !RESERVED_FIELDS.contains(&name.as_str())
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Picks the shared attribute values present in `attributes`.
    ///
    /// Names missing from `attributes` are omitted rather than nulled, so the
    /// payload only ever carries values the source actually holds.
    pub fn copy_non_localized_attributes(
        &self,
        attributes: &Map<String, Value>,
    ) -> Map<String, Value> {
        self.non_localized_attributes()
            .into_iter()
            .filter_map(|name| {
                attributes
                    .get(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{AttributeSpec, ContentModel};
    use serde_json::json;

    #[test]
    fn missing_marking_means_shared() {
        let model: ContentModel = serde_json::from_value(json!({
            "uid": "api::article",
            "pluginOptions": { "i18n": { "localized": true } },
            "attributes": {
                "title": { "type": "string", "pluginOptions": { "i18n": { "localized": true } } },
                "stars": { "type": "integer" },
                "slug": { "type": "uid", "pluginOptions": {} },
                "rank": { "type": "integer", "pluginOptions": { "i18n": { "localized": false } } }
            }
        }))
        .expect("descriptor should deserialize");

        assert!(model.is_localized());
        assert!(model.is_localized_attribute("title"));
        assert!(!model.is_localized_attribute("stars"));
        assert_eq!(model.non_localized_attributes(), vec!["rank", "slug", "stars"]);
    }

    #[test]
    fn model_without_plugin_options_is_not_localized() {
        let model: ContentModel = serde_json::from_value(json!({
            "uid": "api::tag",
            "attributes": { "name": { "type": "string" } }
        }))
        .expect("descriptor should deserialize");

        assert!(!model.is_localized());
        assert_eq!(model.non_localized_attributes(), vec!["name"]);
    }

    #[test]
    fn reserved_fields_are_never_shared() {
        let model = ContentModel::new("api::article", true)
            .with_attribute("locale", AttributeSpec::shared("string"))
            .with_attribute("localizations", AttributeSpec::shared("relation"))
            .with_attribute("stars", AttributeSpec::shared("integer"));

        assert_eq!(model.non_localized_attributes(), vec!["stars"]);
    }

    #[test]
    fn copy_picks_only_present_shared_values() {
        let model = ContentModel::new("api::article", true)
            .with_attribute("title", AttributeSpec::localized("string"))
            .with_attribute("stars", AttributeSpec::shared("integer"))
            .with_attribute("cover", AttributeSpec::shared("media"));
        let attributes = json!({ "title": "Hello", "stars": 4 })
            .as_object()
            .cloned()
            .expect("object literal");

        let copied = model.copy_non_localized_attributes(&attributes);
        assert_eq!(serde_json::Value::Object(copied), json!({ "stars": 4 }));
    }
}
