//! Locale tag checks.
//!
//! Tags follow a relaxed BCP-47 shape: a 2-8 letter primary subtag followed
//! by any number of `-`-separated alphanumeric subtags (`en`, `fr-FR`,
//! `zh-Hans-CN`).

use once_cell::sync::Lazy;
use regex::Regex;

static LOCALE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,8}(-[A-Za-z0-9]{1,8})*$").expect("valid locale tag regex")
});

/// Returns whether `tag` is a usable locale tag.
pub fn is_valid_locale_tag(tag: &str) -> bool {
    LOCALE_TAG_RE.is_match(tag)
}

/// Trims a locale tag, returning `None` for blank input.
pub fn normalize_locale(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|tag| !tag.is_empty())
}
