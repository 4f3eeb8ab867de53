//! Types for package-level translation statistics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Translation statistics for a single package template.
///
/// Records are created fresh on every parse of a result page and never
/// mutated afterwards; a new fetch replaces the whole list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageStat {
    /// Template name (unique within one result set).
    pub name: String,
    /// Percentage translated (0-100).
    #[serde(default)]
    pub translated_pct: f64,
    /// Strings without a translation.
    #[serde(default)]
    pub untranslated: u64,
    /// Strings with a suggestion waiting for review.
    #[serde(default)]
    pub need_review: u64,
    /// Strings changed in Launchpad relative to upstream.
    #[serde(default)]
    pub changed: u64,
    /// All translatable strings in the template.
    #[serde(default)]
    pub total: u64,
    /// Last edit time as displayed by the source (not guaranteed parseable).
    #[serde(default)]
    pub last_edited: String,
    /// Display name of the last editor (may be empty).
    #[serde(default)]
    pub last_editor: String,
    /// Absolute URL of the template's translation page.
    #[serde(rename = "translate_url", alias = "detail_url", default)]
    pub detail_url: String,
}

impl PackageStat {
    /// Strings that have a translation, `total - untranslated`, clamped to `0..=total`.
    pub fn translated(&self) -> u64 {
        self.total.saturating_sub(self.untranslated)
    }

    /// Alias used by the translation domain for `need_review`.
    pub fn fuzzy(&self) -> u64 {
        self.need_review
    }

    /// Row colouring class of the list view.
    pub fn completion_class(&self) -> CompletionClass {
        if self.translated_pct >= 100.0 {
            CompletionClass::Complete
        } else if self.translated_pct >= 80.0 {
            CompletionClass::Good
        } else {
            CompletionClass::Incomplete
        }
    }
}

/// Coarse completion class of a single template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionClass {
    Complete,
    Good,
    Incomplete,
}

/// Identifies one statistics result set: (distribution codename, language code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatsKey {
    pub distro: String,
    pub lang: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsKeyError {
    #[error("Empty {0}")]
    Empty(&'static str),

    #[error("Invalid character in {field}: {value:?}")]
    InvalidCharacter { field: &'static str, value: String },
}

impl StatsKey {
    /// Build a key, rejecting characters that cannot appear in a Launchpad
    /// distribution codename or language code.
    pub fn new(distro: impl Into<String>, lang: impl Into<String>) -> Result<Self, StatsKeyError> {
        let distro = distro.into();
        let lang = lang.into();
        validate_component("distro", &distro)?;
        validate_component("lang", &lang)?;
        Ok(Self { distro, lang })
    }

    /// Composite key used in the cache document (`"{distro}_{lang}"`).
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.distro, self.lang)
    }
}

impl std::fmt::Display for StatsKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.distro, self.lang)
    }
}

fn validate_component(field: &'static str, value: &str) -> Result<(), StatsKeyError> {
    if value.is_empty() {
        return Err(StatsKeyError::Empty(field));
    }
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '@' | '.'));
    if !valid {
        return Err(StatsKeyError::InvalidCharacter {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// All records of one result set plus where they came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchResult {
    pub key: StatsKey,
    pub records: Vec<PackageStat>,
    /// Whether the records were served from the on-disk cache.
    pub from_cache: bool,
    /// Age of the cache entry in whole minutes (0 for a fresh fetch).
    pub cache_age_minutes: u64,
}

/// Progress of a multi-page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchProgress {
    /// Records collected so far.
    pub loaded: usize,
    /// Total reported by the source (0 if unknown).
    pub total: usize,
}
