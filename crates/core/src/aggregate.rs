//! Pure views over a record list: filtering, sorting, roll-up totals.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::PackageStat;

/// Number of entries in the top and least translated lists.
pub const DEFAULT_TOP_N: usize = 10;
/// Percentage under which a partially translated package is reported.
pub const LOW_TRANSLATION_THRESHOLD: f64 = 50.0;

/// Packages whose name contains `query`, case-insensitively.
///
/// The query is trimmed; an empty query keeps everything. Source order is
/// preserved.
pub fn filter<'a>(records: &'a [PackageStat], query: &str) -> Vec<&'a PackageStat> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
        .collect()
}

/// Named orderings of the package list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Name, case-insensitive ascending.
    #[default]
    NameAsc,
    /// Percent translated, descending.
    MostTranslated,
    /// Percent translated, ascending.
    LeastTranslated,
    /// Total strings, descending.
    MostStrings,
    /// Last edit, descending by raw display string.
    LastUpdated,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::NameAsc,
        SortKey::MostTranslated,
        SortKey::LeastTranslated,
        SortKey::MostStrings,
        SortKey::LastUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::NameAsc => "name_asc",
            SortKey::MostTranslated => "most_translated",
            SortKey::LeastTranslated => "least_translated",
            SortKey::MostStrings => "most_strings",
            SortKey::LastUpdated => "last_updated",
        }
    }

    fn compare(&self, a: &PackageStat, b: &PackageStat) -> Ordering {
        match self {
            SortKey::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::MostTranslated => b.translated_pct.total_cmp(&a.translated_pct),
            SortKey::LeastTranslated => a.translated_pct.total_cmp(&b.translated_pct),
            SortKey::MostStrings => b.total.cmp(&a.total),
            // Not chronological: the source format is not guaranteed parseable
            SortKey::LastUpdated => b.last_edited.cmp(&a.last_edited),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownSortKey(s.to_string()))
    }
}

/// Stable sort of `records` by `key`; ties keep their input order.
pub fn sort(records: &mut [&PackageStat], key: SortKey) {
    records.sort_by(|a, b| key.compare(a, b));
}

/// Filter then sort, the list view's pipeline.
pub fn view<'a>(records: &'a [PackageStat], query: &str, key: SortKey) -> Vec<&'a PackageStat> {
    let mut filtered = filter(records, query);
    sort(&mut filtered, key);
    filtered
}

/// Language-wide totals over a record list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollup {
    pub package_count: usize,
    pub translated: u64,
    pub untranslated: u64,
    pub total: u64,
    /// `translated / total * 100`, 0 when there are no strings.
    pub overall_percent: f64,
    pub fully_translated: usize,
    pub zero_translated: usize,
}

impl Rollup {
    pub fn compute(records: &[PackageStat]) -> Self {
        let translated: u64 = records.iter().map(PackageStat::translated).sum();
        let untranslated: u64 = records.iter().map(|p| p.untranslated).sum();
        let total: u64 = records.iter().map(|p| p.total).sum();
        let overall_percent = if total > 0 {
            translated as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            package_count: records.len(),
            translated,
            untranslated,
            total,
            overall_percent,
            fully_translated: records.iter().filter(|p| p.translated_pct >= 100.0).count(),
            zero_translated: records.iter().filter(|p| p.translated_pct == 0.0).count(),
        }
    }
}

/// The `n` most translated packages, highest first.
pub fn top_translated(records: &[PackageStat], n: usize) -> Vec<&PackageStat> {
    let mut all: Vec<&PackageStat> = records.iter().collect();
    sort(&mut all, SortKey::MostTranslated);
    all.truncate(n);
    all
}

/// The `n` least translated packages that have any strings, lowest first.
pub fn least_translated(records: &[PackageStat], n: usize) -> Vec<&PackageStat> {
    let mut with_strings: Vec<&PackageStat> = records.iter().filter(|p| p.total > 0).collect();
    sort(&mut with_strings, SortKey::LeastTranslated);
    with_strings.truncate(n);
    with_strings
}

/// Started but under `threshold` percent, in source order.
pub fn low_translated(records: &[PackageStat], threshold: f64) -> Vec<&PackageStat> {
    records
        .iter()
        .filter(|p| p.translated_pct > 0.0 && p.translated_pct < threshold)
        .collect()
}

/// Heatmap colour bucket of one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatLevel {
    Complete,
    High,
    Medium,
    Low,
    None,
}

impl HeatLevel {
    pub fn from_percent(pct: f64) -> Self {
        if pct >= 100.0 {
            HeatLevel::Complete
        } else if pct >= 75.0 {
            HeatLevel::High
        } else if pct >= 50.0 {
            HeatLevel::Medium
        } else if pct > 0.0 {
            HeatLevel::Low
        } else {
            HeatLevel::None
        }
    }
}
