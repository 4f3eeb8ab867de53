//! Launchpad translation-statistics page parser.
//!
//! Extracts one `PackageStat` per row of the `translation-stats` table and the
//! total result count from the batch navigation caption. Malformed rows are
//! skipped and unparseable numbers become 0, so a partially broken page still
//! yields the rows that could be read.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::stats::PackageStat;

/// Minimum number of data cells in a usable row.
const MIN_CELLS: usize = 8;

static STATS_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.translation-stats").unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr[id]").unwrap());
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static SORTKEY: Lazy<Selector> = Lazy::new(|| Selector::parse("span.sortkey").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static NAVIGATION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td.batch-navigation-index").unwrap());
static TOTAL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"of\s+([\d,]+)").unwrap());

/// One parsed result page.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsPage {
    pub records: Vec<PackageStat>,
    /// Total results across all pages, 0 when the caption is missing.
    pub total: usize,
}

impl StatsPage {
    /// Parse records and total count from a single document.
    pub fn parse(html: &str, site_url: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            records: extract_records(&document, site_url),
            total: extract_total(&document),
        }
    }
}

/// Parse all package rows of a statistics page.
///
/// Relative template links are resolved against `site_url`.
pub fn parse_page(html: &str, site_url: &str) -> Vec<PackageStat> {
    extract_records(&Html::parse_document(html), site_url)
}

/// Total result count from the "1 → 300 of 1,234 results" caption.
pub fn parse_total_count(html: &str) -> usize {
    extract_total(&Html::parse_document(html))
}

fn extract_records(document: &Html, site_url: &str) -> Vec<PackageStat> {
    let Some(table) = document.select(&STATS_TABLE).next() else {
        return Vec::new();
    };

    table
        .select(&ROW)
        .filter_map(|row| parse_row(row, site_url))
        .collect()
}

fn parse_row(row: ElementRef<'_>, site_url: &str) -> Option<PackageStat> {
    let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
    if cells.len() < MIN_CELLS {
        return None;
    }

    let link = cells[0].select(&LINK).next()?;
    let href = link.value().attr("href")?;
    let name = text_content(&link);

    let translated_pct = sortkey(&cells[1])
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|pct| pct.is_finite())
        .unwrap_or(0.0);

    let total = sortkey(&cells[5])
        .or_else(|| Some(text_content(&cells[5])))
        .map(|s| parse_count(&s))
        .unwrap_or(0);

    let last_edited = cells[6]
        .select(&TIME)
        .next()
        .map(|t| text_content(&t))
        .unwrap_or_default();

    let last_editor = cells[7]
        .select(&LINK)
        .next()
        .map(|a| text_content(&a))
        .unwrap_or_default();

    Some(PackageStat {
        name,
        translated_pct,
        untranslated: sortkey_count(&cells[2]),
        need_review: sortkey_count(&cells[3]),
        changed: sortkey_count(&cells[4]),
        total,
        last_edited,
        last_editor,
        detail_url: absolute_url(site_url, href),
    })
}

fn extract_total(document: &Html) -> usize {
    document
        .select(&NAVIGATION)
        .next()
        .map(|nav| nav.text().collect::<String>())
        .and_then(|text| {
            TOTAL_PATTERN
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .map(|m| parse_count(m.as_str()) as usize)
        })
        .unwrap_or(0)
}

/// Machine-sortable value of a cell, as opposed to its rendered text.
fn sortkey(cell: &ElementRef<'_>) -> Option<String> {
    cell.select(&SORTKEY).next().map(|s| text_content(&s))
}

fn sortkey_count(cell: &ElementRef<'_>) -> u64 {
    sortkey(cell).map(|s| parse_count(&s)).unwrap_or(0)
}

/// Non-negative integer, tolerating digit-group separators. Anything else is 0.
fn parse_count(raw: &str) -> u64 {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<u64>() {
        return n;
    }
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    digits.parse().unwrap_or(0)
}

fn absolute_url(site_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let base = site_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{}{}", base, href)
    } else {
        format!("{}/{}", base, href)
    }
}

fn text_content(element: &ElementRef<'_>) -> String {
    element.text().map(str::trim).collect::<String>()
}
