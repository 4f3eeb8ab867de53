//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the transport and cache
//! traits, plus fixtures that render Launchpad-shaped result pages, so the
//! whole fetch pipeline can run without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use l10n_core::testing::{fixtures, MockTransport, MemoryCache};
//!
//! let transport = MockTransport::new();
//! transport.serve(&url, fixtures::stats_page_html(&rows, Some(rows.len())));
//! let cache = MemoryCache::new();
//! ```

mod mock_cache;
mod mock_transport;

pub use mock_cache::MemoryCache;
pub use mock_transport::MockTransport;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::stats::PackageStat;

    /// Site prefix used by fixture links.
    pub const SITE_URL: &str = "https://translations.launchpad.net";

    /// Create a package stat with reasonable defaults.
    pub fn package_stat(name: &str, translated_pct: f64, untranslated: u64, total: u64) -> PackageStat {
        PackageStat {
            name: name.to_string(),
            translated_pct,
            untranslated,
            need_review: 0,
            changed: 0,
            total,
            last_edited: "2024-04-01".to_string(),
            last_editor: "Test Translator".to_string(),
            detail_url: template_url(name),
        }
    }

    /// Absolute translate URL the fixture page gives a template.
    pub fn template_url(name: &str) -> String {
        format!("{}{}", SITE_URL, template_path(name))
    }

    fn template_path(name: &str) -> String {
        format!("/ubuntu/noble/+source/{0}/+pots/{0}/sv/+translate", name)
    }

    /// One table row of a rendered statistics page.
    #[derive(Debug, Clone)]
    pub struct PageRow {
        pub name: String,
        pub translated_pct: f64,
        pub untranslated: u64,
        pub need_review: u64,
        pub changed: u64,
        pub total: u64,
        pub last_edited: Option<String>,
        pub last_editor: Option<String>,
    }

    impl PageRow {
        pub fn new(
            name: &str,
            translated_pct: f64,
            untranslated: u64,
            need_review: u64,
            changed: u64,
            total: u64,
        ) -> Self {
            Self {
                name: name.to_string(),
                translated_pct,
                untranslated,
                need_review,
                changed,
                total,
                last_edited: None,
                last_editor: None,
            }
        }

        pub fn edited(mut self, when: &str, who: &str) -> Self {
            self.last_edited = Some(when.to_string());
            self.last_editor = Some(who.to_string());
            self
        }

        fn render(&self, index: usize) -> String {
            let time = self
                .last_edited
                .as_ref()
                .map(|t| format!(r#"<time datetime="{0}">{0}</time>"#, t))
                .unwrap_or_default();
            let editor = self
                .last_editor
                .as_ref()
                .map(|who| format!(r#"<a href="/~translator">{}</a>"#, who))
                .unwrap_or_default();
            format!(
                r#"<tr id="template-{index}" class="template">
  <td><a href="{href}">{name}</a></td>
  <td><span class="sortkey">{pct}</span><div class="progress">{pct}%</div></td>
  <td><span class="sortkey">{untranslated}</span>{untranslated}</td>
  <td><span class="sortkey">{need_review}</span>{need_review}</td>
  <td><span class="sortkey">{changed}</span>{changed}</td>
  <td>{total}</td>
  <td>{time}</td>
  <td>{editor}</td>
</tr>
"#,
                index = index,
                href = template_path(&self.name),
                name = self.name,
                pct = self.translated_pct,
                untranslated = self.untranslated,
                need_review = self.need_review,
                changed = self.changed,
                total = self.total,
                time = time,
                editor = editor,
            )
        }
    }

    impl From<&PackageStat> for PageRow {
        fn from(stat: &PackageStat) -> Self {
            PageRow::new(
                &stat.name,
                stat.translated_pct,
                stat.untranslated,
                stat.need_review,
                stat.changed,
                stat.total,
            )
        }
    }

    /// Render a statistics page with the given rows.
    ///
    /// `total` adds the "1 → N of TOTAL results" navigation caption.
    pub fn stats_page_html(rows: &[PageRow], total: Option<usize>) -> String {
        let navigation = total
            .map(|total| {
                format!(
                    r#"<table class="upper-batch-nav"><tr>
  <td class="batch-navigation-index"><strong>1</strong> &rarr; <strong>{}</strong> of {} results</td>
</tr></table>"#,
                    rows.len(),
                    total
                )
            })
            .unwrap_or_default();
        let body: String = rows
            .iter()
            .enumerate()
            .map(|(i, row)| row.render(i))
            .collect();
        format!(
            r#"<!DOCTYPE html>
<html><head><title>Translations</title></head>
<body>
{navigation}
<table class="listing sortable translation-stats" id="language-stats">
<thead><tr><th>Template</th><th>Status</th><th>Untranslated</th><th>Need review</th>
<th>Changed</th><th>Total</th><th>Last edited</th><th>By</th></tr></thead>
<tbody>
{body}</tbody>
</table>
</body></html>"#,
            navigation = navigation,
            body = body,
        )
    }

    /// `count` generated rows named `pkg-0000`, `pkg-0001`, ... starting at `offset`.
    pub fn numbered_rows(offset: usize, count: usize) -> Vec<PageRow> {
        (offset..offset + count)
            .map(|i| PageRow::new(&format!("pkg-{:04}", i), (i % 101) as f64, 1, 0, 0, 10))
            .collect()
    }
}
