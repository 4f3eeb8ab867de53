//! Translation statistics records and the keys that identify a result set.
//!
//! A result set is identified by a `(distro, lang)` pair (`StatsKey`) and
//! consists of one `PackageStat` per translation template.

mod languages;
mod types;

pub use languages::*;
pub use types::*;
