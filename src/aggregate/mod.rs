// Aggregation engine: filter-option domains and ranked aggregates over
// the canonical dataset
pub mod filters;
pub mod loyalty;
pub mod top;
pub mod trend;

pub use filters::{apply_selection, filter_options, FilterOptions, FilterSelection};
pub use loyalty::{loyalty_ranking, LoyaltyEntry};
pub use top::{top_by_minutes, RankedEntry};
pub use trend::{listening_trend, TrendGranularity, TrendPoint, TrendSeries};

use crate::models::PlayEvent;

/// Metadata placeholders excluded from every ranking query so results
/// are never dominated by missing-metadata rows
const PLACEHOLDER_VALUES: &[&str] = &["unknown", "n/a", "", "null"];

/// True when a dimension value is a missing-metadata placeholder.
pub fn is_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();
    PLACEHOLDER_VALUES.contains(&lower.as_str())
}

/// Rankable dimension of the canonical dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Dimension {
    Artist,
    Album,
    Track,
}

impl Dimension {
    pub fn value<'a>(&self, event: &'a PlayEvent) -> &'a str {
        match self {
            Dimension::Artist => &event.artist,
            Dimension::Album => &event.album,
            Dimension::Track => &event.track,
        }
    }
}
