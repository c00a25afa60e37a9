// Per-artist loyalty scores: how regularly an artist gets listened to
// across the span of days they appear in
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::aggregate::is_placeholder;
use crate::models::PlayEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyEntry {
    pub artist: String,
    /// `unique_days / (span_days + 1) * 100`
    pub score: f64,
    pub unique_days: usize,
    pub span_days: i64,
    pub total_minutes: f64,
}

struct ArtistDays {
    days: BTreeSet<NaiveDate>,
    total_minutes: f64,
    first_seen: usize,
}

/// Rank artists by loyalty score. Artists under `min_minutes` of total
/// listening are excluded entirely (insufficient signal), as are events
/// without a parseable date. `None` on empty input.
pub fn loyalty_ranking(
    events: &[PlayEvent],
    min_minutes: f64,
    n: usize,
) -> Option<Vec<LoyaltyEntry>> {
    if events.is_empty() {
        return None;
    }

    let mut per_artist: HashMap<&str, ArtistDays> = HashMap::new();
    let mut order = 0usize;

    for event in events {
        if is_placeholder(&event.artist) {
            continue;
        }
        let Some(date) = event.date() else {
            continue;
        };
        let entry = per_artist
            .entry(event.artist.as_str())
            .or_insert_with(|| {
                let slot = ArtistDays {
                    days: BTreeSet::new(),
                    total_minutes: 0.0,
                    first_seen: order,
                };
                order += 1;
                slot
            });
        entry.days.insert(date);
        entry.total_minutes += event.minutes_played();
    }

    let mut ranked: Vec<(LoyaltyEntry, usize)> = per_artist
        .into_iter()
        .filter(|(_, stats)| stats.total_minutes >= min_minutes)
        .map(|(artist, stats)| {
            // days is never empty here: entries are only created for dated events
            let span_days = match (stats.days.first(), stats.days.last()) {
                (Some(first), Some(last)) => (*last - *first).num_days(),
                _ => 0,
            };
            let unique_days = stats.days.len();
            let score = unique_days as f64 / (span_days + 1) as f64 * 100.0;
            (
                LoyaltyEntry {
                    artist: artist.to_string(),
                    score,
                    unique_days,
                    span_days,
                    total_minutes: stats.total_minutes,
                },
                stats.first_seen,
            )
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.0.score
            .partial_cmp(&a.0.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });

    Some(ranked.into_iter().take(n).map(|(entry, _)| entry).collect())
}
