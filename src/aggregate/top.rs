// Ranked top-N aggregates by summed minutes played
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::aggregate::{is_placeholder, Dimension};
use crate::models::PlayEvent;

/// One ranked entity with its accumulated listening totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub minutes: f64,
    pub plays: usize,
}

/// Rank the top `n` entities of a dimension by summed minutes played,
/// descending, ties broken by first-encountered order. Placeholder
/// values never appear in the ranking. Returns `None` on an empty (or
/// fully filtered-out) dataset as the explicit no-data signal.
pub fn top_by_minutes(events: &[PlayEvent], dimension: Dimension, n: usize) -> Option<Vec<RankedEntry>> {
    if events.is_empty() {
        return None;
    }

    // name -> (minutes, plays, first-encountered index)
    let mut totals: HashMap<&str, (f64, usize, usize)> = HashMap::new();
    let mut order = 0usize;

    for event in events {
        let value = dimension.value(event);
        if is_placeholder(value) {
            continue;
        }
        let entry = totals.entry(value).or_insert_with(|| {
            let slot = (0.0, 0, order);
            order += 1;
            slot
        });
        entry.0 += event.minutes_played();
        entry.1 += 1;
    }

    let mut ranked: Vec<(&str, (f64, usize, usize))> = totals.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1 .0
            .partial_cmp(&a.1 .0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1 .2.cmp(&b.1 .2))
    });

    Some(
        ranked
            .into_iter()
            .take(n)
            .map(|(name, (minutes, plays, _))| RankedEntry {
                name: name.to_string(),
                minutes,
                plays,
            })
            .collect(),
    )
}
