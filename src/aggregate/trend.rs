// Listening trends over time, grouped by year-month with a yearly fallback
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::PlayEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendGranularity {
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub minutes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub granularity: TrendGranularity,
    pub points: Vec<TrendPoint>,
}

fn grouped_points(groups: HashMap<String, f64>) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = groups
        .into_iter()
        .map(|(label, minutes)| TrendPoint { label, minutes })
        .collect();
    points.sort_by(|a, b| a.label.cmp(&b.label));
    points
}

/// Sum minutes per year-month. When fewer than `min_months` distinct
/// year-months are recoverable from timestamps, fall back to grouping by
/// the year field, which every event carries. `None` on empty input.
pub fn listening_trend(events: &[PlayEvent], min_months: usize) -> Option<TrendSeries> {
    if events.is_empty() {
        return None;
    }

    let mut monthly: HashMap<String, f64> = HashMap::new();
    for event in events {
        if let Some(month) = event.year_month() {
            *monthly.entry(month).or_insert(0.0) += event.minutes_played();
        }
    }

    if monthly.len() >= min_months {
        return Some(TrendSeries {
            granularity: TrendGranularity::Monthly,
            points: grouped_points(monthly),
        });
    }

    let mut yearly: HashMap<String, f64> = HashMap::new();
    for event in events {
        *yearly.entry(event.year.to_string()).or_insert(0.0) += event.minutes_played();
    }

    Some(TrendSeries {
        granularity: TrendGranularity::Yearly,
        points: grouped_points(yearly),
    })
}
