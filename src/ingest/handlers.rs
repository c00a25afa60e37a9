// Type-specific handlers for classified export files
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::{
    AccountSummary, FollowSummary, LibrarySummary, PlayEvent, PlaylistRow, PlaylistSummary,
    SearchQuery, SearchSample, WrappedSummary,
};
use crate::normalize::fields::{first_available, to_bool, to_f64, to_string_value, truncate_chars};
use crate::normalize::{normalize_play_event, MAX_NAME_LEN};

/// Estimated playlist track length in minutes. Per-track durations are
/// not reliably present in exports, so playlist minutes are an estimate.
pub const AVERAGE_TRACK_MINUTES: f64 = 3.5;

/// Placeholder name new playlists carry before the user renames them
const DEFAULT_PLAYLIST_NAME: &str = "New Playlist";

/// Keep every Nth record so that oversized inputs reduce to at most
/// `cap` entries. Deterministic: repeated runs keep the same records.
pub fn stride_sample<T>(records: Vec<T>, cap: usize) -> Vec<T> {
    if cap == 0 || records.len() <= cap {
        return records;
    }
    let stride = records.len().div_ceil(cap);
    records
        .into_iter()
        .step_by(stride)
        .collect()
}

/// Result of normalizing one streaming-history file
#[derive(Debug, Default)]
pub struct StreamingBatch {
    pub events: Vec<PlayEvent>,
    pub records_skipped: usize,
    pub records_sampled_out: usize,
}

/// Normalize one streaming-history file: stride-sample oversized files,
/// then map each surviving record through the schema normalizer.
/// Individual bad records are skipped, never the whole file.
pub fn handle_streaming_file(payload: &Value, cap: usize) -> StreamingBatch {
    let records: Vec<&Value> = match payload.as_array() {
        Some(records) => records.iter().collect(),
        None => {
            return StreamingBatch {
                records_skipped: 1,
                ..Default::default()
            }
        }
    };

    let total = records.len();
    let sampled = stride_sample(records, cap);
    let mut batch = StreamingBatch {
        records_sampled_out: total - sampled.len(),
        ..Default::default()
    };

    for record in sampled {
        match normalize_play_event(record) {
            Ok(event) => batch.events.push(event),
            Err(_) => batch.records_skipped += 1,
        }
    }

    batch
}

/// Single account record from the Userdata export.
pub fn handle_account(payload: &Value) -> Option<AccountSummary> {
    let record = payload.as_object()?;
    let field = |key: &str| {
        record
            .get(key)
            .filter(|v| !v.is_null())
            .and_then(to_string_value)
    };
    let summary = AccountSummary {
        username: field("username"),
        email: field("email"),
        country: field("country"),
        birthdate: field("birthdate"),
        creation_time: field("creationTime"),
    };
    (!summary.is_empty()).then_some(summary)
}

fn section_len(record: &serde_json::Map<String, Value>, key: &str) -> usize {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|a| a.len())
        .unwrap_or(0)
}

fn sample_names(
    record: &serde_json::Map<String, Value>,
    section: &str,
    keys: &[&str],
    cap: usize,
) -> Vec<String> {
    let Some(items) = record.get(section).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => first_available(obj, keys).and_then(to_string_value),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .map(|name| truncate_chars(&name, MAX_NAME_LEN))
        .take(cap)
        .collect()
}

/// Library counts plus capped name samples from the YourLibrary export.
pub fn handle_library(payload: &Value, sample_cap: usize) -> Option<LibrarySummary> {
    let record = payload.as_object()?;
    let summary = LibrarySummary {
        track_count: section_len(record, "tracks"),
        album_count: section_len(record, "albums"),
        artist_count: section_len(record, "artists"),
        show_count: section_len(record, "shows"),
        episode_count: section_len(record, "episodes"),
        banned_track_count: section_len(record, "bannedTracks"),
        banned_artist_count: section_len(record, "bannedArtists"),
        sample_tracks: sample_names(record, "tracks", &["track", "trackName", "name"], sample_cap),
        sample_artists: sample_names(record, "artists", &["name", "artist"], sample_cap),
    };
    (!summary.is_empty()).then_some(summary)
}

/// Stride-sampled search-query log.
pub fn handle_searches(payload: &Value, cap: usize) -> Option<SearchSample> {
    let records = payload.as_array()?;
    if records.is_empty() {
        return None;
    }

    let total_queries = records.len();
    let queries = stride_sample(records.iter().collect::<Vec<_>>(), cap)
        .into_iter()
        .filter_map(|record| {
            let obj = record.as_object()?;
            let term = first_available(obj, &["searchQuery", "term", "query"])
                .and_then(to_string_value)?;
            let time = first_available(obj, &["searchTime", "time", "ts"]).and_then(to_string_value);
            Some(SearchQuery {
                term: truncate_chars(&term, MAX_NAME_LEN),
                time,
            })
        })
        .collect::<Vec<_>>();

    if queries.is_empty() {
        return None;
    }
    Some(SearchSample {
        total_queries,
        queries,
    })
}

fn wrapped_year_regex() -> &'static Regex {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    YEAR_RE.get_or_init(|| Regex::new(r"(\d{4})").expect("valid wrapped year regex"))
}

/// One Wrapped year file, reduced to its scalar top-level fields.
pub fn handle_wrapped(filename: &str, payload: &Value) -> Option<WrappedSummary> {
    let record = payload.as_object()?;

    let year = wrapped_year_regex()
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok());

    let highlights: BTreeMap<String, Value> = record
        .iter()
        .filter(|(_, value)| value.is_string() || value.is_number() || value.is_boolean())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if highlights.is_empty() && year.is_none() {
        return None;
    }
    Some(WrappedSummary {
        source_file: filename.to_string(),
        year,
        highlights,
    })
}

/// Playlist rows from one Playlist export file. Playlists without a real
/// name or without any tracks are dropped; minutes are estimated from
/// the track count.
pub fn handle_playlists(payload: &Value) -> Option<PlaylistSummary> {
    let playlists = payload.as_object()?.get("playlists")?.as_array()?;

    let rows: Vec<PlaylistRow> = playlists
        .iter()
        .filter_map(|playlist| {
            let obj = playlist.as_object()?;
            let name = obj
                .get("name")
                .filter(|v| !v.is_null())
                .and_then(to_string_value)?;
            if name.is_empty() || name == DEFAULT_PLAYLIST_NAME {
                debug!(playlist = %name, "dropping unnamed playlist");
                return None;
            }
            let track_count = obj
                .get("items")
                .and_then(Value::as_array)
                .map(|items| items.len())
                .unwrap_or(0);
            if track_count == 0 {
                return None;
            }
            Some(PlaylistRow {
                name: truncate_chars(&name, MAX_NAME_LEN),
                estimated_minutes: track_count as f64 * AVERAGE_TRACK_MINUTES,
                track_count,
                collaborative: obj.get("collaborative").map(to_bool).unwrap_or(false),
                description: obj
                    .get("description")
                    .filter(|v| !v.is_null())
                    .and_then(to_string_value),
            })
        })
        .collect();

    if rows.is_empty() {
        return None;
    }
    Some(PlaylistSummary { playlists: rows })
}

/// Follower/following counts from the Follow export.
pub fn handle_follow(payload: &Value) -> Option<FollowSummary> {
    let record = payload.as_object()?;
    let count = |keys: &[&str]| {
        first_available(record, keys)
            .and_then(to_f64)
            .map(|v| v.max(0.0) as u64)
            .unwrap_or(0)
    };
    let summary = FollowSummary {
        follower_count: count(&["followerCount"]),
        following_count: count(&["followingUsersCount", "followingCount"]),
        dismissing_count: count(&["dismissingUsersCount"]),
    };
    if summary == FollowSummary::default() {
        return None;
    }
    Some(summary)
}

/// Rough record count for files we catalog without normalizing.
pub fn record_count(payload: &Value) -> usize {
    match payload {
        Value::Array(items) => items.len(),
        Value::Object(record) => {
            let nested: usize = record
                .values()
                .filter_map(Value::as_array)
                .map(|a| a.len())
                .sum();
            if nested > 0 {
                nested
            } else {
                1
            }
        }
        _ => 0,
    }
}
