// Record normalization: one raw streaming-history record in, one
// canonical play event out
use chrono::Datelike;
use serde_json::Value;
use thiserror::Error;

use crate::models::PlayEvent;
use crate::normalize::fields::{
    first_available, parse_timestamp, timestamp_string, to_bool, to_f64, to_string_value,
    truncate_chars,
};

/// Defensive cap on name-like string fields
pub const MAX_NAME_LEN: usize = 100;

/// Year recorded when no timestamp in the record parses
pub const DEFAULT_YEAR: i32 = 1970;

/// Ordered field-preference lists, oldest export schema last
const TRACK_KEYS: &[&str] = &["master_metadata_track_name", "trackName", "track", "song"];
const ARTIST_KEYS: &[&str] = &["master_metadata_album_artist_name", "artistName", "artist"];
const ALBUM_KEYS: &[&str] = &["master_metadata_album_album_name", "albumName", "album"];
const DURATION_KEYS: &[&str] = &["ms_played", "msPlayed"];
const TIMESTAMP_KEYS: &[&str] = &["ts", "endTime"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("record is not a JSON object")]
    NotAnObject,
}

fn name_field(record: &serde_json::Map<String, Value>, keys: &[&str]) -> String {
    let resolved = first_available(record, keys)
        .and_then(to_string_value)
        .unwrap_or_else(|| "Unknown".to_string());
    truncate_chars(&resolved, MAX_NAME_LEN)
}

fn optional_string(record: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    record
        .get(key)
        .filter(|v| !v.is_null())
        .and_then(to_string_value)
        .map(|s| truncate_chars(&s, MAX_NAME_LEN))
}

fn bool_field(record: &serde_json::Map<String, Value>, key: &str) -> bool {
    record.get(key).map(to_bool).unwrap_or(false)
}

/// Normalize one raw record into a canonical play event.
///
/// Missing name fields resolve to "Unknown", an unparseable duration
/// resolves to 0 and an unparseable timestamp falls back to the default
/// year. Only a record that is not an object at all is rejected.
pub fn normalize_play_event(raw: &Value) -> Result<PlayEvent, NormalizeError> {
    let record = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let track = name_field(record, TRACK_KEYS);
    let artist = name_field(record, ARTIST_KEYS);
    let album = name_field(record, ALBUM_KEYS);

    let ms_played = first_available(record, DURATION_KEYS)
        .and_then(to_f64)
        .unwrap_or(0.0)
        .max(0.0);

    let timestamp = timestamp_string(record, TIMESTAMP_KEYS);
    let parsed = timestamp.as_deref().and_then(parse_timestamp);
    let year = parsed.map(|ts| ts.year()).unwrap_or(DEFAULT_YEAR);
    // Keep the raw string only when it actually parses, so derived
    // date fields never disagree with the stored year.
    let timestamp = parsed.and(timestamp);

    Ok(PlayEvent {
        track,
        artist,
        album,
        year,
        ms_played,
        timestamp,
        platform: optional_string(record, "platform"),
        skipped: bool_field(record, "skipped"),
        shuffle: bool_field(record, "shuffle"),
        offline: bool_field(record, "offline"),
        reason_start: optional_string(record, "reason_start"),
        reason_end: optional_string(record, "reason_end"),
        conn_country: optional_string(record, "conn_country"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_modern_export_record() {
        let raw = json!({
            "ts": "2021-06-01T08:30:00Z",
            "master_metadata_track_name": "Song A",
            "master_metadata_album_artist_name": "Artist X",
            "master_metadata_album_album_name": "Album Z",
            "ms_played": 215000,
            "platform": "android",
            "skipped": false,
            "shuffle": true,
            "offline": false,
            "reason_start": "trackdone",
            "reason_end": "trackdone",
            "conn_country": "DE"
        });
        let event = normalize_play_event(&raw).unwrap();
        assert_eq!(event.track, "Song A");
        assert_eq!(event.artist, "Artist X");
        assert_eq!(event.album, "Album Z");
        assert_eq!(event.year, 2021);
        assert_eq!(event.ms_played, 215_000.0);
        assert!(event.shuffle);
        assert!(!event.skipped);
        assert_eq!(event.conn_country.as_deref(), Some("DE"));
    }

    #[test]
    fn test_legacy_export_record() {
        let raw = json!({
            "endTime": "2019-11-20 21:03",
            "trackName": "Old Song",
            "artistName": "Old Artist",
            "msPlayed": 43000
        });
        let event = normalize_play_event(&raw).unwrap();
        assert_eq!(event.track, "Old Song");
        assert_eq!(event.artist, "Old Artist");
        assert_eq!(event.album, "Unknown");
        assert_eq!(event.year, 2019);
        assert_eq!(event.ms_played, 43_000.0);
    }

    #[test]
    fn test_preference_order_wins_over_legacy_names() {
        let raw = json!({
            "master_metadata_track_name": "Canonical",
            "trackName": "Legacy",
            "msPlayed": 1000
        });
        let event = normalize_play_event(&raw).unwrap();
        assert_eq!(event.track, "Canonical");
    }

    #[test]
    fn test_missing_fields_default() {
        let event = normalize_play_event(&json!({})).unwrap();
        assert_eq!(event.track, "Unknown");
        assert_eq!(event.artist, "Unknown");
        assert_eq!(event.album, "Unknown");
        assert_eq!(event.ms_played, 0.0);
        assert_eq!(event.year, DEFAULT_YEAR);
        assert_eq!(event.timestamp, None);
    }

    #[test]
    fn test_unparseable_duration_defaults_to_zero() {
        let raw = json!({"trackName": "A", "msPlayed": "soon"});
        let event = normalize_play_event(&raw).unwrap();
        assert_eq!(event.ms_played, 0.0);
    }

    #[test]
    fn test_negative_duration_clamped() {
        let raw = json!({"trackName": "A", "msPlayed": -500});
        let event = normalize_play_event(&raw).unwrap();
        assert_eq!(event.ms_played, 0.0);
    }

    #[test]
    fn test_unparseable_timestamp_falls_back_to_default_year() {
        let raw = json!({"trackName": "A", "ts": "not a date"});
        let event = normalize_play_event(&raw).unwrap();
        assert_eq!(event.year, DEFAULT_YEAR);
        assert_eq!(event.timestamp, None);
    }

    #[test]
    fn test_nested_date_wrapper() {
        let raw = json!({"trackName": "A", "ts": {"$date": "2018-02-03T04:05:06Z"}});
        let event = normalize_play_event(&raw).unwrap();
        assert_eq!(event.year, 2018);
        assert!(event.timestamp.is_some());
    }

    #[test]
    fn test_long_names_truncated() {
        let long = "x".repeat(500);
        let raw = json!({"trackName": long, "msPlayed": 1});
        let event = normalize_play_event(&raw).unwrap();
        assert_eq!(event.track.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_non_object_record_rejected() {
        assert_eq!(
            normalize_play_event(&json!(["not", "an", "object"])),
            Err(NormalizeError::NotAnObject)
        );
        assert_eq!(
            normalize_play_event(&json!("plain string")),
            Err(NormalizeError::NotAnObject)
        );
    }
}
