// Data models shared across the ingestion and aggregation pipeline
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalize::fields::parse_timestamp;

/// Plays longer than this count as a complete listen
pub const COMPLETE_PLAY_THRESHOLD_MS: f64 = 30_000.0;

/// Coarse classification of a single play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayType {
    Complete,
    Partial,
}

impl PlayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayType::Complete => "Complete",
            PlayType::Partial => "Partial",
        }
    }
}

/// One normalized streaming event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub track: String,
    pub artist: String,
    pub album: String,
    pub year: i32,
    pub ms_played: f64,
    pub timestamp: Option<String>,
    pub platform: Option<String>,
    pub skipped: bool,
    pub shuffle: bool,
    pub offline: bool,
    pub reason_start: Option<String>,
    pub reason_end: Option<String>,
    pub conn_country: Option<String>,
}

impl PlayEvent {
    pub fn minutes_played(&self) -> f64 {
        self.ms_played / 60_000.0
    }

    pub fn hours_played(&self) -> f64 {
        self.ms_played / 3_600_000.0
    }

    pub fn play_type(&self) -> PlayType {
        if self.ms_played > COMPLETE_PLAY_THRESHOLD_MS {
            PlayType::Complete
        } else {
            PlayType::Partial
        }
    }

    /// Timestamp parsed back out of the raw string, if one was recorded
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    /// `YYYY-MM` grouping key, when the timestamp parses
    pub fn year_month(&self) -> Option<String> {
        self.parsed_timestamp()
            .map(|ts| format!("{:04}-{:02}", ts.year(), ts.month()))
    }

    /// Calendar date of the play, when the timestamp parses
    pub fn date(&self) -> Option<NaiveDate> {
        self.parsed_timestamp().map(|ts| ts.date())
    }
}

/// The canonical dataset for one profile: every normalized play event,
/// in ingestion order. Replaced wholesale on rebuild, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub events: Vec<PlayEvent>,
}

impl Dataset {
    pub fn new(events: Vec<PlayEvent>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_minutes(&self) -> f64 {
        self.events.iter().map(|e| e.minutes_played()).sum()
    }
}

// ===== Auxiliary datasets =====

/// Account info from the Userdata export, single record per profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub username: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub birthdate: Option<String>,
    pub creation_time: Option<String>,
}

impl AccountSummary {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.country.is_none()
            && self.birthdate.is_none()
            && self.creation_time.is_none()
    }
}

/// Saved-library counts plus capped name samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySummary {
    pub track_count: usize,
    pub album_count: usize,
    pub artist_count: usize,
    pub show_count: usize,
    pub episode_count: usize,
    pub banned_track_count: usize,
    pub banned_artist_count: usize,
    pub sample_tracks: Vec<String>,
    pub sample_artists: Vec<String>,
}

impl LibrarySummary {
    pub fn is_empty(&self) -> bool {
        self.track_count == 0
            && self.album_count == 0
            && self.artist_count == 0
            && self.show_count == 0
            && self.episode_count == 0
            && self.banned_track_count == 0
            && self.banned_artist_count == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub term: String,
    pub time: Option<String>,
}

/// Sampled search-query log; `total_queries` counts the full log before sampling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSample {
    pub total_queries: usize,
    pub queries: Vec<SearchQuery>,
}

/// One Wrapped year-summary file, reduced to its scalar fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedSummary {
    pub source_file: String,
    pub year: Option<i32>,
    pub highlights: BTreeMap<String, serde_json::Value>,
}

/// One playlist row. Minutes are estimated from track count, not measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRow {
    pub name: String,
    pub estimated_minutes: f64,
    pub track_count: usize,
    pub collaborative: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub playlists: Vec<PlaylistRow>,
}

/// Social graph counts from the Follow export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowSummary {
    pub follower_count: u64,
    pub following_count: u64,
    pub dismissing_count: u64,
}

/// A commerce export we only catalog, never normalize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommerceFile {
    pub filename: String,
    pub record_count: usize,
}

/// Side table for everything that has no dedicated dataset: social counts,
/// commerce file catalog, and files the classifier did not recognize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiscSummary {
    pub follow: Option<FollowSummary>,
    pub commerce: Vec<CommerceFile>,
    pub unrecognized: Vec<String>,
}

impl MiscSummary {
    pub fn is_empty(&self) -> bool {
        self.follow.is_none() && self.commerce.is_empty() && self.unrecognized.is_empty()
    }
}

/// Everything ingested for one profile: the canonical dataset plus the
/// optional side tables. Absent side tables mean the export did not
/// contain that category of file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    pub canonical: Dataset,
    pub account: Option<AccountSummary>,
    pub library: Option<LibrarySummary>,
    pub searches: Option<SearchSample>,
    pub wrapped: Vec<WrappedSummary>,
    pub playlists: Option<PlaylistSummary>,
    pub misc: Option<MiscSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ms: f64, ts: Option<&str>) -> PlayEvent {
        PlayEvent {
            track: "Song".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            year: 2021,
            ms_played: ms,
            timestamp: ts.map(|s| s.to_string()),
            platform: None,
            skipped: false,
            shuffle: false,
            offline: false,
            reason_start: None,
            reason_end: None,
            conn_country: None,
        }
    }

    #[test]
    fn test_minutes_and_hours() {
        let e = event(90_000.0, None);
        assert!((e.minutes_played() - 1.5).abs() < 1e-9);
        assert!((e.hours_played() - 0.025).abs() < 1e-9);
    }

    #[test]
    fn test_play_type_threshold() {
        assert_eq!(event(30_001.0, None).play_type(), PlayType::Complete);
        assert_eq!(event(30_000.0, None).play_type(), PlayType::Partial);
        assert_eq!(event(0.0, None).play_type(), PlayType::Partial);
    }

    #[test]
    fn test_year_month_and_date() {
        let e = event(1000.0, Some("2021-03-04T12:34:56Z"));
        assert_eq!(e.year_month().as_deref(), Some("2021-03"));
        assert_eq!(
            e.date(),
            Some(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap())
        );
    }

    #[test]
    fn test_missing_timestamp_yields_no_derived_dates() {
        let e = event(1000.0, None);
        assert_eq!(e.year_month(), None);
        assert_eq!(e.date(), None);
    }
}
