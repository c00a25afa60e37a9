// Ingestion pipeline: runs every classified file through its handler and
// assembles the canonical dataset plus auxiliary side tables
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::IngestSettings;
use crate::ingest::handlers;
use crate::ingest::scanner::{scan_profile_dir, FileCategory, RawExportFile};
use crate::models::{CommerceFile, Dataset, MiscSummary, PlayEvent, PlaylistSummary, ProfileData};

/// Why one file was skipped during ingestion
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// What happened during one ingestion pass. Returned to the caller
/// instead of being logged and forgotten.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IngestReport {
    pub files_scanned: usize,
    pub files_parsed: usize,
    pub skipped_files: Vec<SkippedFile>,
    pub unrecognized_files: Vec<String>,
    pub records_kept: usize,
    pub records_skipped: usize,
    pub records_sampled_out: usize,
}

/// Result of one full ingestion pass over a profile directory
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub data: ProfileData,
    pub report: IngestReport,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("profile directory {0:?} does not exist")]
    MissingProfileDir(PathBuf),
    /// The one outcome the caller must handle by prompting for an upload:
    /// not a single streaming-history file could be parsed.
    #[error("no parseable streaming history in the profile directory")]
    NoStreamingHistory,
}

fn read_payload(file: &RawExportFile) -> Result<Value, String> {
    let content = std::fs::read_to_string(&file.path)
        .map_err(|e| format!("read failed: {e}"))?;
    serde_json::from_str(&content).map_err(|e| format!("malformed JSON: {e}"))
}

/// Ingest every export file under `directory` into one ProfileData.
///
/// File-level failures are recorded in the report and skipped; the pass
/// only fails outright when the directory is missing or no streaming
/// history parses at all.
pub fn ingest_profile_dir(
    directory: &Path,
    settings: &IngestSettings,
) -> Result<IngestOutcome, IngestError> {
    if !directory.is_dir() {
        return Err(IngestError::MissingProfileDir(directory.to_path_buf()));
    }

    let files = scan_profile_dir(directory);
    let mut report = IngestReport {
        files_scanned: files.len(),
        ..Default::default()
    };

    let mut events: Vec<PlayEvent> = Vec::new();
    let mut streaming_files_parsed = 0usize;
    let mut account = None;
    let mut library = None;
    let mut searches = None;
    let mut wrapped = Vec::new();
    let mut playlist_rows = Vec::new();
    let mut follow = None;
    let mut commerce = Vec::new();

    for file in &files {
        if file.category == FileCategory::Unrecognized {
            debug!(file = %file.filename, "cataloging unrecognized file");
            report.unrecognized_files.push(file.filename.clone());
            continue;
        }

        let payload = match read_payload(file) {
            Ok(payload) => payload,
            Err(reason) => {
                warn!(file = %file.filename, %reason, "skipping file");
                report.skipped_files.push(SkippedFile {
                    filename: file.filename.clone(),
                    reason,
                });
                continue;
            }
        };

        match file.category {
            FileCategory::StreamingHistory => {
                let batch =
                    handlers::handle_streaming_file(&payload, settings.max_streaming_records);
                debug!(
                    file = %file.filename,
                    events = batch.events.len(),
                    skipped = batch.records_skipped,
                    sampled_out = batch.records_sampled_out,
                    "normalized streaming history"
                );
                report.records_skipped += batch.records_skipped;
                report.records_sampled_out += batch.records_sampled_out;
                events.extend(batch.events);
                streaming_files_parsed += 1;
            }
            FileCategory::Account => {
                if account.is_none() {
                    account = handlers::handle_account(&payload);
                }
            }
            FileCategory::Library => {
                if library.is_none() {
                    library = handlers::handle_library(&payload, settings.library_sample_size);
                }
            }
            FileCategory::Searches => {
                if searches.is_none() {
                    searches = handlers::handle_searches(&payload, settings.max_search_queries);
                }
            }
            FileCategory::Wrapped => {
                if let Some(summary) = handlers::handle_wrapped(&file.filename, &payload) {
                    wrapped.push(summary);
                }
            }
            FileCategory::Playlists => {
                if let Some(summary) = handlers::handle_playlists(&payload) {
                    playlist_rows.extend(summary.playlists);
                }
            }
            FileCategory::Follow => {
                if follow.is_none() {
                    follow = handlers::handle_follow(&payload);
                }
            }
            FileCategory::Commerce => {
                commerce.push(CommerceFile {
                    filename: file.filename.clone(),
                    record_count: handlers::record_count(&payload),
                });
            }
            FileCategory::Unrecognized => unreachable!("cataloged above"),
        }
        report.files_parsed += 1;
    }

    if streaming_files_parsed == 0 {
        return Err(IngestError::NoStreamingHistory);
    }

    // Canonical dataset invariant: no rows without a track name
    let before = events.len();
    events.retain(|event| !event.track.is_empty());
    report.records_skipped += before - events.len();
    report.records_kept = events.len();

    let misc = MiscSummary {
        follow,
        commerce,
        unrecognized: report.unrecognized_files.clone(),
    };

    let data = ProfileData {
        canonical: Dataset::new(events),
        account,
        library,
        searches,
        wrapped,
        playlists: if playlist_rows.is_empty() {
            None
        } else {
            Some(PlaylistSummary {
                playlists: playlist_rows,
            })
        },
        misc: if misc.is_empty() { None } else { Some(misc) },
    };

    info!(
        files = report.files_scanned,
        parsed = report.files_parsed,
        events = report.records_kept,
        "ingestion pass complete"
    );

    Ok(IngestOutcome { data, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn settings() -> IngestSettings {
        IngestSettings::default()
    }

    fn write(dir: &TempDir, name: &str, value: &Value) {
        fs::write(dir.path().join(name), serde_json::to_string(value).unwrap()).unwrap();
    }

    fn streaming_fixture() -> Value {
        json!([
            {"trackName": "A", "artistName": "X", "msPlayed": 40000},
            {"trackName": "A", "artistName": "X", "msPlayed": 10000},
            {"trackName": "B", "artistName": "Y", "msPlayed": 5000}
        ])
    }

    #[test]
    fn test_ingest_builds_canonical_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "StreamingHistory0.json", &streaming_fixture());

        let outcome = ingest_profile_dir(dir.path(), &settings()).unwrap();
        assert_eq!(outcome.data.canonical.len(), 3);
        assert_eq!(outcome.report.files_parsed, 1);
        assert_eq!(outcome.report.records_kept, 3);
        assert!(outcome.data.account.is_none());
    }

    #[test]
    fn test_ingest_routes_auxiliary_files() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "StreamingHistory0.json", &streaming_fixture());
        write(&dir, "Userdata.json", &json!({"username": "alice"}));
        write(
            &dir,
            "YourLibrary.json",
            &json!({"tracks": [{"track": "A"}]}),
        );
        write(
            &dir,
            "Playlist1.json",
            &json!({"playlists": [{"name": "Mix", "items": [{}, {}]}]}),
        );
        write(&dir, "Follow.json", &json!({"followerCount": 3}));
        write(&dir, "Payments.json", &json!({"payments": [1, 2]}));
        write(&dir, "Inferences.json", &json!([1, 2, 3]));

        let outcome = ingest_profile_dir(dir.path(), &settings()).unwrap();
        let data = &outcome.data;
        assert!(data.account.is_some());
        assert!(data.library.is_some());
        assert_eq!(data.playlists.as_ref().unwrap().playlists.len(), 1);
        let misc = data.misc.as_ref().unwrap();
        assert_eq!(misc.follow.as_ref().unwrap().follower_count, 3);
        assert_eq!(misc.commerce.len(), 1);
        assert_eq!(misc.unrecognized, vec!["Inferences.json"]);
        assert_eq!(outcome.report.unrecognized_files, vec!["Inferences.json"]);
    }

    #[test]
    fn test_malformed_file_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "StreamingHistory0.json", &streaming_fixture());
        fs::write(dir.path().join("StreamingHistory1.json"), "{ not json").unwrap();

        let outcome = ingest_profile_dir(dir.path(), &settings()).unwrap();
        assert_eq!(outcome.data.canonical.len(), 3);
        assert_eq!(outcome.report.skipped_files.len(), 1);
        assert!(outcome.report.skipped_files[0]
            .reason
            .contains("malformed JSON"));
    }

    #[test]
    fn test_empty_track_rows_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir,
            "StreamingHistory0.json",
            &json!([
                {"trackName": "", "msPlayed": 1000},
                {"trackName": "Kept", "msPlayed": 1000}
            ]),
        );

        let outcome = ingest_profile_dir(dir.path(), &settings()).unwrap();
        assert_eq!(outcome.data.canonical.len(), 1);
        assert_eq!(outcome.data.canonical.events[0].track, "Kept");
        assert_eq!(outcome.report.records_skipped, 1);
    }

    #[test]
    fn test_no_streaming_history_is_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "Userdata.json", &json!({"username": "alice"}));

        let err = ingest_profile_dir(dir.path(), &settings()).unwrap_err();
        assert!(matches!(err, IngestError::NoStreamingHistory));
    }

    #[test]
    fn test_empty_directory_is_no_streaming_history() {
        let dir = tempfile::tempdir().unwrap();
        let err = ingest_profile_dir(dir.path(), &settings()).unwrap_err();
        assert!(matches!(err, IngestError::NoStreamingHistory));
    }

    #[test]
    fn test_missing_directory() {
        let err =
            ingest_profile_dir(Path::new("/definitely/not/here"), &settings()).unwrap_err();
        assert!(matches!(err, IngestError::MissingProfileDir(_)));
    }

    #[test]
    fn test_reingest_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<Value> = (0..500)
            .map(|i| json!({"trackName": format!("T{}", i % 40), "msPlayed": 1000 * i}))
            .collect();
        write(&dir, "endsong_0.json", &Value::Array(records));

        let mut low_cap = settings();
        low_cap.max_streaming_records = 100;
        let first = ingest_profile_dir(dir.path(), &low_cap).unwrap();
        let second = ingest_profile_dir(dir.path(), &low_cap).unwrap();
        assert_eq!(first.data.canonical, second.data.canonical);
        assert_eq!(first.report, second.report);
        assert!(first.report.records_sampled_out > 0);
    }
}
