// Profile directory scanner and filename classifier
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Category a raw export file is routed to, inferred from its filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FileCategory {
    StreamingHistory,
    Account,
    Library,
    Searches,
    Wrapped,
    Playlists,
    Follow,
    Commerce,
    Unrecognized,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::StreamingHistory => "streaming_history",
            FileCategory::Account => "account",
            FileCategory::Library => "library",
            FileCategory::Searches => "searches",
            FileCategory::Wrapped => "wrapped",
            FileCategory::Playlists => "playlists",
            FileCategory::Follow => "follow",
            FileCategory::Commerce => "commerce",
            FileCategory::Unrecognized => "unrecognized",
        }
    }
}

/// Ordered classification table: first matching pattern wins
fn classification_table() -> &'static Vec<(FileCategory, Regex)> {
    static TABLE: OnceLock<Vec<(FileCategory, Regex)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let patterns: &[(FileCategory, &str)] = &[
            (
                FileCategory::StreamingHistory,
                r"(?i)streaming[_ ]?history|endsong",
            ),
            (FileCategory::Account, r"(?i)userdata"),
            (FileCategory::Library, r"(?i)yourlibrary"),
            (FileCategory::Searches, r"(?i)searchqueries"),
            (FileCategory::Wrapped, r"(?i)wrapped"),
            (FileCategory::Playlists, r"(?i)playlist"),
            (FileCategory::Follow, r"(?i)follow"),
            (FileCategory::Commerce, r"(?i)payments|purchases"),
        ];
        patterns
            .iter()
            .map(|(category, pattern)| {
                (
                    *category,
                    Regex::new(pattern).expect("valid classification pattern"),
                )
            })
            .collect()
    })
}

/// Classify one filename against the ordered pattern table.
pub fn classify(filename: &str) -> FileCategory {
    classification_table()
        .iter()
        .find(|(_, pattern)| pattern.is_match(filename))
        .map(|(category, _)| *category)
        .unwrap_or(FileCategory::Unrecognized)
}

/// One raw export file found in a profile directory
#[derive(Debug, Clone)]
pub struct RawExportFile {
    pub path: PathBuf,
    pub filename: String,
    pub category: FileCategory,
    pub size: u64,
    pub modified: i64,
}

/// Scan a profile directory for JSON export files and classify them.
///
/// The result is sorted by filename so that ingestion order and the
/// derived fingerprint are independent of filesystem enumeration order.
pub fn scan_profile_dir<P: AsRef<Path>>(directory: P) -> Vec<RawExportFile> {
    let mut export_files = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let is_json = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase() == "json")
            .unwrap_or(false);
        if !is_json {
            continue;
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let (size, modified) = match std::fs::metadata(path) {
            Ok(meta) => {
                let modified = meta
                    .modified()
                    .ok()
                    .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                (meta.len(), modified)
            }
            Err(_) => (0, 0),
        };

        export_files.push(RawExportFile {
            path: path.to_path_buf(),
            category: classify(&filename),
            filename,
            size,
            modified,
        });
    }

    export_files.sort_by(|a, b| a.filename.cmp(&b.filename));
    export_files
}
