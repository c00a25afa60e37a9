// Profile fingerprinting for cache invalidation using BLAKE3
use std::path::Path;

use crate::ingest::scanner::{scan_profile_dir, RawExportFile};

/// Digest over the sorted (filename, mtime, size) tuples of a profile's
/// raw files. Stable under enumeration order; changes whenever a file is
/// added, removed, resized or re-saved.
pub fn fingerprint_files(files: &[RawExportFile]) -> String {
    let mut sorted: Vec<&RawExportFile> = files.iter().collect();
    sorted.sort_by(|a, b| a.filename.cmp(&b.filename));

    let mut hasher = blake3::Hasher::new();
    for file in sorted {
        hasher.update(file.filename.as_bytes());
        hasher.update(&[0]);
        hasher.update(&file.modified.to_le_bytes());
        hasher.update(&file.size.to_le_bytes());
    }

    hasher.finalize().to_hex().to_string()
}

/// Scan a profile directory and fingerprint whatever it currently holds.
pub fn fingerprint_dir<P: AsRef<Path>>(directory: P) -> String {
    fingerprint_files(&scan_profile_dir(directory))
}
