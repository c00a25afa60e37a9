// Per-session engine: wires scanning, ingestion, caching and aggregation
// behind the query surface the UI consumes. Replaces the global mutable
// session state of the original dashboard with an explicit context object.
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::{
    apply_selection, filter_options, listening_trend, loyalty_ranking, top_by_minutes, Dimension,
    FilterOptions, FilterSelection, LoyaltyEntry, RankedEntry, TrendSeries,
};
use crate::cache::{fingerprint_files, CacheStore, DatasetKind};
use crate::config::AppConfig;
use crate::ingest::{ingest_profile_dir, scan_profile_dir, IngestError, IngestReport};
use crate::models::{Dataset, PlayEvent, ProfileData, WrappedSummary};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("profile {0:?} not found under the profiles directory")]
    ProfileNotFound(String),
    #[error("profile {0:?} has no parseable streaming history; upload export files first")]
    NoStreamingHistory(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A profile's datasets as served to the caller, either fresh from the
/// pipeline (with its report) or straight from the cache.
#[derive(Debug, Clone)]
pub struct LoadedProfile {
    pub profile: String,
    pub data: ProfileData,
    pub report: Option<IngestReport>,
    pub fingerprint: String,
    pub from_cache: bool,
}

pub struct Engine {
    config: AppConfig,
    cache: CacheStore,
    filter_memo: HashMap<String, FilterOptions>,
}

impl Engine {
    pub fn new(config: AppConfig) -> Result<Self, EngineError> {
        let cache = CacheStore::open(&config.directories.cache_dir)?;
        Ok(Self {
            config,
            cache,
            filter_memo: HashMap::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn profile_dir(&self, profile: &str) -> PathBuf {
        self.config.directories.profiles_dir.join(profile)
    }

    /// Profiles currently present on disk, sorted by name.
    pub fn list_profiles(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.config.directories.profiles_dir) else {
            return Vec::new();
        };
        let mut profiles: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        profiles.sort();
        profiles
    }

    /// Serve a profile's datasets, rebuilding through the pipeline when
    /// the cache is missing or stale for the current fingerprint.
    pub fn load_profile(&mut self, profile: &str) -> Result<LoadedProfile, EngineError> {
        let dir = self.profile_dir(profile);
        if !dir.is_dir() {
            return Err(EngineError::ProfileNotFound(profile.to_string()));
        }

        let files = scan_profile_dir(&dir);
        let fingerprint = fingerprint_files(&files);

        if let Some(canonical) =
            self.cache
                .load::<Dataset>(profile, DatasetKind::Canonical, &fingerprint)
        {
            info!(profile, "serving profile from cache");
            let data = ProfileData {
                canonical,
                account: self.cache.load(profile, DatasetKind::Account, &fingerprint),
                library: self.cache.load(profile, DatasetKind::Library, &fingerprint),
                searches: self.cache.load(profile, DatasetKind::Searches, &fingerprint),
                wrapped: self
                    .cache
                    .load::<Vec<WrappedSummary>>(profile, DatasetKind::Wrapped, &fingerprint)
                    .unwrap_or_default(),
                playlists: self
                    .cache
                    .load(profile, DatasetKind::Playlists, &fingerprint),
                misc: self.cache.load(profile, DatasetKind::Misc, &fingerprint),
            };
            return Ok(LoadedProfile {
                profile: profile.to_string(),
                data,
                report: None,
                fingerprint,
                from_cache: true,
            });
        }

        info!(profile, "cache miss, rebuilding from raw files");
        let outcome = ingest_profile_dir(&dir, &self.config.ingest).map_err(|e| match e {
            IngestError::NoStreamingHistory => {
                EngineError::NoStreamingHistory(profile.to_string())
            }
            IngestError::MissingProfileDir(_) => EngineError::ProfileNotFound(profile.to_string()),
        })?;

        self.filter_memo.remove(profile);

        // Cache writes are best-effort: a failed store must never block
        // the caller from seeing freshly ingested data.
        if let Err(e) = self.persist(profile, &fingerprint, &outcome.data) {
            warn!(profile, error = %e, "failed to persist cache entries");
        }

        Ok(LoadedProfile {
            profile: profile.to_string(),
            data: outcome.data,
            report: Some(outcome.report),
            fingerprint,
            from_cache: false,
        })
    }

    fn persist(&self, profile: &str, fingerprint: &str, data: &ProfileData) -> anyhow::Result<()> {
        self.cache.clear_profile(profile)?;
        self.cache
            .store(profile, DatasetKind::Canonical, fingerprint, &data.canonical)?;
        if let Some(account) = &data.account {
            self.cache
                .store(profile, DatasetKind::Account, fingerprint, account)?;
        }
        if let Some(library) = &data.library {
            self.cache
                .store(profile, DatasetKind::Library, fingerprint, library)?;
        }
        if let Some(searches) = &data.searches {
            self.cache
                .store(profile, DatasetKind::Searches, fingerprint, searches)?;
        }
        if !data.wrapped.is_empty() {
            self.cache
                .store(profile, DatasetKind::Wrapped, fingerprint, &data.wrapped)?;
        }
        if let Some(playlists) = &data.playlists {
            self.cache
                .store(profile, DatasetKind::Playlists, fingerprint, playlists)?;
        }
        if let Some(misc) = &data.misc {
            self.cache
                .store(profile, DatasetKind::Misc, fingerprint, misc)?;
        }
        Ok(())
    }

    /// Filter-option domains for a dataset, memoized per profile for the
    /// lifetime of the session (dropped when the profile rebuilds).
    pub fn filter_options(&mut self, profile: &str, dataset: &Dataset) -> FilterOptions {
        self.filter_memo
            .entry(profile.to_string())
            .or_insert_with(|| filter_options(dataset))
            .clone()
    }

    fn selected_rows<'a>(
        &mut self,
        profile: &str,
        dataset: &'a Dataset,
        selection: &FilterSelection,
    ) -> Cow<'a, [PlayEvent]> {
        let options = self.filter_options(profile, dataset);
        match apply_selection(dataset, selection, &options) {
            Some(rows) => Cow::Owned(rows),
            None => Cow::Borrowed(&dataset.events),
        }
    }

    /// Top-N entities of a dimension by minutes played, under a filter.
    pub fn top(
        &mut self,
        profile: &str,
        dataset: &Dataset,
        dimension: Dimension,
        n: usize,
        selection: &FilterSelection,
    ) -> Option<Vec<RankedEntry>> {
        let rows = self.selected_rows(profile, dataset, selection);
        top_by_minutes(&rows, dimension, n)
    }

    /// Listening-over-time series, under a filter.
    pub fn trend(
        &mut self,
        profile: &str,
        dataset: &Dataset,
        selection: &FilterSelection,
    ) -> Option<TrendSeries> {
        let min_months = self.config.aggregate.trend_month_minimum;
        let rows = self.selected_rows(profile, dataset, selection);
        listening_trend(&rows, min_months)
    }

    /// Per-artist loyalty ranking, under a filter.
    pub fn loyalty(
        &mut self,
        profile: &str,
        dataset: &Dataset,
        n: usize,
        selection: &FilterSelection,
    ) -> Option<Vec<LoyaltyEntry>> {
        let min_minutes = self.config.aggregate.loyalty_minimum_minutes;
        let rows = self.selected_rows(profile, dataset, selection);
        loyalty_ranking(&rows, min_minutes, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn engine(root: &TempDir) -> Engine {
        let mut config = AppConfig::default();
        config.directories.profiles_dir = root.path().join("Profiles");
        config.directories.cache_dir = root.path().join("Cache");
        fs::create_dir_all(&config.directories.profiles_dir).unwrap();
        Engine::new(config).unwrap()
    }

    fn write_profile(root: &TempDir, profile: &str, name: &str, content: &serde_json::Value) {
        let dir = root.path().join("Profiles").join(profile);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), serde_json::to_string(content).unwrap()).unwrap();
    }

    fn streaming_fixture() -> serde_json::Value {
        json!([
            {"endTime": "2021-01-10 10:00", "trackName": "A", "artistName": "X", "msPlayed": 40000},
            {"endTime": "2021-01-11 10:00", "trackName": "A", "artistName": "X", "msPlayed": 10000},
            {"endTime": "2021-02-01 10:00", "trackName": "B", "artistName": "Y", "msPlayed": 5000}
        ])
    }

    #[test]
    fn test_first_load_rebuilds_second_load_hits_cache() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(&root);
        write_profile(&root, "alice", "StreamingHistory0.json", &streaming_fixture());

        let first = engine.load_profile("alice").unwrap();
        assert!(!first.from_cache);
        assert!(first.report.is_some());
        assert_eq!(first.data.canonical.len(), 3);

        let second = engine.load_profile("alice").unwrap();
        assert!(second.from_cache);
        assert!(second.report.is_none());
        assert_eq!(second.data.canonical, first.data.canonical);
        assert_eq!(second.fingerprint, first.fingerprint);
    }

    #[test]
    fn test_changed_raw_files_force_rebuild() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(&root);
        write_profile(&root, "alice", "StreamingHistory0.json", &streaming_fixture());
        let first = engine.load_profile("alice").unwrap();

        // adding a record changes the file size, so the fingerprint moves
        let mut records = streaming_fixture();
        records.as_array_mut().unwrap().push(json!(
            {"endTime": "2021-03-01 10:00", "trackName": "C", "artistName": "Z", "msPlayed": 90000}
        ));
        write_profile(&root, "alice", "StreamingHistory0.json", &records);

        let rebuilt = engine.load_profile("alice").unwrap();
        assert!(!rebuilt.from_cache);
        assert_ne!(rebuilt.fingerprint, first.fingerprint);
        assert_eq!(rebuilt.data.canonical.len(), 4);

        // and the rebuild stored the fresh fingerprint
        let third = engine.load_profile("alice").unwrap();
        assert!(third.from_cache);
        assert_eq!(third.fingerprint, rebuilt.fingerprint);
    }

    #[test]
    fn test_missing_profile() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(&root);
        let err = engine.load_profile("nobody").unwrap_err();
        assert!(matches!(err, EngineError::ProfileNotFound(_)));
    }

    #[test]
    fn test_profile_without_streaming_history() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(&root);
        write_profile(&root, "alice", "Userdata.json", &json!({"username": "alice"}));

        let err = engine.load_profile("alice").unwrap_err();
        assert!(matches!(err, EngineError::NoStreamingHistory(_)));
    }

    #[test]
    fn test_top_query_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(&root);
        write_profile(&root, "alice", "StreamingHistory0.json", &streaming_fixture());

        let loaded = engine.load_profile("alice").unwrap();
        let top = engine
            .top(
                "alice",
                &loaded.data.canonical,
                Dimension::Track,
                2,
                &FilterSelection::default(),
            )
            .unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "A");
        assert!((top[0].minutes - 0.833).abs() < 0.001);
        assert_eq!(top[1].name, "B");
    }

    #[test]
    fn test_filtered_queries_and_options() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(&root);
        write_profile(&root, "alice", "StreamingHistory0.json", &streaming_fixture());
        let loaded = engine.load_profile("alice").unwrap();

        let options = engine.filter_options("alice", &loaded.data.canonical);
        assert_eq!(options.years, vec![2021]);
        assert_eq!(options.songs.len(), 2);

        let selection = FilterSelection {
            artists: vec!["Y".to_string()],
            ..Default::default()
        };
        let top = engine
            .top(
                "alice",
                &loaded.data.canonical,
                Dimension::Track,
                10,
                &selection,
            )
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "B");
    }

    #[test]
    fn test_trend_and_loyalty_queries() {
        let root = tempfile::tempdir().unwrap();
        let mut engine = engine(&root);
        write_profile(&root, "alice", "StreamingHistory0.json", &streaming_fixture());
        let loaded = engine.load_profile("alice").unwrap();

        // only 2 distinct months in the fixture: yearly fallback
        let trend = engine
            .trend("alice", &loaded.data.canonical, &FilterSelection::default())
            .unwrap();
        assert_eq!(trend.granularity, crate::aggregate::TrendGranularity::Yearly);

        // nobody reaches the default 60-minute loyalty floor
        let loyalty = engine
            .loyalty(
                "alice",
                &loaded.data.canonical,
                10,
                &FilterSelection::default(),
            )
            .unwrap();
        assert!(loyalty.is_empty());
    }

    #[test]
    fn test_list_profiles() {
        let root = tempfile::tempdir().unwrap();
        let engine = engine(&root);
        fs::create_dir_all(root.path().join("Profiles").join("bob")).unwrap();
        fs::create_dir_all(root.path().join("Profiles").join("alice")).unwrap();
        assert_eq!(engine.list_profiles(), vec!["alice", "bob"]);
    }
}
