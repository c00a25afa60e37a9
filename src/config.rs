// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where profiles live and where cache artifacts go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    pub profiles_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            profiles_dir: PathBuf::from("Profiles"),
            cache_dir: PathBuf::from("Cache"),
        }
    }
}

/// Sampling caps applied during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Per-file record cap for streaming history; larger files are
    /// stride-sampled down to this many records
    pub max_streaming_records: usize,
    /// Cap on retained search queries
    pub max_search_queries: usize,
    /// Cap on library sample name lists
    pub library_sample_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            max_streaming_records: 50_000,
            max_search_queries: 500,
            library_sample_size: 50,
        }
    }
}

/// Thresholds used by the aggregation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSettings {
    /// Below this many distinct year-months, trends group by year instead
    pub trend_month_minimum: usize,
    /// Artists under this many total minutes are excluded from loyalty
    /// ranking (insufficient signal)
    pub loyalty_minimum_minutes: f64,
    pub default_top_n: usize,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            trend_month_minimum: 3,
            loyalty_minimum_minutes: 60.0,
            default_top_n: 10,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config schema version for future migrations
    pub version: i32,
    pub directories: DirectorySettings,
    pub ingest: IngestSettings,
    pub aggregate: AggregateSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            directories: DirectorySettings::default(),
            ingest: IngestSettings::default(),
            aggregate: AggregateSettings::default(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    pub fn config_path(app_dir: &Path) -> PathBuf {
        app_dir.join("playhist.json")
    }

    /// Load config from file, or return defaults if the file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::config_path(app_dir);

        if !path.exists() {
            debug!(?path, "no config file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {path:?}"))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {path:?}"))?;

        debug!(?path, "loaded config");
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        fs::create_dir_all(app_dir)
            .with_context(|| format!("failed to create config directory {app_dir:?}"))?;

        let path = Self::config_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write config file {path:?}"))?;

        debug!(?path, "saved config");
        Ok(())
    }
}
