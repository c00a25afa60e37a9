// SQLite-backed cache store, keyed by profile name and dataset kind
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

/// Which persisted dataset a cache entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Canonical,
    Account,
    Library,
    Searches,
    Wrapped,
    Playlists,
    Misc,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Canonical => "canonical",
            DatasetKind::Account => "account",
            DatasetKind::Library => "library",
            DatasetKind::Searches => "searches",
            DatasetKind::Wrapped => "wrapped",
            DatasetKind::Playlists => "playlists",
            DatasetKind::Misc => "misc",
        }
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cache_entries (
            profile TEXT NOT NULL,
            kind TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            payload TEXT NOT NULL,
            PRIMARY KEY (profile, kind)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cache_entries_profile ON cache_entries(profile)",
        [],
    )?;

    Ok(())
}

/// Persistence for normalized datasets. Reads are best-effort: a missing,
/// stale or corrupt entry is a miss, never an error the caller sees.
pub struct CacheStore {
    conn: Arc<Mutex<Connection>>,
}

impl CacheStore {
    pub fn open(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)?;

        let conn = Connection::open(cache_dir.join("playhist-cache.db"))?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn try_load(&self, profile: &str, kind: DatasetKind) -> Result<Option<(String, String)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT fingerprint, payload FROM cache_entries WHERE profile = ?1 AND kind = ?2",
        )?;
        let row = stmt
            .query_row(params![profile, kind.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .optional()?;
        Ok(row)
    }

    /// Load a cached dataset iff its stored fingerprint matches the
    /// profile's current fingerprint. Everything else is a miss.
    pub fn load<T: DeserializeOwned>(
        &self,
        profile: &str,
        kind: DatasetKind,
        current_fingerprint: &str,
    ) -> Option<T> {
        let (fingerprint, payload) = match self.try_load(profile, kind) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(profile, kind = kind.as_str(), "cache miss");
                return None;
            }
            Err(e) => {
                warn!(profile, kind = kind.as_str(), error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        if fingerprint != current_fingerprint {
            debug!(profile, kind = kind.as_str(), "cache stale");
            return None;
        }

        match serde_json::from_str(&payload) {
            Ok(value) => {
                debug!(profile, kind = kind.as_str(), "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(profile, kind = kind.as_str(), error = %e, "corrupt cache payload, treating as miss");
                None
            }
        }
    }

    /// Persist a dataset under (profile, kind), replacing any prior entry.
    pub fn store<T: Serialize>(
        &self,
        profile: &str,
        kind: DatasetKind,
        fingerprint: &str,
        value: &T,
    ) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        let created_at = std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)?
            .as_secs() as i64;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (profile, kind, fingerprint, created_at, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![profile, kind.as_str(), fingerprint, created_at, payload],
        )?;
        Ok(())
    }

    /// Drop every entry for a profile. Used before a rebuild stores fresh
    /// datasets so kinds absent from the new export don't linger.
    pub fn clear_profile(&self, profile: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM cache_entries WHERE profile = ?1",
            params![profile],
        )?;
        Ok(())
    }
}
