// Cache store for reading and writing cached data.
// Handles JSON serialization and filesystem operations; entries never expire.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::Result;

use super::paths::CacheKey;

/// Wrapper for cached data with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    /// The cached data.
    pub data: T,
    /// When the data was cached.
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }
}

/// Flat-file cache rooted at a single directory.
/// No locking: concurrent writers race and the last write wins.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read a cached JSON entry. Returns `Ok(None)` when nothing is cached.
    pub fn read_json<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<CachedData<T>>> {
        let path = key.path_in(&self.root);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let cached: CachedData<T> = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "cache hit");
        Ok(Some(cached))
    }

    /// Write data to cache as pretty-printed JSON, replacing any previous entry.
    pub fn write_json<T: Serialize>(&self, key: &CacheKey, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let mut json = serde_json::to_string_pretty(&cached)?;
        json.push('\n');
        write_atomic(&key.path_in(&self.root), json.as_bytes())
    }

    /// Read a raw text entry (the webpage cache).
    pub fn read_text(&self, key: &CacheKey) -> Result<Option<String>> {
        let path = key.path_in(&self.root);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        debug!(path = %path.display(), "cache hit");
        Ok(Some(contents))
    }

    /// Write a raw text entry.
    pub fn write_text(&self, key: &CacheKey, text: &str) -> Result<()> {
        write_atomic(&key.path_in(&self.root), text.as_bytes())
    }
}

/// Write via temp file and rename, creating the parent directory if needed.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}
