//! On-disk response cache
//!
//! One JSON file per GET URL, named by the hex SHA-256 of the URL. A warm
//! cache lets repeated audits of the same site skip page downloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// A cached GET response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Body text; empty for non-HTML responses
    pub body: String,
    pub fetched_at: DateTime<Utc>,
}

/// Directory-backed store of [`CachedResponse`] entries
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Opens the cache, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns true if a response with this status may be stored
    ///
    /// Redirects are not cached because replaying them needs the `Location`
    /// header, and server errors are usually transient.
    pub fn is_cacheable(status: u16) -> bool {
        !(300..=399).contains(&status) && status < 500
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Looks up a URL; unreadable or mismatched entries are misses
    pub fn load(&self, url: &Url) -> Option<CachedResponse> {
        let path = self.path_for(url.as_str());
        let bytes = fs::read(&path).ok()?;

        match serde_json::from_slice::<CachedResponse>(&bytes) {
            Ok(entry) if entry.url == url.as_str() => Some(entry),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Writes an entry, replacing any previous one for the same URL
    pub fn store(&self, entry: &CachedResponse) -> io::Result<()> {
        let json = serde_json::to_vec(entry)?;
        fs::write(self.path_for(&entry.url), json)
    }
}
