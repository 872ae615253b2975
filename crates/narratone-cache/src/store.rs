//! Filesystem-backed content-addressed audio cache.
//!
//! Each entry is a payload file `<key>.wav` plus a sidecar `<key>.meta.json`
//! carrying timestamps and provenance. The store is append-mostly shared
//! state: keys are derived deterministically from content, so concurrent
//! writers for the same key produce the same expected bytes and last-writer-
//! wins is safe without locking.
//!
//! Reads bump the entry's `last_accessed_at` timestamp as an observable
//! side effect; the returned payload is unaffected.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use narratone_core::domain::VoiceParams;

use crate::key::CacheKey;

const PAYLOAD_EXT: &str = "wav";
const META_SUFFIX: &str = ".meta.json";

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from cache store operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem failure.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A metadata sidecar could not be serialized or parsed.
    #[error("Cache metadata error at {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },
}

// ── Metadata ───────────────────────────────────────────────────────

/// Sidecar metadata for a cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryMeta {
    /// Voice parameters the audio was synthesized with, when known.
    #[serde(default)]
    pub voice: Option<VoiceParams>,

    /// When the entry was first written.
    pub created_at: DateTime<Utc>,

    /// When the entry was last read. Bumped on every hit.
    pub last_accessed_at: DateTime<Utc>,

    /// When the entry becomes eligible for the expiry sweep. `None` means
    /// it never expires; the sweep policy itself is the caller's business.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// The canonical pre-hash key string, kept because the hashed token is
    /// not reversible. Diagnostics only.
    #[serde(default)]
    pub original_key: Option<String>,
}

impl CacheEntryMeta {
    /// Fresh metadata for a new entry: created and accessed now, no expiry.
    #[must_use]
    pub fn new(voice: Option<VoiceParams>, original_key: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            voice,
            created_at: now,
            last_accessed_at: now,
            expires_at: None,
            original_key,
        }
    }

    /// Set an expiry timestamp.
    #[must_use]
    pub fn expiring_at(mut self, when: DateTime<Utc>) -> Self {
        self.expires_at = Some(when);
        self
    }

    /// Whether the entry is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| e <= now)
    }
}

/// One row of [`AudioCache::list`] output.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntrySummary {
    pub key: CacheKey,
    pub size_bytes: u64,
    pub meta: CacheEntryMeta,
}

// ── Store ──────────────────────────────────────────────────────────

/// A content-addressed audio cache rooted at one directory.
///
/// The directory location (project-relative or global) is a deployment
/// detail chosen by the caller, not a pipeline invariant.
#[derive(Debug, Clone)]
pub struct AudioCache {
    dir: PathBuf,
}

impl AudioCache {
    /// Create a cache handle rooted at `dir`. The directory is created
    /// lazily on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The cache root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn payload_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.{PAYLOAD_EXT}"))
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}{META_SUFFIX}"))
    }

    /// Whether an entry exists for `key`.
    pub async fn has(&self, key: &CacheKey) -> bool {
        tokio::fs::try_exists(self.payload_path(key))
            .await
            .unwrap_or(false)
    }

    /// Location of the payload file for `key`, if the entry exists.
    ///
    /// Used to hand the effects tool a real input path without copying.
    pub async fn path(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.payload_path(key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            Some(path)
        } else {
            None
        }
    }

    /// Read an entry. Returns `None` on miss.
    ///
    /// Bumps `last_accessed_at` in the sidecar; the rewrite is best-effort
    /// (a failed bump never fails the read — the payload already loaded).
    pub async fn read(&self, key: &CacheKey) -> Result<Option<(Vec<u8>, CacheEntryMeta)>, CacheError> {
        let payload_path = self.payload_path(key);
        let bytes = match tokio::fs::read(&payload_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut meta = self.read_meta(key).await;
        meta.last_accessed_at = Utc::now();
        if let Err(e) = self.write_meta(key, &meta).await {
            tracing::warn!(%key, error = %e, "Failed to bump cache access timestamp");
        }

        Ok(Some((bytes, meta)))
    }

    /// Write an entry, creating the cache directory if needed.
    ///
    /// Last-writer-wins; duplicate writes for the same key are idempotent
    /// in effect because keys are content-derived.
    pub async fn write(
        &self,
        key: &CacheKey,
        bytes: &[u8],
        meta: CacheEntryMeta,
    ) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.payload_path(key), bytes).await?;
        self.write_meta(key, &meta).await?;
        tracing::debug!(%key, size = bytes.len(), dir = %self.dir.display(), "Cache entry written");
        Ok(())
    }

    /// Enumerate all entries with their metadata.
    pub async fn list(&self) -> Result<Vec<CacheEntrySummary>, CacheError> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let Some(key) = key_from_payload_path(&path) else {
                continue;
            };
            let size_bytes = entry.metadata().await?.len();
            let meta = self.read_meta(&key).await;
            entries.push(CacheEntrySummary {
                key,
                size_bytes,
                meta,
            });
        }

        entries.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        Ok(entries)
    }

    /// Delete one entry (payload + sidecar). Deleting a missing key is a no-op.
    pub async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        remove_if_exists(&self.payload_path(key)).await?;
        remove_if_exists(&self.meta_path(key)).await?;
        Ok(())
    }

    /// Delete every entry in the cache.
    pub async fn clear(&self) -> Result<(), CacheError> {
        for entry in self.list().await? {
            self.delete(&entry.key).await?;
        }
        tracing::info!(dir = %self.dir.display(), "Cache cleared");
        Ok(())
    }

    /// Evict entries whose `expires_at` has passed. Returns the number
    /// evicted. Entries without an expiry are never swept.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut evicted = 0;
        for entry in self.list().await? {
            if entry.meta.is_expired(now) {
                self.delete(&entry.key).await?;
                evicted += 1;
            }
        }
        if evicted > 0 {
            tracing::info!(evicted, dir = %self.dir.display(), "Expired cache entries swept");
        }
        Ok(evicted)
    }

    // ── Sidecar helpers ────────────────────────────────────────────

    /// Read the sidecar, tolerating a missing or corrupt file.
    ///
    /// A payload without usable metadata is still a valid hit; we
    /// reconstruct minimal metadata rather than failing the read.
    async fn read_meta(&self, key: &CacheKey) -> CacheEntryMeta {
        let path = self.meta_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(%key, error = %e, "Corrupt cache metadata sidecar — rebuilding");
                CacheEntryMeta::new(None, None)
            }),
            Err(_) => CacheEntryMeta::new(None, None),
        }
    }

    async fn write_meta(&self, key: &CacheKey, meta: &CacheEntryMeta) -> Result<(), CacheError> {
        let path = self.meta_path(key);
        let json = serde_json::to_vec_pretty(meta).map_err(|source| CacheError::Metadata {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, json).await?;
        Ok(())
    }
}

fn key_from_payload_path(path: &Path) -> Option<CacheKey> {
    if path.extension().and_then(|e| e.to_str()) != Some(PAYLOAD_EXT) {
        return None;
    }
    CacheKey::parse(path.file_stem()?.to_str()?)
}

async fn remove_if_exists(path: &Path) -> Result<(), CacheError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::derive_synthesis_key;

    fn test_key(text: &str) -> CacheKey {
        derive_synthesis_key(&VoiceParams::new("test-voice"), text, None).key
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());
        assert!(!cache.has(&test_key("missing")).await);
        assert!(cache.read(&test_key("missing")).await.unwrap().is_none());
        assert!(cache.path(&test_key("missing")).await.is_none());
    }

    #[tokio::test]
    async fn write_then_read_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());
        let key = test_key("round trip");
        let payload = b"RIFFfake-wav-payload".to_vec();

        let meta = CacheEntryMeta::new(Some(VoiceParams::new("test-voice")), Some("canon".into()));
        let written_at = meta.created_at;
        cache.write(&key, &payload, meta).await.unwrap();

        assert!(cache.has(&key).await);
        let (bytes, meta) = cache.read(&key).await.unwrap().unwrap();
        assert_eq!(bytes, payload);
        assert_eq!(meta.original_key.as_deref(), Some("canon"));
        // Access timestamp is bumped on read, never behind the write.
        assert!(meta.last_accessed_at >= written_at);
    }

    #[tokio::test]
    async fn read_bumps_access_timestamp_persistently() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());
        let key = test_key("timestamps");
        cache
            .write(&key, b"bytes", CacheEntryMeta::new(None, None))
            .await
            .unwrap();

        let (_, first) = cache.read(&key).await.unwrap().unwrap();
        let (_, second) = cache.read(&key).await.unwrap().unwrap();
        assert!(second.last_accessed_at >= first.last_accessed_at);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn path_points_at_payload_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());
        let key = test_key("path");
        cache
            .write(&key, b"bytes", CacheEntryMeta::new(None, None))
            .await
            .unwrap();

        let path = cache.path(&key).await.unwrap();
        assert!(path.ends_with(format!("{key}.wav")));
        assert_eq!(std::fs::read(path).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn list_delete_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());
        let k1 = test_key("one");
        let k2 = test_key("two");
        cache.write(&k1, b"a", CacheEntryMeta::new(None, None)).await.unwrap();
        cache.write(&k2, b"bb", CacheEntryMeta::new(None, None)).await.unwrap();

        let entries = cache.list().await.unwrap();
        assert_eq!(entries.len(), 2);

        cache.delete(&k1).await.unwrap();
        assert!(!cache.has(&k1).await);
        assert!(cache.has(&k2).await);

        cache.clear().await.unwrap();
        assert!(cache.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());
        cache.delete(&test_key("never written")).await.unwrap();
    }

    #[tokio::test]
    async fn sweep_evicts_only_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());
        let now = Utc::now();

        let expired = test_key("expired");
        let fresh = test_key("fresh");
        let eternal = test_key("eternal");

        let past = now - chrono::Duration::hours(1);
        let future = now + chrono::Duration::hours(1);
        cache
            .write(&expired, b"x", CacheEntryMeta::new(None, None).expiring_at(past))
            .await
            .unwrap();
        cache
            .write(&fresh, b"y", CacheEntryMeta::new(None, None).expiring_at(future))
            .await
            .unwrap();
        cache
            .write(&eternal, b"z", CacheEntryMeta::new(None, None))
            .await
            .unwrap();

        let evicted = cache.sweep_expired(now).await.unwrap();
        assert_eq!(evicted, 1);
        assert!(!cache.has(&expired).await);
        assert!(cache.has(&fresh).await);
        assert!(cache.has(&eternal).await);
    }

    #[tokio::test]
    async fn same_key_rewrite_is_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::new(dir.path());
        let key = test_key("rewrite");
        cache.write(&key, b"first", CacheEntryMeta::new(None, None)).await.unwrap();
        cache.write(&key, b"second", CacheEntryMeta::new(None, None)).await.unwrap();

        let (bytes, _) = cache.read(&key).await.unwrap().unwrap();
        assert_eq!(bytes, b"second");
    }
}
