//! Content-addressable audio cache.
//!
//! Remote synthesis is billed per character, so the same (text, voice,
//! speed) triple must never be synthesized twice. Each result is stored
//! as an individually addressable blob named by a deterministic digest
//! of its inputs; an existence check on the key doubles as the index.
//!
//! Entries are write-once. Concurrent writers of the same key are a
//! benign race: content determines the key, so both write identical
//! bytes and the atomic rename makes either outcome valid.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::types::{AudioFormat, Voice};

/// Errors that can occur during cache operations.
///
/// Callers treat these as degradation, never as request failures:
/// a read error is a miss, a write error skips persisting.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to read from or write to the cache directory.
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Cache Key
// ============================================================================

/// A deterministic digest of one synthesis request.
///
/// Equal `(text, voice, speed)` inputs always yield equal keys; any
/// differing input changes the key. Speed is always part of the key
/// because the remote backend bakes it into the audio.
#[derive(Debug, Clone)]
pub struct CacheKey {
    text: String,
    voice: Voice,
    speed: f32,
}

impl CacheKey {
    /// Create a cache key for a synthesis request.
    pub fn new(text: impl Into<String>, voice: Voice, speed: f32) -> Self {
        Self {
            text: text.into(),
            voice,
            speed,
        }
    }

    /// The SHA-256 digest of this key, as lowercase hex.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.voice.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(format!("{:.3}", self.speed).as_bytes());
        hasher.update(b":");
        hasher.update(self.text.as_bytes());
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            hex.push_str(&format!("{byte:02x}"));
        }
        hex
    }

    /// The blob file name for this key.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.digest(), AudioFormat::Mp3.extension())
    }
}

// ============================================================================
// Cache Store
// ============================================================================

/// Durable blob store for synthesized audio, keyed by [`CacheKey`].
///
/// The store is size-capped: after each write, entries are pruned
/// oldest-modification-time first until the directory fits under the
/// cap again. The entry just written is never pruned.
#[derive(Debug, Clone)]
pub struct AudioCacheStore {
    root: PathBuf,
    max_bytes: u64,
}

impl AudioCacheStore {
    /// Open (and create if needed) a cache store at `root`.
    ///
    /// Directory creation is idempotent and safe under concurrent
    /// first use.
    pub fn open(root: impl Into<PathBuf>, max_bytes: u64) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root, max_bytes })
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The path a blob for `key` would live at, whether or not it exists.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Look up a cached blob. Absence is not an error.
    pub fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.entry_path(key);
        if path.is_file() { Some(path) } else { None }
    }

    /// Persist audio bytes under `key`, returning the blob path.
    ///
    /// The write is atomic (temp-then-rename), so readers never observe
    /// a partial entry and same-key writers cannot corrupt each other.
    pub fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let path = self.entry_path(key);
        write_atomic(&path, bytes)?;

        if let Err(error) = self.prune(&path) {
            // Pruning is best-effort; the entry itself is already durable.
            tracing::warn!(error = %error, "audio cache prune failed");
        }

        Ok(path)
    }

    /// Total size in bytes of all blobs in the store.
    pub fn total_bytes(&self) -> Result<u64, CacheError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_file() {
                total += meta.len();
            }
        }
        Ok(total)
    }

    /// Delete oldest entries until the store fits under its cap.
    ///
    /// `keep` is exempt so a freshly written entry survives its own
    /// prune pass even when it alone exceeds the cap.
    fn prune(&self, keep: &Path) -> Result<(), CacheError> {
        let mut entries: Vec<(PathBuf, u64, std::time::SystemTime)> = Vec::new();
        let mut total = 0u64;

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            total += meta.len();
            let modified = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            entries.push((entry.path(), meta.len(), modified));
        }

        if total <= self.max_bytes {
            return Ok(());
        }

        entries.sort_by_key(|(_, _, modified)| *modified);

        for (path, len, _) in entries {
            if total <= self.max_bytes {
                break;
            }
            if path == keep {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "pruned cache entry");
                    total = total.saturating_sub(len);
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), error = %error, "failed to prune cache entry");
                }
            }
        }

        Ok(())
    }
}

/// Atomically write data to a file.
///
/// Uses a write-to-temp-then-rename pattern so a crash or a concurrent
/// writer never leaves a partial blob at the final path.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CacheError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = parent.join(format!(
        ".step-speaks-tmp-{}-{}.tmp",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));

    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store(max_bytes: u64) -> (tempfile::TempDir, AudioCacheStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AudioCacheStore::open(dir.path(), max_bytes).expect("open store");
        (dir, store)
    }

    #[test]
    fn test_digest_determinism() {
        let key = CacheKey::new("Hello world", Voice::Alloy, 1.0);
        let first = key.digest();

        for _ in 0..10 {
            let again = CacheKey::new("Hello world", Voice::Alloy, 1.0);
            assert_eq!(again.digest(), first);
        }
    }

    #[test]
    fn test_digest_changes_with_text() {
        let a = CacheKey::new("Hello", Voice::Alloy, 1.0);
        let b = CacheKey::new("World", Voice::Alloy, 1.0);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_changes_with_voice() {
        let a = CacheKey::new("Hello", Voice::Alloy, 1.0);
        let b = CacheKey::new("Hello", Voice::Nova, 1.0);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_changes_with_speed() {
        let a = CacheKey::new("Hello", Voice::Alloy, 1.0);
        let b = CacheKey::new("Hello", Voice::Alloy, 1.25);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_is_hex() {
        let key = CacheKey::new("Hello", Voice::Alloy, 1.0);
        let digest = key.digest();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_file_name_has_mp3_extension() {
        let key = CacheKey::new("Hello", Voice::Alloy, 1.0);
        assert!(key.file_name().ends_with(".mp3"));
    }

    #[test]
    fn test_store_then_lookup_round_trip() {
        let (_dir, store) = test_store(u64::MAX);
        let key = CacheKey::new("step one", Voice::Alloy, 1.0);
        let bytes = b"fake mp3 bytes";

        let path = store.store(&key, bytes).expect("store");
        let found = store.lookup(&key).expect("lookup hit");
        assert_eq!(found, path);
        assert_eq!(fs::read(&found).expect("read"), bytes);
    }

    #[test]
    fn test_lookup_missing_is_none_not_error() {
        let (_dir, store) = test_store(u64::MAX);
        let key = CacheKey::new("never stored", Voice::Onyx, 1.0);
        assert!(store.lookup(&key).is_none());
    }

    #[test]
    fn test_same_key_overwrite_is_idempotent() {
        let (_dir, store) = test_store(u64::MAX);
        let key = CacheKey::new("step one", Voice::Alloy, 1.0);

        store.store(&key, b"audio").expect("first store");
        store.store(&key, b"audio").expect("second store");

        let found = store.lookup(&key).expect("lookup");
        assert_eq!(fs::read(found).expect("read"), b"audio");
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        AudioCacheStore::open(dir.path(), 1024).expect("first open");
        AudioCacheStore::open(dir.path(), 1024).expect("second open");
    }

    #[test]
    fn test_prune_respects_cap() {
        let (_dir, store) = test_store(40);
        let payload = [0u8; 20];

        for (i, text) in ["one", "two", "three", "four"].iter().enumerate() {
            let key = CacheKey::new(*text, Voice::Alloy, 1.0);
            store.store(&key, &payload).expect("store");
            // Distinct mtimes so prune ordering is deterministic.
            std::thread::sleep(std::time::Duration::from_millis(20 + i as u64));
        }

        let total = store.total_bytes().expect("total");
        assert!(total <= 40, "cache grew past its cap: {total}");
    }

    #[test]
    fn test_prune_never_removes_just_written_entry() {
        let (_dir, store) = test_store(10);
        let key = CacheKey::new("oversized", Voice::Alloy, 1.0);

        // Single entry larger than the whole cap must survive.
        store.store(&key, &[0u8; 64]).expect("store");
        assert!(store.lookup(&key).is_some());
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blob.mp3");

        write_atomic(&path, b"initial").expect("first write");
        write_atomic(&path, b"updated").expect("second write");

        assert_eq!(fs::read(&path).expect("read"), b"updated");
    }
}
