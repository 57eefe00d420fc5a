//! Configuration for synthesis, caching, and playback timeouts.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::QualityPreference;

/// Maximum request text length in characters (the remote API's bound).
pub const DEFAULT_MAX_TEXT_CHARS: usize = 4096;

/// Default billing rate per 1000 characters for the standard model.
pub const DEFAULT_RATE_STANDARD_PER_1K: f64 = 0.015;

/// Default billing rate per 1000 characters for the HD model.
pub const DEFAULT_RATE_HIGH_PER_1K: f64 = 0.030;

/// Default audio-cache size cap (256 MiB).
pub const DEFAULT_CACHE_MAX_BYTES: u64 = 256 * 1024 * 1024;

/// Settings for the synthesis orchestrator and playback layer.
///
/// Use the builder pattern to construct:
///
/// ```
/// use std::time::Duration;
/// use step_speaks::TtsSettings;
///
/// let settings = TtsSettings::new()
///     .with_cache_enabled(true)
///     .with_remote_timeout(Duration::from_secs(20));
/// ```
#[derive(Debug, Clone)]
pub struct TtsSettings {
    /// Directory holding cached audio blobs.
    pub cache_dir: PathBuf,
    /// Whether caching applies at all (individual requests may still
    /// opt out).
    pub cache_enabled: bool,
    /// Size cap for the cache directory; oldest entries are pruned
    /// once the cap is exceeded.
    pub cache_max_bytes: u64,
    /// Maximum accepted request text length in characters.
    pub max_text_chars: usize,
    /// Billing rate per 1000 characters, standard quality.
    pub rate_standard_per_1k: f64,
    /// Billing rate per 1000 characters, high quality.
    pub rate_high_per_1k: f64,
    /// Bounded wait for remote synthesis requests.
    pub remote_timeout: Duration,
    /// Minimum guard for local rendering completion.
    pub local_timeout_floor: Duration,
    /// Additional guard per character of rendered text, at 1.0x speed.
    pub local_timeout_per_char: Duration,
}

impl Default for TtsSettings {
    fn default() -> Self {
        let cache_root = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            cache_dir: cache_root.join("step-speaks").join("audio"),
            cache_enabled: true,
            cache_max_bytes: DEFAULT_CACHE_MAX_BYTES,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            rate_standard_per_1k: DEFAULT_RATE_STANDARD_PER_1K,
            rate_high_per_1k: DEFAULT_RATE_HIGH_PER_1K,
            remote_timeout: Duration::from_secs(30),
            local_timeout_floor: Duration::from_secs(10),
            local_timeout_per_char: Duration::from_millis(200),
        }
    }
}

impl TtsSettings {
    /// Create settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Enable or disable the audio cache globally.
    #[must_use]
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Set the cache size cap in bytes.
    #[must_use]
    pub fn with_cache_max_bytes(mut self, max_bytes: u64) -> Self {
        self.cache_max_bytes = max_bytes;
        self
    }

    /// Set the maximum accepted text length.
    #[must_use]
    pub fn with_max_text_chars(mut self, max_chars: usize) -> Self {
        self.max_text_chars = max_chars;
        self
    }

    /// Set the bounded wait for remote synthesis requests.
    #[must_use]
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Set the local rendering completion guard (floor + per-char).
    #[must_use]
    pub fn with_local_timeout(mut self, floor: Duration, per_char: Duration) -> Self {
        self.local_timeout_floor = floor;
        self.local_timeout_per_char = per_char;
        self
    }

    /// Billing rate per 1000 characters for the given quality.
    pub fn rate_per_thousand(&self, quality: QualityPreference) -> f64 {
        match quality {
            QualityPreference::Standard => self.rate_standard_per_1k,
            QualityPreference::High => self.rate_high_per_1k,
        }
    }

    /// The completion guard for rendering `chars` characters at `speed`.
    ///
    /// Conservative by design: the guard only exists to prevent an
    /// indefinite stall when the device never signals completion.
    pub fn local_render_timeout(&self, chars: usize, speed: f32) -> Duration {
        let speed = speed.max(0.25) as f64;
        let per_char = self.local_timeout_per_char.as_millis() as f64;
        let budget = (chars as f64 * per_char / speed).round() as u64;
        self.local_timeout_floor + Duration::from_millis(budget)
    }
}

// ============================================================================
// Tests
// ============================================================================
