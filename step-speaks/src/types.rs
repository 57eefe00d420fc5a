//! Core types for the step-speaks synthesis layer.
//!
//! This module defines the fundamental types used throughout the system:
//! - The fixed voice set and speed levels
//! - Method/quality preferences and the `SpeechRequest` builder
//! - `AudioDescriptor`, the tagged outcome of one synthesis request
//! - `PlaybackItem`, a descriptor queued for rendering

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ============================================================================
// Voice
// ============================================================================

/// A voice from the remote speech API's fixed set.
///
/// The same identifier is carried on local descriptors so that a
/// request's cache key is stable regardless of which backend serves it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    /// Neutral, balanced voice (the API default).
    #[default]
    Alloy,
    /// Clear male voice.
    Echo,
    /// Expressive British voice.
    Fable,
    /// Deep male voice.
    Onyx,
    /// Bright female voice.
    Nova,
    /// Soft female voice.
    Shimmer,
}

impl Voice {
    /// The wire identifier used by the remote API and the cache key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }

    /// Parse a voice name (case-insensitive).
    ///
    /// ## Examples
    ///
    /// ```
    /// use step_speaks::Voice;
    ///
    /// assert_eq!(Voice::parse("Nova"), Some(Voice::Nova));
    /// assert_eq!(Voice::parse("robot"), None);
    /// ```
    pub fn parse(name: &str) -> Option<Voice> {
        match name.to_lowercase().as_str() {
            "alloy" => Some(Voice::Alloy),
            "echo" => Some(Voice::Echo),
            "fable" => Some(Voice::Fable),
            "onyx" => Some(Voice::Onyx),
            "nova" => Some(Voice::Nova),
            "shimmer" => Some(Voice::Shimmer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Speed Level
// ============================================================================

/// Speed level for speech rate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SpeedLevel {
    /// Fast speech (1.25x normal)
    Fast,
    /// Slow speech (0.75x normal)
    Slow,
    /// Default speech rate (1.0x)
    #[default]
    Normal,
    /// Explicit speed multiplier (clamped to 0.25-4.0)
    Explicit(f32),
}

impl SpeedLevel {
    /// Get the numeric speed multiplier.
    ///
    /// Returns a value where 1.0 is normal speed, values > 1.0 are faster,
    /// and values < 1.0 are slower.
    pub fn value(&self) -> f32 {
        match self {
            SpeedLevel::Fast => 1.25,
            SpeedLevel::Slow => 0.75,
            SpeedLevel::Normal => 1.0,
            SpeedLevel::Explicit(v) => v.clamp(0.25, 4.0),
        }
    }
}

// ============================================================================
// Preferences
// ============================================================================

/// Which synthesis backend the caller wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodPreference {
    /// Paid remote synthesis only; never silently substituted.
    Remote,
    /// Free on-device synthesis only; never cached.
    Local,
    /// Let the selection policy decide.
    #[default]
    Auto,
}

/// Requested output quality.
///
/// Under `MethodPreference::Auto`, `High` steers selection toward the
/// remote backend when credentials are available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreference {
    /// Default quality.
    #[default]
    Standard,
    /// High quality (remote HD model when reachable).
    High,
}

// ============================================================================
// Speech Request
// ============================================================================

/// One synthesis request, created per step per user action.
///
/// ## Examples
///
/// ```
/// use step_speaks::{MethodPreference, SpeechRequest, SpeedLevel, Voice};
///
/// let request = SpeechRequest::new("Preheat the oven to 200 degrees.")
///     .with_voice(Voice::Nova)
///     .with_speed(SpeedLevel::Slow)
///     .with_method(MethodPreference::Auto);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpeechRequest {
    /// The text to synthesize (bounded length, validated by the orchestrator).
    pub text: String,
    /// The requested voice.
    pub voice: Voice,
    /// The requested speech rate.
    pub speed: SpeedLevel,
    /// Whether the content-addressable cache may serve or store this request.
    pub cache: bool,
    /// Backend preference.
    pub method: MethodPreference,
    /// Quality preference.
    pub quality: QualityPreference,
}

impl SpeechRequest {
    /// Create a request for the given text with caching enabled.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cache: true,
            ..Default::default()
        }
    }

    /// Set the voice.
    #[must_use]
    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    /// Set the speech rate.
    #[must_use]
    pub fn with_speed(mut self, speed: SpeedLevel) -> Self {
        self.speed = speed;
        self
    }

    /// Enable or disable the audio cache for this request.
    #[must_use]
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Set the backend preference.
    #[must_use]
    pub fn with_method(mut self, method: MethodPreference) -> Self {
        self.method = method;
        self
    }

    /// Set the quality preference.
    #[must_use]
    pub fn with_quality(mut self, quality: QualityPreference) -> Self {
        self.quality = quality;
        self
    }
}

// ============================================================================
// Audio Format
// ============================================================================

/// Audio format of a synthesized or cached blob.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioFormat {
    /// MP3 format (what the remote API returns).
    #[default]
    Mp3,
    /// WAV format (uncompressed).
    Wav,
}

impl AudioFormat {
    /// Returns the file extension for this audio format.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    /// Guess the format from a file path extension. Defaults to MP3.
    pub fn from_path(path: &std::path::Path) -> AudioFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("wav") => AudioFormat::Wav,
            _ => AudioFormat::Mp3,
        }
    }
}

// ============================================================================
// Audio Location
// ============================================================================

/// Where a pre-rendered audio blob lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioLocation {
    /// A file on the local filesystem (cache entry or temp file).
    File(PathBuf),
    /// A remote URL streamed at playback time.
    Url(String),
}

impl std::fmt::Display for AudioLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioLocation::File(path) => write!(f, "{}", path.display()),
            AudioLocation::Url(url) => f.write_str(url),
        }
    }
}

// ============================================================================
// Audio Descriptor
// ============================================================================

/// Outcome of one synthesis request.
///
/// The variants make the field invariants structural: a remote outcome
/// always has a playable location and never raw text; a local outcome
/// always carries the text/voice/speed needed for on-device rendering
/// and never a location.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum AudioDescriptor {
    /// Pre-rendered audio from the paid backend (or the cache).
    Remote {
        /// Where the audio bytes live.
        location: AudioLocation,
        /// Billed cost estimate in account currency; 0 for cache hits.
        cost_estimate: f64,
        /// Whether this descriptor was served from the cache.
        cached: bool,
    },
    /// Deferred on-device rendering; synthesis repeats on every play.
    Local {
        /// The text to render.
        text: String,
        /// The requested voice identifier.
        voice: Voice,
        /// Resolved speed multiplier.
        speed: f32,
    },
    /// Synthesis failed; the playback queue logs and skips this item.
    Failed {
        /// The recorded failure reason.
        reason: String,
    },
}

impl AudioDescriptor {
    /// The method tag as serialized (`remote`, `local`, or `failed`).
    pub fn method(&self) -> &'static str {
        match self {
            AudioDescriptor::Remote { .. } => "remote",
            AudioDescriptor::Local { .. } => "local",
            AudioDescriptor::Failed { .. } => "failed",
        }
    }

    /// The billed cost estimate. Zero for cache hits and local renders.
    pub fn cost_estimate(&self) -> f64 {
        match self {
            AudioDescriptor::Remote { cost_estimate, .. } => *cost_estimate,
            _ => 0.0,
        }
    }

    /// Whether this outcome was served from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, AudioDescriptor::Remote { cached: true, .. })
    }
}

// ============================================================================
// Playback Item
// ============================================================================

/// An [`AudioDescriptor`] plus its step index, queued for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackItem {
    /// Zero-based index of the step this item narrates.
    pub step_index: usize,
    /// The synthesis outcome to render.
    pub descriptor: AudioDescriptor,
}

impl PlaybackItem {
    /// Create a playback item.
    pub fn new(step_index: usize, descriptor: AudioDescriptor) -> Self {
        Self {
            step_index,
            descriptor,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_round_trip() {
        for voice in [
            Voice::Alloy,
            Voice::Echo,
            Voice::Fable,
            Voice::Onyx,
            Voice::Nova,
            Voice::Shimmer,
        ] {
            assert_eq!(Voice::parse(voice.as_str()), Some(voice));
        }
    }

    #[test]
    fn test_voice_parse_case_insensitive() {
        assert_eq!(Voice::parse("NOVA"), Some(Voice::Nova));
        assert_eq!(Voice::parse("Shimmer"), Some(Voice::Shimmer));
    }

    #[test]
    fn test_voice_parse_invalid() {
        assert_eq!(Voice::parse("samantha"), None);
        assert_eq!(Voice::parse(""), None);
    }

    #[test]
    fn test_voice_serialization() {
        assert_eq!(serde_json::to_string(&Voice::Onyx).unwrap(), "\"onyx\"");
        let parsed: Voice = serde_json::from_str("\"fable\"").unwrap();
        assert_eq!(parsed, Voice::Fable);
    }

    #[test]
    fn test_speed_level_values() {
        assert_eq!(SpeedLevel::Fast.value(), 1.25);
        assert_eq!(SpeedLevel::Slow.value(), 0.75);
        assert_eq!(SpeedLevel::Normal.value(), 1.0);
        assert_eq!(SpeedLevel::Explicit(1.5).value(), 1.5);
    }

    #[test]
    fn test_speed_level_clamping() {
        assert_eq!(SpeedLevel::Explicit(5.0).value(), 4.0);
        assert_eq!(SpeedLevel::Explicit(0.1).value(), 0.25);
    }

    #[test]
    fn test_speech_request_defaults() {
        let request = SpeechRequest::new("hello");
        assert_eq!(request.text, "hello");
        assert!(request.cache);
        assert_eq!(request.method, MethodPreference::Auto);
        assert_eq!(request.quality, QualityPreference::Standard);
    }

    #[test]
    fn test_speech_request_builder() {
        let request = SpeechRequest::new("hello")
            .with_voice(Voice::Echo)
            .with_speed(SpeedLevel::Fast)
            .with_cache(false)
            .with_method(MethodPreference::Remote)
            .with_quality(QualityPreference::High);

        assert_eq!(request.voice, Voice::Echo);
        assert_eq!(request.speed, SpeedLevel::Fast);
        assert!(!request.cache);
        assert_eq!(request.method, MethodPreference::Remote);
        assert_eq!(request.quality, QualityPreference::High);
    }

    #[test]
    fn test_audio_format_extension() {
        assert_eq!(AudioFormat::Mp3.extension(), "mp3");
        assert_eq!(AudioFormat::Wav.extension(), "wav");
    }

    #[test]
    fn test_audio_format_from_path() {
        assert_eq!(
            AudioFormat::from_path(std::path::Path::new("/tmp/a.wav")),
            AudioFormat::Wav
        );
        assert_eq!(
            AudioFormat::from_path(std::path::Path::new("/tmp/a.mp3")),
            AudioFormat::Mp3
        );
        assert_eq!(
            AudioFormat::from_path(std::path::Path::new("/tmp/noext")),
            AudioFormat::Mp3
        );
    }

    #[test]
    fn test_descriptor_method_tags() {
        let remote = AudioDescriptor::Remote {
            location: AudioLocation::File("/tmp/a.mp3".into()),
            cost_estimate: 0.01,
            cached: false,
        };
        let local = AudioDescriptor::Local {
            text: "hi".into(),
            voice: Voice::Alloy,
            speed: 1.0,
        };
        let failed = AudioDescriptor::Failed {
            reason: "boom".into(),
        };

        assert_eq!(remote.method(), "remote");
        assert_eq!(local.method(), "local");
        assert_eq!(failed.method(), "failed");
    }

    #[test]
    fn test_descriptor_serializes_with_method_tag() {
        let descriptor = AudioDescriptor::Local {
            text: "done".into(),
            voice: Voice::Nova,
            speed: 1.0,
        };

        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains("\"method\":\"local\""));
        assert!(json.contains("\"text\":\"done\""));

        let back: AudioDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
    }

    #[test]
    fn test_descriptor_cost_and_cache_helpers() {
        let hit = AudioDescriptor::Remote {
            location: AudioLocation::File("/tmp/a.mp3".into()),
            cost_estimate: 0.0,
            cached: true,
        };
        assert!(hit.is_cached());
        assert_eq!(hit.cost_estimate(), 0.0);

        let local = AudioDescriptor::Local {
            text: "hi".into(),
            voice: Voice::Alloy,
            speed: 1.0,
        };
        assert!(!local.is_cached());
        assert_eq!(local.cost_estimate(), 0.0);
    }
}
