//! Synthesis orchestration: cache, selection, and failover.
//!
//! The orchestrator fronts every synthesis request. It consults the
//! cache before any paid call, applies the selection policy, and
//! demotes flexible requests to local rendering when the remote
//! backend fails at runtime. Cache I/O problems degrade the request
//! (miss on read, skip persist on write) but never fail it.

use crate::audio_cache::{AudioCacheStore, CacheKey};
use crate::errors::TtsError;
use crate::playback::write_temp_audio;
use crate::queue::{AudioOutput, PlaybackQueue};
use crate::selector::{Selection, select};
use crate::settings::TtsSettings;
use crate::synth::local::{HostSynthesizer, LocalSynthesizer};
use crate::synth::remote::{OpenAiSpeechClient, RemoteSynthesizer};
use crate::types::{
    AudioDescriptor, AudioFormat, AudioLocation, MethodPreference, PlaybackItem,
    QualityPreference, SpeechRequest, SpeedLevel, Voice,
};

// ============================================================================
// Queue Options
// ============================================================================

/// Shared preferences for every step in one queue build.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Voice applied to every step.
    pub voice: Voice,
    /// Speech rate applied to every step.
    pub speed: SpeedLevel,
    /// Backend preference applied to every step.
    pub method: MethodPreference,
    /// Quality preference applied to every step.
    pub quality: QualityPreference,
    /// Whether the cache may serve or store these steps.
    pub cache: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            voice: Voice::default(),
            speed: SpeedLevel::default(),
            method: MethodPreference::default(),
            quality: QualityPreference::default(),
            cache: true,
        }
    }
}

impl QueueOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
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

    /// Enable or disable the cache for these steps.
    #[must_use]
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    fn request_for(&self, text: impl Into<String>) -> SpeechRequest {
        SpeechRequest::new(text)
            .with_voice(self.voice)
            .with_speed(self.speed)
            .with_method(self.method)
            .with_quality(self.quality)
            .with_cache(self.cache)
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Coordinates cache, selection policy, and the two synthesis backends.
///
/// Generic over its backends so policy behavior is testable without
/// network or audio hardware.
///
/// ## Examples
///
/// ```ignore
/// use step_speaks::{SpeechOrchestrator, SpeechRequest, TtsSettings};
///
/// let orchestrator = SpeechOrchestrator::from_settings(TtsSettings::default())?;
/// let descriptor = orchestrator
///     .synthesize(&SpeechRequest::new("Whisk until smooth."))
///     .await?;
/// ```
#[derive(Debug)]
pub struct SpeechOrchestrator<R, L> {
    settings: TtsSettings,
    cache: Option<AudioCacheStore>,
    remote: R,
    local: L,
}

impl SpeechOrchestrator<OpenAiSpeechClient, HostSynthesizer> {
    /// Build an orchestrator over the default backends.
    ///
    /// ## Errors
    ///
    /// Returns `TtsError::HttpError` if the remote HTTP client cannot
    /// be built. A cache that cannot be opened is degradation, not an
    /// error: the orchestrator runs uncached.
    pub fn from_settings(settings: TtsSettings) -> Result<Self, TtsError> {
        let remote = OpenAiSpeechClient::new(settings.remote_timeout)?;
        let local = HostSynthesizer::detect(&settings);
        Ok(Self::with_backends(settings, remote, local))
    }
}

impl<R: RemoteSynthesizer, L: LocalSynthesizer> SpeechOrchestrator<R, L> {
    /// Build an orchestrator over explicit backends.
    pub fn with_backends(settings: TtsSettings, remote: R, local: L) -> Self {
        let cache = if settings.cache_enabled {
            match AudioCacheStore::open(&settings.cache_dir, settings.cache_max_bytes) {
                Ok(store) => Some(store),
                Err(error) => {
                    tracing::warn!(
                        cache_dir = %settings.cache_dir.display(),
                        error = %error,
                        "Audio cache unavailable, continuing without it"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            settings,
            cache,
            remote,
            local,
        }
    }

    /// The settings this orchestrator was built with.
    pub fn settings(&self) -> &TtsSettings {
        &self.settings
    }

    /// Synthesize one request into a playable descriptor.
    ///
    /// Resolution order: validate, consult the cache, apply the
    /// selection policy, call the chosen backend. A remote failure
    /// under `Auto` demotes to a local descriptor; under an explicit
    /// `Remote` preference it propagates unchanged.
    ///
    /// ## Errors
    ///
    /// - [`TtsError::InvalidInput`] for empty or over-length text.
    /// - [`TtsError::Unavailable`] when no backend can serve the
    ///   request.
    /// - Remote errors, when the preference forbids demotion.
    pub async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioDescriptor, TtsError> {
        self.validate(&request.text)?;

        let speed = request.speed.value();
        let key = CacheKey::new(&request.text, request.voice, speed);

        // Local output is rendered live and never cached, so only
        // non-local requests consult the store.
        let use_cache = request.cache && request.method != MethodPreference::Local;

        if use_cache
            && let Some(cache) = &self.cache
            && let Some(path) = cache.lookup(&key)
        {
            tracing::debug!(path = %path.display(), "Cache hit, no synthesis cost");
            return Ok(AudioDescriptor::Remote {
                location: AudioLocation::File(path),
                cost_estimate: 0.0,
                cached: true,
            });
        }

        match select(
            request.method,
            request.quality,
            self.remote.credentials_available(),
        ) {
            Selection::Remote => self.synthesize_remote(request, &key, use_cache).await,
            Selection::Local => self.local_descriptor(request),
            Selection::Unavailable => Err(TtsError::Unavailable {
                reason: "remote synthesis requested but no credentials are configured".into(),
            }),
        }
    }

    /// Synthesize every step into an ordered, ready-to-play queue.
    ///
    /// Steps that fail individually are enqueued as failed items so
    /// position numbering stays intact; the queue logs and skips them
    /// at playback time.
    ///
    /// ## Errors
    ///
    /// Returns [`TtsError::Unavailable`] and builds nothing when no
    /// backend can serve the batch at all.
    pub async fn build_queue<S: AsRef<str>>(
        &self,
        steps: &[S],
        options: &QueueOptions,
        output: AudioOutput,
    ) -> Result<PlaybackQueue, TtsError> {
        let mut items = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let request = options.request_for(step.as_ref());
            let descriptor = match self.synthesize(&request).await {
                Ok(descriptor) => descriptor,
                Err(error @ TtsError::Unavailable { .. }) => return Err(error),
                Err(error) => {
                    tracing::warn!(step = index, error = %error, "Step synthesis failed");
                    AudioDescriptor::Failed {
                        reason: error.to_string(),
                    }
                }
            };
            items.push(PlaybackItem::new(index, descriptor));
        }

        let mut queue = PlaybackQueue::new(output);
        queue.enqueue(items);

        tracing::debug!(items = queue.len(), "Playback queue built");
        Ok(queue)
    }

    fn validate(&self, text: &str) -> Result<(), TtsError> {
        if text.trim().is_empty() {
            return Err(TtsError::InvalidInput {
                reason: "text is empty".into(),
            });
        }

        let chars = text.chars().count();
        if chars > self.settings.max_text_chars {
            return Err(TtsError::InvalidInput {
                reason: format!(
                    "text is {chars} characters, maximum is {}",
                    self.settings.max_text_chars
                ),
            });
        }

        Ok(())
    }

    async fn synthesize_remote(
        &self,
        request: &SpeechRequest,
        key: &CacheKey,
        use_cache: bool,
    ) -> Result<AudioDescriptor, TtsError> {
        let speed = request.speed.value();

        let bytes = match self
            .remote
            .synthesize(&request.text, request.voice, speed, request.quality)
            .await
        {
            Ok(bytes) => bytes,
            Err(error) => {
                // Auto means flexible: a failing remote backend demotes
                // to local. An explicit Remote preference is never
                // silently substituted.
                if request.method == MethodPreference::Auto {
                    if self.local.is_ready() {
                        tracing::warn!(error = %error, "Remote synthesis failed, demoting to local");
                        return self.local_descriptor(request);
                    }
                    return Err(TtsError::Unavailable {
                        reason: format!(
                            "remote synthesis failed ({error}) and no local speech engine is available"
                        ),
                    });
                }
                return Err(error);
            }
        };

        let chars = request.text.chars().count();
        let cost_estimate =
            (chars as f64 / 1000.0) * self.settings.rate_per_thousand(request.quality);

        let path = if use_cache
            && let Some(cache) = &self.cache
        {
            match cache.store(key, &bytes) {
                Ok(path) => path,
                Err(error) => {
                    // Persist failure degrades this request, not the
                    // synthesis that already succeeded.
                    tracing::warn!(error = %error, "Cache write failed, using temp file");
                    write_temp_audio(&bytes, AudioFormat::Mp3)?
                }
            }
        } else {
            write_temp_audio(&bytes, AudioFormat::Mp3)?
        };

        tracing::debug!(
            path = %path.display(),
            cost = cost_estimate,
            "Remote synthesis complete"
        );

        Ok(AudioDescriptor::Remote {
            location: AudioLocation::File(path),
            cost_estimate,
            cached: false,
        })
    }

    fn local_descriptor(&self, request: &SpeechRequest) -> Result<AudioDescriptor, TtsError> {
        if !self.local.is_ready() {
            return Err(TtsError::Unavailable {
                reason: "no local speech engine on this host".into(),
            });
        }

        Ok(AudioDescriptor::Local {
            text: request.text.clone(),
            voice: request.voice,
            speed: request.speed.value(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
