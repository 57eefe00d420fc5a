//! Step Speaks
//!
//! Hybrid text-to-speech for step-by-step narration: paid remote
//! synthesis with a content-addressable audio cache, free on-device
//! rendering as the fallback, and an ordered playback queue.
//!
//! ## Features
//!
//! - **Cost-aware caching**: every remote result is stored under a
//!   deterministic digest of (text, voice, speed); repeat requests cost
//!   nothing
//! - **Hybrid selection**: remote, local, or automatic selection driven
//!   by quality preference and credential availability
//! - **Runtime failover**: a failing remote backend demotes flexible
//!   requests to local rendering instead of failing them
//! - **Controllable playback**: pause at item boundaries, stop with
//!   interruption, single-output arbitration across queues
//! - **Async-first**: built on tokio for non-blocking synthesis and
//!   subprocess playback
//!
//! ## Quick Start
//!
//! ```ignore
//! use step_speaks::{
//!     AudioOutput, HybridRenderer, QueueOptions, SpeechOrchestrator, TtsSettings,
//! };
//!
//! let settings = TtsSettings::default();
//! let orchestrator = SpeechOrchestrator::from_settings(settings.clone())?;
//!
//! let steps = ["Crack the eggs.", "Whisk until smooth."];
//! let mut queue = orchestrator
//!     .build_queue(&steps, &QueueOptions::new(), AudioOutput::new())
//!     .await?;
//!
//! let renderer = HybridRenderer::new(step_speaks::HostSynthesizer::detect(&settings));
//! queue.play(&renderer).await?;
//! ```
//!
//! ## Module Structure
//!
//! - [`types`] - Voices, speeds, preferences, and `AudioDescriptor`
//! - [`errors`] - The `TtsError` type
//! - [`settings`] - `TtsSettings` and billing/timeout defaults
//! - [`audio_cache`] - The content-addressable audio blob store
//! - [`selector`] - The backend selection policy
//! - [`synth`] - Remote and local synthesis backends
//! - [`orchestrator`] - Cache-then-select-then-synthesize coordination
//! - [`playback`] - System-player subprocess playback
//! - [`queue`] - The ordered, controllable playback queue

pub mod audio_cache;
pub mod errors;
pub mod orchestrator;
pub mod playback;
pub mod queue;
pub mod selector;
pub mod settings;
pub mod synth;
pub mod types;

// Re-export main types at crate root for convenience
pub use audio_cache::{AudioCacheStore, CacheError, CacheKey};
pub use errors::TtsError;
pub use orchestrator::{QueueOptions, SpeechOrchestrator};
pub use playback::{HybridRenderer, play_audio, play_audio_file, play_audio_url, write_temp_audio};
pub use queue::{
    AudioOutput, ItemRenderer, OutputGrant, PlayReport, PlaybackQueue, QueueControl, QueueState,
};
pub use selector::{Selection, select};
pub use settings::TtsSettings;
pub use synth::{
    HostSynthesizer, LocalSynthesizer, OpenAiSpeechClient, RemoteSynthesizer, SpeechEngine,
};
pub use types::{
    AudioDescriptor, AudioFormat, AudioLocation, MethodPreference, PlaybackItem,
    QualityPreference, SpeechRequest, SpeedLevel, Voice,
};
