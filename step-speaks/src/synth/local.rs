//! On-device speech synthesis.
//!
//! The local backend is free and renders live through the platform
//! speech command; it never produces byte output and is never cached.
//! There is no universal "ended" event for device speech, so the
//! completion signal is the engine process exiting, guarded by a
//! timeout proportional to the text length.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;

use crate::errors::TtsError;
use crate::settings::TtsSettings;

/// Base speaking rate in words per minute for engines that take one.
const DEFAULT_RATE_WPM: f32 = 175.0;

/// A backend that renders text as live audio on this device.
///
/// `render` resolves only once rendering completes; dropping the
/// returned future cancels the rendering.
pub trait LocalSynthesizer: Send + Sync {
    /// Whether a speech engine is present on this host.
    fn is_ready(&self) -> bool;

    /// Render `text` aloud at `speed`, resolving on completion.
    ///
    /// ## Errors
    ///
    /// Returns `TtsError` if no engine is available, the engine fails,
    /// or the completion guard elapses.
    fn render(
        &self,
        text: &str,
        speed: f32,
    ) -> impl std::future::Future<Output = Result<(), TtsError>> + Send;
}

// ============================================================================
// Speech Engine
// ============================================================================

/// Platform speech commands usable for live rendering.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEngine {
    /// macOS built-in speech synthesis (`say`).
    Say,
    /// eSpeak NG (`espeak-ng`), common on Linux.
    ESpeakNg,
    /// Classic eSpeak (`espeak`).
    ESpeak,
    /// Windows Speech API via PowerShell.
    Sapi,
}

impl SpeechEngine {
    /// The binary name for this engine.
    pub fn binary_name(&self) -> &'static str {
        match self {
            SpeechEngine::Say => "say",
            SpeechEngine::ESpeakNg => "espeak-ng",
            SpeechEngine::ESpeak => "espeak",
            SpeechEngine::Sapi => "powershell",
        }
    }

    /// Engines in platform preference order.
    fn platform_stack() -> &'static [SpeechEngine] {
        if cfg!(target_os = "macos") {
            &[SpeechEngine::Say, SpeechEngine::ESpeakNg, SpeechEngine::ESpeak]
        } else if cfg!(target_os = "windows") {
            &[SpeechEngine::Sapi, SpeechEngine::ESpeakNg, SpeechEngine::ESpeak]
        } else {
            &[SpeechEngine::ESpeakNg, SpeechEngine::ESpeak, SpeechEngine::Say]
        }
    }

    /// Detect the first engine present on this host.
    pub fn detect() -> Option<SpeechEngine> {
        Self::platform_stack()
            .iter()
            .copied()
            .find(|engine| which::which(engine.binary_name()).is_ok())
    }
}

// ============================================================================
// Host Synthesizer
// ============================================================================

/// Live renderer over the host's speech command.
///
/// ## Examples
///
/// ```ignore
/// use step_speaks::{HostSynthesizer, LocalSynthesizer, TtsSettings};
///
/// let local = HostSynthesizer::detect(&TtsSettings::default());
/// if local.is_ready() {
///     local.render("All done.", 1.0).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HostSynthesizer {
    engine: Option<SpeechEngine>,
    settings: TtsSettings,
}

impl HostSynthesizer {
    /// Detect the host's speech engine and build a renderer over it.
    pub fn detect(settings: &TtsSettings) -> Self {
        let engine = SpeechEngine::detect();
        if let Some(engine) = engine {
            tracing::debug!(engine = engine.binary_name(), "Detected local speech engine");
        } else {
            tracing::warn!("No local speech engine found on this host");
        }

        Self {
            engine,
            settings: settings.clone(),
        }
    }

    /// Build a renderer over a specific engine (skips detection).
    pub fn with_engine(engine: SpeechEngine, settings: &TtsSettings) -> Self {
        Self {
            engine: Some(engine),
            settings: settings.clone(),
        }
    }

    /// The detected engine, if any.
    pub fn engine(&self) -> Option<SpeechEngine> {
        self.engine
    }

    /// Words-per-minute rate for a speed multiplier.
    fn resolve_rate_wpm(speed: f32) -> u32 {
        (DEFAULT_RATE_WPM * speed.clamp(0.25, 4.0)).round() as u32
    }

    /// SAPI rate for a speed multiplier (the API takes -10..=10).
    fn resolve_sapi_rate(speed: f32) -> i32 {
        (((speed.clamp(0.25, 4.0) - 1.0) * 10.0).round() as i32).clamp(-10, 10)
    }

    async fn run_engine(
        engine: SpeechEngine,
        text: &str,
        speed: f32,
    ) -> Result<(), TtsError> {
        let program = engine.binary_name();
        let mut cmd = tokio::process::Command::new(program);
        let mut pipe_text_to_stdin = false;

        match engine {
            SpeechEngine::Say => {
                cmd.arg("-r").arg(Self::resolve_rate_wpm(speed).to_string());
                pipe_text_to_stdin = true;
            }
            SpeechEngine::ESpeakNg | SpeechEngine::ESpeak => {
                cmd.arg("-s")
                    .arg(Self::resolve_rate_wpm(speed).to_string())
                    .arg(text);
            }
            SpeechEngine::Sapi => {
                cmd.arg("-NoProfile")
                    .arg("-NonInteractive")
                    .arg("-Command")
                    .arg(format!(
                        "Add-Type -AssemblyName System.Speech; \
                         $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
                         $s.Rate = {}; $s.Speak('{}')",
                        Self::resolve_sapi_rate(speed),
                        text.replace('\'', "''")
                    ));
            }
        }

        cmd.stdin(if pipe_text_to_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());
        // Dropping the wait future (timeout or queue stop) must kill
        // the rendering, not leave it speaking in the background.
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| TtsError::ProcessSpawnFailed {
            program: program.into(),
            source: e,
        })?;

        if pipe_text_to_stdin {
            let mut stdin = child.stdin.take().ok_or_else(|| TtsError::StdinPipeError {
                program: program.into(),
            })?;
            stdin.write_all(text.as_bytes()).await?;
            // EOF tells the engine the text is complete.
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(TtsError::ProcessFailed {
                program: program.into(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            })
        }
    }
}

impl LocalSynthesizer for HostSynthesizer {
    fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    async fn render(&self, text: &str, speed: f32) -> Result<(), TtsError> {
        let engine = self.engine.ok_or_else(|| TtsError::Unavailable {
            reason: "no local speech engine on this host".into(),
        })?;

        let guard = self
            .settings
            .local_render_timeout(text.chars().count(), speed);

        tracing::debug!(
            engine = engine.binary_name(),
            text_len = text.len(),
            guard_secs = guard.as_secs(),
            "Rendering text locally"
        );

        match tokio::time::timeout(guard, Self::run_engine(engine, text, speed)).await {
            Ok(result) => result,
            // The dropped wait future kills the engine process.
            Err(_) => Err(TtsError::RenderTimeout {
                seconds: guard.as_secs(),
            }),
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
    fn test_binary_names() {
        assert_eq!(SpeechEngine::Say.binary_name(), "say");
        assert_eq!(SpeechEngine::ESpeakNg.binary_name(), "espeak-ng");
        assert_eq!(SpeechEngine::ESpeak.binary_name(), "espeak");
        assert_eq!(SpeechEngine::Sapi.binary_name(), "powershell");
    }

    #[test]
    fn test_platform_stack_not_empty() {
        assert!(!SpeechEngine::platform_stack().is_empty());
    }

    #[test]
    fn test_resolve_rate_wpm() {
        assert_eq!(HostSynthesizer::resolve_rate_wpm(1.0), 175);
        // 175 * 1.25 = 219 (rounded)
        assert_eq!(HostSynthesizer::resolve_rate_wpm(1.25), 219);
        // 175 * 0.75 = 131 (rounded)
        assert_eq!(HostSynthesizer::resolve_rate_wpm(0.75), 131);
    }

    #[test]
    fn test_resolve_rate_clamps_speed() {
        // 0.1 clamps to 0.25 -> 44 wpm
        assert_eq!(HostSynthesizer::resolve_rate_wpm(0.1), 44);
        // 10.0 clamps to 4.0 -> 700 wpm
        assert_eq!(HostSynthesizer::resolve_rate_wpm(10.0), 700);
    }

    #[test]
    fn test_resolve_sapi_rate() {
        assert_eq!(HostSynthesizer::resolve_sapi_rate(1.0), 0);
        assert_eq!(HostSynthesizer::resolve_sapi_rate(2.0), 10);
        assert_eq!(HostSynthesizer::resolve_sapi_rate(0.5), -5);
        assert_eq!(HostSynthesizer::resolve_sapi_rate(0.25), -8);
    }

    fn engineless() -> HostSynthesizer {
        HostSynthesizer {
            engine: None,
            settings: TtsSettings::default(),
        }
    }

    #[test]
    fn test_not_ready_without_engine() {
        assert!(!engineless().is_ready());
    }

    #[tokio::test]
    async fn test_render_without_engine_is_unavailable() {
        let result = engineless().render("hello", 1.0).await;
        assert!(matches!(result, Err(TtsError::Unavailable { .. })));
    }

    #[tokio::test]
    #[ignore = "produces audio - run manually"]
    async fn test_render_on_host_engine() {
        let synth = HostSynthesizer::detect(&TtsSettings::default());
        if synth.is_ready() {
            synth
                .render("Local rendering test.", 1.0)
                .await
                .expect("render succeeds");
        }
    }
}
