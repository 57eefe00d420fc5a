//! Audio playback through system player subprocesses.
//!
//! Playback shells out to whatever player the host has rather than
//! linking an audio stack. Players are probed in preference order per
//! platform and format; URL playback is restricted to players that can
//! stream. All children are spawned with `kill_on_drop` so cancelling
//! a playback future silences the audio.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::errors::TtsError;
use crate::queue::ItemRenderer;
use crate::synth::local::LocalSynthesizer;
use crate::types::{AudioDescriptor, AudioFormat, AudioLocation, PlaybackItem};

// ============================================================================
// Player Detection
// ============================================================================

#[cfg(target_os = "macos")]
const MP3_PLAYERS: &[&str] = &["afplay", "mpv", "ffplay", "mpg123"];
#[cfg(target_os = "macos")]
const WAV_PLAYERS: &[&str] = &["afplay", "mpv", "ffplay"];

#[cfg(target_os = "linux")]
const MP3_PLAYERS: &[&str] = &["mpg123", "mpv", "ffplay", "cvlc"];
#[cfg(target_os = "linux")]
const WAV_PLAYERS: &[&str] = &["paplay", "aplay", "mpv", "ffplay"];

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const MP3_PLAYERS: &[&str] = &["mpv", "ffplay", "vlc"];
#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const WAV_PLAYERS: &[&str] = &["mpv", "ffplay", "vlc"];

/// Players that accept a URL and stream it.
const STREAM_PLAYERS: &[&str] = &["mpv", "ffplay"];

/// Find an installed player for `format`, in platform preference order.
pub fn find_player(format: AudioFormat) -> Option<&'static str> {
    let candidates = match format {
        AudioFormat::Mp3 => MP3_PLAYERS,
        AudioFormat::Wav => WAV_PLAYERS,
    };
    candidates
        .iter()
        .copied()
        .find(|player| which::which(player).is_ok())
}

/// Find an installed player capable of streaming a URL.
pub fn find_stream_player() -> Option<&'static str> {
    STREAM_PLAYERS
        .iter()
        .copied()
        .find(|player| which::which(player).is_ok())
}

/// Arguments that make `player` play `target` and exit quietly.
fn player_args(player: &str, target: &str) -> Vec<String> {
    match player {
        "mpv" => vec!["--no-video".into(), "--really-quiet".into(), target.into()],
        "ffplay" => vec![
            "-nodisp".into(),
            "-autoexit".into(),
            "-loglevel".into(),
            "quiet".into(),
            target.into(),
        ],
        "mpg123" => vec!["-q".into(), target.into()],
        "cvlc" | "vlc" => vec![
            "--play-and-exit".into(),
            "--intf".into(),
            "dummy".into(),
            target.into(),
        ],
        "aplay" => vec!["-q".into(), target.into()],
        // afplay, paplay, and anything unrecognized take a bare target.
        _ => vec![target.into()],
    }
}

async fn run_player(player: &str, target: &str) -> Result<(), TtsError> {
    let mut cmd = tokio::process::Command::new(player);
    cmd.args(player_args(player, target))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| TtsError::ProcessSpawnFailed {
        program: player.into(),
        source: e,
    })?;

    let output = child.wait_with_output().await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(TtsError::PlaybackFailed {
            player: player.into(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

// ============================================================================
// Playback
// ============================================================================

/// Play an audio file through the host's player, resolving when the
/// player exits.
///
/// The format is inferred from the file extension; unknown extensions
/// are treated as MP3.
///
/// ## Errors
///
/// Returns [`TtsError::NoAudioPlayer`] when no player is installed,
/// or [`TtsError::PlaybackFailed`] when the player exits nonzero.
pub async fn play_audio_file(path: &Path) -> Result<(), TtsError> {
    let format = AudioFormat::from_path(path);
    let player = find_player(format).ok_or(TtsError::NoAudioPlayer)?;

    tracing::debug!(player = player, path = %path.display(), "Playing audio file");

    run_player(player, &path.to_string_lossy()).await
}

/// Stream audio from a URL through a stream-capable player.
pub async fn play_audio_url(url: &str) -> Result<(), TtsError> {
    let player = find_stream_player().ok_or(TtsError::NoAudioPlayer)?;

    tracing::debug!(player = player, url = url, "Streaming audio from URL");

    run_player(player, url).await
}

/// Play audio from wherever it lives.
pub async fn play_audio(location: &AudioLocation) -> Result<(), TtsError> {
    match location {
        AudioLocation::File(path) => play_audio_file(path).await,
        AudioLocation::Url(url) => play_audio_url(url).await,
    }
}

/// Write audio bytes to a kept temp file and return its path.
///
/// Used when caching is disabled: the bytes still need a path for the
/// player subprocess. The file is not cleaned up automatically.
pub fn write_temp_audio(bytes: &[u8], format: AudioFormat) -> Result<PathBuf, TtsError> {
    let mut file = tempfile::Builder::new()
        .prefix("step-speaks-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile()
        .map_err(|e| TtsError::TempFileError { source: e })?;

    std::io::Write::write_all(&mut file, bytes)?;

    let (_file, path) = file
        .keep()
        .map_err(|e| TtsError::TempFileError { source: e.error })?;

    tracing::debug!(path = %path.display(), size = bytes.len(), "Wrote temp audio file");

    Ok(path)
}

// ============================================================================
// Hybrid Renderer
// ============================================================================

/// Renders queue items by descriptor kind.
///
/// Remote descriptors are played from their stored audio; local
/// descriptors are rendered live through the wrapped synthesizer;
/// failed descriptors surface their recorded reason as an item fault.
#[derive(Debug)]
pub struct HybridRenderer<L> {
    local: L,
}

impl<L: LocalSynthesizer> HybridRenderer<L> {
    /// Wrap a local synthesizer for live rendering of local items.
    pub fn new(local: L) -> Self {
        Self { local }
    }
}

impl<L: LocalSynthesizer> ItemRenderer for HybridRenderer<L> {
    async fn render(&self, item: &PlaybackItem) -> Result<(), TtsError> {
        match &item.descriptor {
            AudioDescriptor::Remote { location, .. } => play_audio(location).await,
            AudioDescriptor::Local { text, speed, .. } => self.local.render(text, *speed).await,
            AudioDescriptor::Failed { reason } => Err(TtsError::SynthesisFailed {
                reason: reason.clone(),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
