/// Errors that can occur during speech synthesis and playback.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// The request text was empty or exceeded the maximum length.
    ///
    /// Never retried: the same input will always be rejected.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of why the input was rejected.
        reason: String,
    },

    /// No API key was found for the remote synthesis backend.
    #[error("Missing API key for provider '{provider}'")]
    MissingApiKey {
        /// The provider that requires credentials.
        provider: String,
    },

    /// The remote synthesis HTTP request failed at the transport level.
    #[error("HTTP request to '{provider}' failed: {message}")]
    HttpError {
        /// The provider that was contacted.
        provider: String,
        /// Description of the transport failure.
        message: String,
    },

    /// The remote synthesis backend returned an error response.
    #[error("'{provider}' returned {status}: {message}")]
    ApiError {
        /// The provider that was contacted.
        provider: String,
        /// HTTP status code of the response.
        status: u16,
        /// Response body or status description.
        message: String,
    },

    /// The remote synthesis request exceeded its bounded wait.
    ///
    /// Treated as a remote failure: the orchestrator demotes the
    /// request to local synthesis when a local engine is available.
    #[error("Request to '{provider}' timed out")]
    RequestTimeout {
        /// The provider that timed out.
        provider: String,
    },

    /// No synthesis backend can serve the request.
    ///
    /// This is the only per-request error that aborts a whole batch.
    #[error("No synthesis method available: {reason}")]
    Unavailable {
        /// Why neither backend could be used.
        reason: String,
    },

    /// A queued item carried a synthesis failure instead of audio.
    #[error("Item failed during synthesis: {reason}")]
    SynthesisFailed {
        /// The recorded failure reason.
        reason: String,
    },

    /// No system audio player was found for the required format.
    #[error("No audio player available")]
    NoAudioPlayer,

    /// A subprocess (player or speech engine) failed to start.
    #[error("Failed to spawn '{program}'")]
    ProcessSpawnFailed {
        /// The binary that could not be started.
        program: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A speech-engine subprocess exited with a failure status.
    #[error("'{program}' exited with an error")]
    ProcessFailed {
        /// The binary that failed.
        program: String,
        /// Captured stderr output.
        stderr: String,
    },

    /// Audio playback exited with a failure status.
    #[error("Playback via '{player}' failed")]
    PlaybackFailed {
        /// The player binary that failed.
        player: String,
        /// Captured stderr output.
        stderr: String,
    },

    /// Local rendering did not signal completion within its guard.
    #[error("Local rendering did not complete within {seconds}s")]
    RenderTimeout {
        /// The bounded wait that elapsed.
        seconds: u64,
    },

    /// Could not open a stdin pipe to a speech-engine subprocess.
    #[error("Failed to open stdin for '{program}'")]
    StdinPipeError {
        /// The binary whose stdin could not be opened.
        program: String,
    },

    /// Temp file creation failed.
    #[error("Failed to create temp file")]
    TempFileError {
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A general I/O failure.
    #[error("I/O error")]
    IoError {
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The shared audio output is already driven by another queue.
    #[error("Audio output is claimed by another playback queue")]
    OutputBusy,
}

impl From<std::io::Error> for TtsError {
    fn from(source: std::io::Error) -> Self {
        TtsError::IoError { source }
    }
}
