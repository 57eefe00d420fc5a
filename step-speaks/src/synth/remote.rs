//! Remote speech synthesis over HTTP.
//!
//! The remote backend is billed per character and returns a complete
//! MP3 buffer per request. Requests are bounded by the configured
//! timeout; a timeout is treated as a remote failure and handled by
//! the orchestrator's demotion rule, never surfaced directly.
//!
//! ## Environment Variables
//!
//! The API key is read from `OPENAI_API_KEY`.

use std::time::Duration;

use crate::errors::TtsError;
use crate::types::{QualityPreference, Voice};

/// Provider name used in error messages and logs.
const PROVIDER_NAME: &str = "openai";

/// Default API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Model used for standard quality.
const STANDARD_MODEL: &str = "tts-1";

/// Model used for high quality.
const HIGH_MODEL: &str = "tts-1-hd";

/// A backend that converts text to audio bytes off-device.
///
/// Uses native async functions in traits; implementations must be
/// `Send + Sync` for concurrent use across tasks.
pub trait RemoteSynthesizer: Send + Sync {
    /// Whether credentials for the paid backend are configured.
    ///
    /// This is a cheap, synchronous probe used by the selection policy.
    fn credentials_available(&self) -> bool;

    /// Synthesize `text` to audio bytes.
    ///
    /// ## Errors
    ///
    /// Returns `TtsError` on transport failure, API error, timeout, or
    /// missing credentials. All of these are recoverable at the
    /// orchestrator level via demotion to local synthesis.
    fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        speed: f32,
        quality: QualityPreference,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, TtsError>> + Send;
}

/// Speech client for the OpenAI audio API.
///
/// ## Examples
///
/// ```ignore
/// use std::time::Duration;
/// use step_speaks::{OpenAiSpeechClient, RemoteSynthesizer, Voice, QualityPreference};
///
/// let client = OpenAiSpeechClient::new(Duration::from_secs(30))?;
/// if client.credentials_available() {
///     let mp3 = client
///         .synthesize("Hello", Voice::Alloy, 1.0, QualityPreference::Standard)
///         .await?;
/// }
/// ```
pub struct OpenAiSpeechClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl std::fmt::Debug for OpenAiSpeechClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSpeechClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenAiSpeechClient {
    /// Create a client, reading the API key from the environment.
    ///
    /// Unlike a hard credential check, a missing key is not an error
    /// here: the selection policy consults `credentials_available()`
    /// and routes around an unconfigured client.
    ///
    /// ## Errors
    ///
    /// Returns `TtsError::HttpError` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, TtsError> {
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        Self::build(api_key, timeout)
    }

    /// Create a client with an explicit API key.
    pub fn from_api_key(api_key: impl Into<String>, timeout: Duration) -> Result<Self, TtsError> {
        Self::build(Some(api_key.into()), timeout)
    }

    fn build(api_key: Option<String>, timeout: Duration) -> Result<Self, TtsError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TtsError::HttpError {
                provider: PROVIDER_NAME.into(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
        })
    }

    /// Override the API base URL.
    ///
    /// Useful for testing with mock servers.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// The model identifier for a quality preference.
    fn model_for(quality: QualityPreference) -> &'static str {
        match quality {
            QualityPreference::Standard => STANDARD_MODEL,
            QualityPreference::High => HIGH_MODEL,
        }
    }
}

impl RemoteSynthesizer for OpenAiSpeechClient {
    fn credentials_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        speed: f32,
        quality: QualityPreference,
    ) -> Result<Vec<u8>, TtsError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| TtsError::MissingApiKey {
            provider: PROVIDER_NAME.into(),
        })?;

        let model = Self::model_for(quality);
        let body = serde_json::json!({
            "model": model,
            "input": text,
            "voice": voice.as_str(),
            "speed": speed,
            "response_format": "mp3",
        });

        tracing::debug!(
            voice = voice.as_str(),
            model = model,
            text_len = text.len(),
            "Sending remote synthesis request"
        );

        let response = self
            .http
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::RequestTimeout {
                        provider: PROVIDER_NAME.into(),
                    }
                } else {
                    TtsError::HttpError {
                        provider: PROVIDER_NAME.into(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(TtsError::ApiError {
                provider: PROVIDER_NAME.into(),
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(|e| TtsError::HttpError {
            provider: PROVIDER_NAME.into(),
            message: e.to_string(),
        })?;

        tracing::debug!(audio_size = bytes.len(), "Received remote audio response");

        Ok(bytes.to_vec())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OpenAiSpeechClient {
        OpenAiSpeechClient::from_api_key("test-key", Duration::from_secs(5))
            .expect("client builds")
            .with_base_url(base_url)
    }

    #[test]
    fn test_model_for_quality() {
        assert_eq!(
            OpenAiSpeechClient::model_for(QualityPreference::Standard),
            "tts-1"
        );
        assert_eq!(OpenAiSpeechClient::model_for(QualityPreference::High), "tts-1-hd");
    }

    #[test]
    fn test_credentials_available_with_explicit_key() {
        let client =
            OpenAiSpeechClient::from_api_key("k", Duration::from_secs(5)).expect("client builds");
        assert!(client.credentials_available());
    }

    #[test]
    #[serial_test::serial]
    fn test_credentials_unavailable_without_env_key() {
        // SAFETY: serialized test, no other thread reads the environment
        unsafe {
            std::env::remove_var("OPENAI_API_KEY");
        }

        let client = OpenAiSpeechClient::new(Duration::from_secs(5)).expect("client builds");
        assert!(!client.credentials_available());
    }

    #[tokio::test]
    async fn test_synthesize_posts_expected_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "tts-1",
                "input": "Hello",
                "voice": "alloy",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3-fake-mp3".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let bytes = client
            .synthesize("Hello", Voice::Alloy, 1.0, QualityPreference::Standard)
            .await
            .expect("synthesis succeeds");

        assert_eq!(bytes, b"ID3-fake-mp3");
    }

    #[tokio::test]
    async fn test_high_quality_uses_hd_model() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .and(body_partial_json(serde_json::json!({ "model": "tts-1-hd" })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hd".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        client
            .synthesize("Hello", Voice::Nova, 1.0, QualityPreference::High)
            .await
            .expect("synthesis succeeds");
    }

    #[tokio::test]
    async fn test_api_error_maps_to_api_error_variant() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client
            .synthesize("Hello", Voice::Alloy, 1.0, QualityPreference::Standard)
            .await;

        match result {
            Err(TtsError::ApiError { status, message, .. }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_maps_to_request_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = OpenAiSpeechClient::from_api_key("test-key", Duration::from_millis(100))
            .expect("client builds")
            .with_base_url(server.uri());

        let result = client
            .synthesize("Hello", Voice::Alloy, 1.0, QualityPreference::Standard)
            .await;

        assert!(matches!(result, Err(TtsError::RequestTimeout { .. })));
    }

    #[tokio::test]
    async fn test_missing_key_is_missing_api_key_error() {
        let client = OpenAiSpeechClient::build(None, Duration::from_secs(5)).expect("client builds");
        let result = client
            .synthesize("Hello", Voice::Alloy, 1.0, QualityPreference::Standard)
            .await;

        assert!(matches!(result, Err(TtsError::MissingApiKey { .. })));
    }
}
