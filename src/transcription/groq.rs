//! Groq Whisper API client for speech-to-text transcription.
//!
//! One-shot multipart POST of captured WAV bytes; only the recognized text
//! is kept from the response. There is no retry policy: the audio buffer is
//! the value, and re-attempting is a caller decision.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

const GROQ_TRANSCRIPTION_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";

/// Global HTTP client for reuse across requests (avoids TLS handshake overhead)
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Errors that can occur during transcription
#[derive(Debug)]
pub enum TranscriptionError {
    /// No API credential configured
    MissingCredential,
    /// Network/HTTP error
    Transport(String),
    /// The service returned an error response
    Api { status: u16, message: String },
    /// Failed to parse the service response
    Parse(String),
}

impl std::fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionError::MissingCredential => {
                write!(f, "Transcription API credential is not configured")
            }
            TranscriptionError::Transport(e) => write!(f, "Network error: {}", e),
            TranscriptionError::Api { status, message } => {
                write!(f, "Transcription API error ({}): {}", status, message)
            }
            TranscriptionError::Parse(e) => write!(f, "Failed to parse API response: {}", e),
        }
    }
}

impl std::error::Error for TranscriptionError {}

/// Whisper transcription response (json response_format)
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// API error response
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Transcription seam. The production implementation calls the remote
/// service; tests substitute a stub.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        language: &str,
        model: &str,
        credential: &str,
    ) -> Result<String, TranscriptionError>;
}

/// Remote Whisper client against Groq's OpenAI-compatible endpoint.
pub struct GroqClient {
    endpoint: String,
}

impl GroqClient {
    pub fn new() -> Self {
        Self {
            endpoint: GROQ_TRANSCRIPTION_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint. Used by tests against a
    /// local mock server.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Default for GroqClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for GroqClient {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        language: &str,
        model: &str,
        credential: &str,
    ) -> Result<String, TranscriptionError> {
        if credential.trim().is_empty() {
            return Err(TranscriptionError::MissingCredential);
        }

        log::info!(
            "transcribing {} bytes (model {}, language {})",
            audio.len(),
            model,
            language
        );

        let file_part = Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", model.to_string())
            .text("temperature", "0")
            .text("response_format", "json")
            .text("language", language.to_string());

        let response = get_http_client()
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", credential))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::Transport(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            let whisper_response: WhisperResponse = response
                .json()
                .await
                .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

            log::info!(
                "transcription successful: {} chars",
                whisper_response.text.len()
            );
            Ok(whisper_response.text)
        } else {
            let error_text = response.text().await.unwrap_or_default();

            let message =
                if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };

            log::error!("transcription API error ({}): {}", status.as_u16(), message);

            Err(TranscriptionError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_error_display() {
        let err = TranscriptionError::MissingCredential;
        assert!(err.to_string().contains("credential"));
    }

    #[test]
    fn api_error_display() {
        let err = TranscriptionError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn empty_credential_is_rejected_before_any_request() {
        let client = GroqClient::with_endpoint("http://127.0.0.1:1/unused");
        let result = client.transcribe(vec![1, 2, 3], "en", "whisper-1", "  ").await;
        assert!(matches!(result, Err(TranscriptionError::MissingCredential)));
    }
}
