//! Speech-to-text client.
//!
//! Uploads a file's bytes as multipart form data to the STT endpoint and
//! parses the transcript out of the JSON response.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use super::Transcriber;

// Transcribing a long recording can take minutes
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors from one transcription attempt
#[derive(Debug, Error)]
pub enum SttError {
    #[error("STT endpoint unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("STT returned status {0}")]
    BadStatus(reqwest::StatusCode),

    #[error("STT response was not parseable: {0}")]
    MalformedResponse(#[source] reqwest::Error),

    #[error("STT returned an empty transcript")]
    EmptyTranscript,

    #[error("Failed to read audio file: {0}")]
    Io(#[from] std::io::Error),
}

/// Transcript returned by the STT service
#[derive(Debug, Clone)]
pub struct Transcript {
    /// Transcribed text, trimmed
    pub text: String,

    /// Recording length in seconds, when reported
    pub duration_seconds: Option<f64>,

    /// Detected language, when reported
    pub language: Option<String>,
}

/// STT service response body
#[derive(Debug, Deserialize)]
struct SttResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    language: Option<String>,
}

impl SttResponse {
    /// An empty transcript counts as a failure; the recording produced
    /// nothing worth delivering.
    fn into_transcript(self) -> Result<Transcript, SttError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(SttError::EmptyTranscript);
        }
        Ok(Transcript {
            text: text.to_string(),
            duration_seconds: self.duration,
            language: self.language,
        })
    }
}

/// HTTP client for the STT endpoint
pub struct SttClient {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl SttClient {
    pub fn new(url: String, model: String) -> Self {
        Self {
            url,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Upload one file and parse the transcript out of the response
    pub async fn transcribe_file(&self, audio_path: &Path) -> Result<Transcript, SttError> {
        let file_name = audio_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let bytes = tokio::fs::read(audio_path).await?;

        let file_part = Part::bytes(bytes).file_name(file_name);
        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(SttError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SttError::BadStatus(status));
        }

        let body: SttResponse = response.json().await.map_err(SttError::MalformedResponse)?;
        body.into_transcript()
    }
}

#[async_trait]
impl Transcriber for SttClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, SttError> {
        self.transcribe_file(audio_path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Transcript, SttError> {
        let body: SttResponse = serde_json::from_str(json).unwrap();
        body.into_transcript()
    }

    #[test]
    fn test_transcript_with_metadata() {
        let transcript = parse(r#"{"text": " buy milk ", "duration": 3.2, "language": "en"}"#)
            .unwrap();
        assert_eq!(transcript.text, "buy milk");
        assert_eq!(transcript.duration_seconds, Some(3.2));
        assert_eq!(transcript.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_transcript_text_only() {
        let transcript = parse(r#"{"text": "buy milk"}"#).unwrap();
        assert_eq!(transcript.text, "buy milk");
        assert!(transcript.duration_seconds.is_none());
        assert!(transcript.language.is_none());
    }

    #[test]
    fn test_blank_transcript_rejected() {
        assert!(matches!(
            parse(r#"{"text": "   "}"#),
            Err(SttError::EmptyTranscript)
        ));
        assert!(matches!(parse(r#"{}"#), Err(SttError::EmptyTranscript)));
    }
}
