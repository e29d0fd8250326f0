//! OpenClaw webhook client for delivering transcripts downstream.
//!
//! Endpoint: POST {OPENCLAW_URL}{OPENCLAW_HOOK_PATH}
//! Auth: Bearer token

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, SecondsFormat};
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use super::TranscriptSink;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Response bodies are logged truncated; error pages can be huge
const BODY_SNIPPET_LEN: usize = 200;

/// Errors from one delivery attempt
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Webhook unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Webhook rejected the auth token (status {0})")]
    AuthRejected(StatusCode),

    #[error("Webhook returned status {status}: {body}")]
    BadStatus { status: StatusCode, body: String },
}

/// Payload for the agent hook
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookPayload {
    /// Rendered message for the agent: transcript plus a metadata block
    pub message: String,

    /// Label for gateway logs
    pub name: String,

    /// Session key for continuity
    pub session_key: String,

    /// Source file name
    pub audio_file: String,

    /// Transcript text
    pub transcript: String,

    /// File mtime, i.e. when the recording finished
    pub recorded_at: DateTime<Local>,

    /// Recording length in seconds, when the STT service reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Source file size in bytes
    pub file_size: u64,
}

impl HookPayload {
    pub fn new(
        audio_file: String,
        transcript: String,
        recorded_at: DateTime<Local>,
        duration_seconds: Option<f64>,
        file_size: u64,
    ) -> Self {
        let duration_str = match duration_seconds {
            Some(secs) => format!("{:.1}s", secs),
            None => "unknown".to_string(),
        };

        let message = format!(
            "Voice note received.\n\n\
             **Transcript:**\n> {}\n\n\
             **Metadata:**\n\
             - Audio file: {}\n\
             - Recorded: {}\n\
             - Duration: {}",
            transcript,
            audio_file,
            recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_str,
        );

        Self {
            message,
            name: "VoiceIngest".to_string(),
            session_key: format!("hook:voice:{}", audio_file),
            audio_file,
            transcript,
            recorded_at,
            duration_seconds,
            file_size,
        }
    }
}

/// OpenClaw webhook client
pub struct HookClient {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

impl HookClient {
    /// Build a client for `{base_url}{hook_path}`, tolerating a trailing
    /// slash on the base URL.
    pub fn new(base_url: &str, hook_path: &str, token: String) -> Self {
        Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), hook_path),
            token,
            client: reqwest::Client::new(),
        }
    }

    /// Resolved webhook endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST one payload. Any 2xx (202 Accepted included) is success.
    pub async fn post(&self, payload: &HookPayload) -> Result<(), HookError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(payload)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(HookError::Unreachable)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(HookError::AuthRejected(status));
        }

        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(BODY_SNIPPET_LEN)
            .collect();

        Err(HookError::BadStatus { status, body })
    }
}

#[async_trait]
impl TranscriptSink for HookClient {
    async fn deliver(&self, payload: &HookPayload) -> Result<(), HookError> {
        self.post(payload).await
    }
}
