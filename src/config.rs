//! Process configuration, read from the environment.
//!
//! Three variables are required: STT_URL, OPENCLAW_URL and
//! OPENCLAW_HOOK_TOKEN. Everything else has a default. Missing or malformed
//! values fail startup before the watch loop begins.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default transcription model sent to the STT endpoint
pub const DEFAULT_STT_MODEL: &str = "deepdml/faster-whisper-large-v3-turbo-ct2";

/// Default directory watched for audio recordings
pub const DEFAULT_WATCH_DIR: &str = "/data/voice";

/// Default webhook path appended to OPENCLAW_URL
pub const DEFAULT_HOOK_PATH: &str = "/hooks/agent";

/// Errors raised while reading configuration from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{var} is not a valid {expected}: {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Resolved configuration for one process lifetime
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory watched for incoming recordings
    pub watch_dir: PathBuf,

    /// STT endpoint receiving the multipart upload
    pub stt_url: String,

    /// Model name passed along with the upload
    pub stt_model: String,

    /// Base URL of the OpenClaw gateway
    pub openclaw_url: String,

    /// Webhook path appended to the base URL
    pub hook_path: String,

    /// Bearer token for the webhook
    pub hook_token: String,

    /// Directory sweep interval
    pub poll_interval: Duration,

    /// Minimum idle time before a file is considered fully written
    pub min_file_age: Duration,

    /// Delete the source file after a delivered transcript
    pub delete_after_transcribe: bool,

    /// Skip filesystem notifications and poll only (NFS/CephFS mounts)
    pub force_poll: bool,

    /// Worker pool size for concurrent file processing
    pub max_concurrent: usize,

    /// How long a failed, unchanged file stays ineligible for re-dispatch.
    /// Zero means such a file is retried only once its signature changes.
    pub failed_retry: Duration,

    /// Bound on waiting for in-flight work during shutdown
    pub shutdown_grace: Duration,
}

impl Config {
    /// Read configuration from the environment, failing on the first
    /// missing required variable or unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = |var: &str| std::env::var(var).ok();

        Ok(Self {
            watch_dir: env("WATCH_DIR")
                .unwrap_or_else(|| DEFAULT_WATCH_DIR.to_string())
                .into(),
            stt_url: required("STT_URL")?,
            stt_model: env("STT_MODEL").unwrap_or_else(|| DEFAULT_STT_MODEL.to_string()),
            openclaw_url: required("OPENCLAW_URL")?,
            hook_path: env("OPENCLAW_HOOK_PATH").unwrap_or_else(|| DEFAULT_HOOK_PATH.to_string()),
            hook_token: required("OPENCLAW_HOOK_TOKEN")?,
            poll_interval: parse_secs("POLL_INTERVAL", env("POLL_INTERVAL"), 5)?,
            min_file_age: parse_secs("MIN_FILE_AGE", env("MIN_FILE_AGE"), 5)?,
            delete_after_transcribe: parse_flag(env("DELETE_AFTER_TRANSCRIBE"), true),
            force_poll: parse_flag(env("WATCH_FORCE_POLL"), false),
            max_concurrent: parse_count("MAX_CONCURRENT", env("MAX_CONCURRENT"), 2)?,
            failed_retry: parse_secs("FAILED_RETRY_SECS", env("FAILED_RETRY_SECS"), 300)?,
            shutdown_grace: parse_secs("SHUTDOWN_GRACE_SECS", env("SHUTDOWN_GRACE_SECS"), 30)?,
        })
    }

    /// Full webhook endpoint: base URL with any trailing slash trimmed,
    /// plus the hook path.
    pub fn hook_endpoint(&self) -> String {
        format!("{}{}", self.openclaw_url.trim_end_matches('/'), self.hook_path)
    }
}

/// Log filter for startup: RUST_LOG wins, LOG_LEVEL is the container-facing
/// knob, "info" is the floor.
pub fn log_filter() -> String {
    std::env::var("LOG_LEVEL")
        .map(|level| level.to_lowercase())
        .unwrap_or_else(|_| "info".to_string())
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(var)),
    }
}

fn parse_secs(
    var: &'static str,
    raw: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(Duration::from_secs(default)),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid {
                var,
                expected: "number of seconds",
                value,
            }),
    }
}

fn parse_count(
    var: &'static str,
    raw: Option<String>,
    default: usize,
) -> Result<usize, ConfigError> {
    let count = match raw {
        None => default,
        Some(value) => value.trim().parse::<usize>().map_err(|_| ConfigError::Invalid {
            var,
            expected: "positive integer",
            value,
        })?,
    };

    if count == 0 {
        return Err(ConfigError::Invalid {
            var,
            expected: "positive integer",
            value: "0".to_string(),
        });
    }

    Ok(count)
}

/// "true" (any case) is true, anything else present is false.
fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw {
        Some(value) => value.trim().eq_ignore_ascii_case("true"),
        None => default,
    }
}
