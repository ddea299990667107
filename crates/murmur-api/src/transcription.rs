//! Speech-to-text for stored voice notes.
//!
//! The provider sits behind the [`Transcriber`] trait so the HTTP client is
//! built once at startup and injected, and tests can swap in a fake.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::intake::StoredBlob;

pub const TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_TRANSCRIPTION_URL: &str = "https://api.openai.com/v1";
pub const FAILURE_PREFIX: &str = "Transcription failed: ";

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("could not read audio: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, blob: &StoredBlob) -> Result<String, TranscriptionError>;
}

/// OpenAI-compatible `/audio/transcriptions` client.
pub struct WhisperClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, blob: &StoredBlob) -> Result<String, TranscriptionError> {
        let audio = tokio::fs::read(blob.path()).await?;
        info!("Transcribing {} ({} bytes) via {}", blob.filename(), audio.len(), TRANSCRIPTION_MODEL);

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(blob.filename().to_string())
            .mime_str(blob.mime_type())?;
        let form = reqwest::multipart::Form::new()
            .text("model", TRANSCRIPTION_MODEL)
            .part("file", part);

        let mut request = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Provider { status, body });
        }

        let body = response.text().await?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body)
            .map_err(|e| TranscriptionError::MalformedResponse(e.to_string()))?;
        Ok(parsed.text)
    }
}

/// Result of the single transcription attempt made for a voice note.
/// Both variants are valid terminal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    Transcript(String),
    Failed(String),
}

impl TranscriptionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TranscriptionOutcome::Failed(_))
    }

    /// The value stored in the voice message's `transcription` column.
    pub fn into_text(self) -> String {
        match self {
            TranscriptionOutcome::Transcript(text) => text,
            TranscriptionOutcome::Failed(reason) => format!("{}{}", FAILURE_PREFIX, reason),
        }
    }
}

impl From<Result<String, TranscriptionError>> for TranscriptionOutcome {
    fn from(result: Result<String, TranscriptionError>) -> Self {
        match result {
            Ok(text) => TranscriptionOutcome::Transcript(text),
            Err(e) => TranscriptionOutcome::Failed(e.to_string()),
        }
    }
}

/// One attempt, no retry. Provider errors are absorbed into the outcome.
pub async fn transcribe_blob(transcriber: &dyn Transcriber, blob: &StoredBlob) -> TranscriptionOutcome {
    let outcome = TranscriptionOutcome::from(transcriber.transcribe(blob).await);
    if let TranscriptionOutcome::Failed(reason) = &outcome {
        warn!("Transcription of {} failed: {}", blob.filename(), reason);
    }
    outcome
}
