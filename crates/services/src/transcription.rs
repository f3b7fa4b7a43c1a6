use std::env;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use qa_core::model::Language;

use crate::error::{TranscriptionConfigError, TranscriptionError};

pub const DEFAULT_STT_URL: &str = "https://api.sarvam.ai/speech-to-text";
pub const DEFAULT_STT_MODEL: &str = "saarika:v2.5";

/// Speech-to-text collaborator: audio bytes in, transcript out.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one recording.
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionError` when the backend is unavailable or its
    /// answer is unusable.
    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        language: Language,
    ) -> Result<String, TranscriptionError>;
}

#[derive(Clone, Debug)]
pub struct TranscriptionConfig {
    pub url: Url,
    pub api_key: String,
    pub model: String,
}

impl TranscriptionConfig {
    /// Read `QA_STT_API_KEY`, `QA_STT_URL` and `QA_STT_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionConfigError::InvalidUrl` for a malformed URL.
    pub fn from_env() -> Result<Option<Self>, TranscriptionConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `TranscriptionConfigError::InvalidUrl` for a malformed URL.
    pub fn from_vars<F>(lookup: F) -> Result<Option<Self>, TranscriptionConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(api_key) = lookup("QA_STT_API_KEY") else {
            return Ok(None);
        };
        if api_key.trim().is_empty() {
            return Ok(None);
        }
        let url = lookup("QA_STT_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STT_URL.into());
        let model = lookup("QA_STT_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STT_MODEL.into());
        Ok(Some(Self {
            url: Url::parse(url.trim())?,
            api_key: api_key.trim().to_owned(),
            model,
        }))
    }
}

/// HTTP transcriber for the Sarvam speech-to-text endpoint.
#[derive(Clone)]
pub struct SarvamTranscriber {
    client: Client,
    config: Option<TranscriptionConfig>,
}

impl SarvamTranscriber {
    #[must_use]
    pub fn new(config: Option<TranscriptionConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// # Errors
    ///
    /// Returns `TranscriptionConfigError` for malformed settings.
    pub fn from_env() -> Result<Self, TranscriptionConfigError> {
        Ok(Self::new(TranscriptionConfig::from_env()?))
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl Transcriber for SarvamTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
        language: Language,
    ) -> Result<String, TranscriptionError> {
        let config = self
            .config
            .as_ref()
            .ok_or(TranscriptionError::Disabled)?;

        let file = Part::bytes(audio.to_vec())
            .file_name(upload_file_name(mime_type))
            .mime_str(mime_type)?;
        let form = Form::new()
            .part("file", file)
            .text("model", config.model.clone())
            .text("language_code", language.bcp47_code());

        debug!(
            bytes = audio.len(),
            mime_type,
            language = language.bcp47_code(),
            "sending audio for transcription"
        );
        let response = self
            .client
            .post(config.url.clone())
            .header("api-subscription-key", &config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::HttpStatus(status, body));
        }

        let body: SttResponse = response.json().await?;
        body.transcript.ok_or(TranscriptionError::MissingTranscript)
    }
}

fn upload_file_name(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    match essence {
        "audio/webm" => "recording.webm",
        "audio/ogg" => "recording.ogg",
        "audio/mpeg" | "audio/mp3" => "recording.mp3",
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "recording.m4a",
        "audio/flac" => "recording.flac",
        _ => "recording.wav",
    }
}

#[derive(Debug, Deserialize)]
struct SttResponse {
    transcript: Option<String>,
}
