//! Whisper-API transcriber implementation.
//!
//! Talks to the OpenAI audio transcription endpoint (or any compatible
//! server) with a multipart WAV upload.

use super::traits::{TranscribeError, Transcriber};
use crate::media::{waveform_to_wav, Waveform};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

/// Whisper API implementation of [`Transcriber`].
pub struct WhisperTranscriber {
    api_key: String,
    client: Client,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperTranscriber {
    /// Create a new client against the OpenAI endpoint.
    ///
    /// # Arguments
    /// * `api_key` - API key
    /// * `model` - Model name (default: "whisper-1")
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com", model)
    }

    /// Create with a custom base URL (for OpenAI-compatible providers).
    pub fn with_base_url(api_key: String, base_url: &str, model: Option<String>) -> Self {
        Self {
            api_key,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            model: model.unwrap_or_else(|| "whisper-1".to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, waveform: &Waveform) -> Result<String, TranscribeError> {
        let wav = waveform_to_wav(waveform).map_err(|e| TranscribeError::Service(e.to_string()))?;

        let part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscribeError::Service(e.to_string()))?;

        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let url = format!("{}/v1/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscribeError::Service(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Service(format!(
                "Whisper API error ({status}): {error_text}"
            )));
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Service(e.to_string()))?;

        let text = transcription.text.trim().to_string();
        if text.is_empty() {
            return Err(TranscribeError::Unintelligible);
        }

        tracing::debug!(
            chars = text.len(),
            duration_secs = f64::from(waveform.duration_secs()),
            "Voice note transcribed"
        );

        Ok(text)
    }

    fn provider_name(&self) -> &str {
        "whisper"
    }
}
