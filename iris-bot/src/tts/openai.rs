//! OpenAI TTS implementation.
//!
//! Uses the OpenAI Audio API for text-to-speech synthesis.

use super::traits::{AudioFormat, SpeechSynthesizer, SynthesisError, SynthesisOptions};
use async_trait::async_trait;
use reqwest::Client;

/// OpenAI TTS API implementation.
pub struct OpenAiSynthesizer {
    api_key: String,
    client: Client,
    model: String,
    default_voice: String,
    base_url: String,
}

impl OpenAiSynthesizer {
    /// Create a new OpenAI TTS client.
    ///
    /// # Arguments
    /// * `api_key` - API key
    /// * `model` - Model name (default: "tts-1")
    /// * `voice` - Default voice (default: "alloy")
    pub fn new(api_key: String, model: Option<String>, voice: Option<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com", model, voice)
    }

    /// Create with a custom base URL (for OpenAI-compatible providers).
    pub fn with_base_url(
        api_key: String,
        base_url: &str,
        model: Option<String>,
        voice: Option<String>,
    ) -> Self {
        Self {
            api_key,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            model: model.unwrap_or_else(|| "tts-1".to_string()),
            default_voice: voice.unwrap_or_else(|| "alloy".to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn format_to_response_format(format: AudioFormat) -> &'static str {
        match format {
            AudioFormat::Opus => "opus",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        options: &SynthesisOptions,
    ) -> Result<Vec<u8>, SynthesisError> {
        let voice = options.voice.as_deref().unwrap_or(&self.default_voice);
        let format = Self::format_to_response_format(options.format);

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": voice,
            "response_format": format
        });

        let url = format!("{}/v1/audio/speech", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError(format!(
                "TTS API error ({status}): {error_text}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError(e.to_string()))?;

        tracing::debug!(
            chars = text.len(),
            bytes = bytes.len(),
            language = %options.language,
            "Speech synthesized"
        );

        Ok(bytes.to_vec())
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}
