//! Speech-to-text (STT) module for voice note transcription.
//!
//! Trait-based abstraction over STT services, with a Whisper-API
//! implementation for OpenAI and OpenAI-compatible providers.

mod traits;
mod whisper;

pub use traits::{TranscribeError, Transcriber};
pub use whisper::WhisperTranscriber;

use std::sync::Arc;

/// Create a transcriber based on the provider name.
///
/// # Arguments
/// * `provider` - Provider name: "openai", "whisper", or "compatible"
/// * `api_key` - API key for the provider
/// * `model` - Optional model name
/// * `base_url` - Optional base URL for OpenAI-compatible providers
pub fn create_transcriber(
    provider: &str,
    api_key: &str,
    model: Option<&str>,
    base_url: Option<&str>,
) -> anyhow::Result<Arc<dyn Transcriber>> {
    match provider.to_lowercase().as_str() {
        "openai" | "whisper" => Ok(Arc::new(WhisperTranscriber::new(
            api_key.to_string(),
            model.map(ToString::to_string),
        ))),
        // Generic OpenAI-compatible provider (requires base_url)
        "compatible" | "openai-compatible" => {
            let url = base_url.ok_or_else(|| {
                anyhow::anyhow!("base_url is required for 'compatible' STT provider")
            })?;
            Ok(Arc::new(WhisperTranscriber::with_base_url(
                api_key.to_string(),
                url,
                model.map(ToString::to_string),
            )))
        }
        _ => anyhow::bail!(
            "Unsupported STT provider: {provider}. Supported: openai, whisper, compatible"
        ),
    }
}
