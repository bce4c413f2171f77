//! Text-to-speech (TTS) module for voice replies.
//!
//! Trait-based abstraction over TTS services, with an implementation for
//! OpenAI and OpenAI-compatible providers.

mod openai;
mod traits;

pub use openai::OpenAiSynthesizer;
pub use traits::{AudioFormat, SpeechSynthesizer, SynthesisError, SynthesisOptions};

use std::sync::Arc;

/// Create a speech synthesizer based on the provider name.
///
/// # Arguments
/// * `provider` - Provider name: "openai" or "compatible"
/// * `api_key` - API key for the provider
/// * `model` - Optional model name
/// * `voice` - Optional default voice ID
/// * `base_url` - Optional base URL for OpenAI-compatible providers
pub fn create_synthesizer(
    provider: &str,
    api_key: &str,
    model: Option<&str>,
    voice: Option<&str>,
    base_url: Option<&str>,
) -> anyhow::Result<Arc<dyn SpeechSynthesizer>> {
    match provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAiSynthesizer::new(
            api_key.to_string(),
            model.map(ToString::to_string),
            voice.map(ToString::to_string),
        ))),
        // OpenAI-compatible providers with custom base URL
        "compatible" | "openai-compatible" => {
            let url = base_url.ok_or_else(|| {
                anyhow::anyhow!("base_url is required for 'compatible' TTS provider")
            })?;
            Ok(Arc::new(OpenAiSynthesizer::with_base_url(
                api_key.to_string(),
                url,
                model.map(ToString::to_string),
                voice.map(ToString::to_string),
            )))
        }
        _ => anyhow::bail!("Unsupported TTS provider: {provider}. Supported: openai, compatible"),
    }
}
