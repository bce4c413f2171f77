//! Vision inference module: image captioning and visual question answering.
//!
//! Trait-based abstraction over vision backends, with a Hugging Face
//! Inference API implementation.

mod huggingface;
mod traits;

pub use huggingface::HuggingFaceVision;
pub use traits::{InferenceError, VisionInference};

use std::sync::Arc;

/// Create a vision backend based on the provider name.
///
/// # Arguments
/// * `provider` - Provider name: "huggingface" or "compatible"
/// * `api_key` - API token for the inference endpoint
/// * `caption_model` - Captioning model identifier
/// * `vqa_model` - VQA model identifier
/// * `base_url` - Optional base URL for self-hosted inference servers
pub fn create_vision(
    provider: &str,
    api_key: &str,
    caption_model: &str,
    vqa_model: &str,
    base_url: Option<&str>,
) -> anyhow::Result<Arc<dyn VisionInference>> {
    match provider.to_lowercase().as_str() {
        "huggingface" | "hf" => Ok(Arc::new(HuggingFaceVision::new(
            api_key.to_string(),
            caption_model.to_string(),
            vqa_model.to_string(),
        ))),
        // Self-hosted inference server speaking the same protocol
        "compatible" => {
            let url = base_url.ok_or_else(|| {
                anyhow::anyhow!("base_url is required for 'compatible' vision provider")
            })?;
            Ok(Arc::new(HuggingFaceVision::with_base_url(
                api_key.to_string(),
                url,
                caption_model.to_string(),
                vqa_model.to_string(),
            )))
        }
        _ => anyhow::bail!(
            "Unsupported vision provider: {provider}. Supported: huggingface, compatible"
        ),
    }
}
