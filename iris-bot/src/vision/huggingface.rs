//! Hugging Face Inference API implementation of vision inference.
//!
//! Captioning posts the raw JPEG to an image-to-text model; question
//! answering posts `{"inputs": {"question", "image": <base64>}}` to a VQA
//! model.

use super::traits::{InferenceError, VisionInference};
use crate::media::{encode_jpeg, SessionImage};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

/// Hugging Face Inference API client for captioning + VQA.
pub struct HuggingFaceVision {
    api_key: String,
    client: Client,
    caption_model: String,
    vqa_model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct VqaResponse {
    answer: String,
}

impl HuggingFaceVision {
    /// Create a new client against the hosted inference endpoint.
    pub fn new(api_key: String, caption_model: String, vqa_model: String) -> Self {
        Self::with_base_url(
            api_key,
            "https://api-inference.huggingface.co",
            caption_model,
            vqa_model,
        )
    }

    /// Create with a custom base URL (self-hosted inference servers, tests).
    pub fn with_base_url(
        api_key: String,
        base_url: &str,
        caption_model: String,
        vqa_model: String,
    ) -> Self {
        Self {
            api_key,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            caption_model,
            vqa_model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{model}", self.base_url)
    }
}

#[async_trait]
impl VisionInference for HuggingFaceVision {
    async fn caption(&self, image: &SessionImage) -> Result<String, InferenceError> {
        let jpeg = encode_jpeg(image).map_err(|e| InferenceError(e.to_string()))?;

        let response = self
            .client
            .post(self.model_url(&self.caption_model))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "image/jpeg")
            .body(jpeg)
            .send()
            .await
            .map_err(|e| InferenceError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(InferenceError(format!(
                "caption model error ({status}): {error_text}"
            )));
        }

        let results: Vec<CaptionResponse> = response
            .json()
            .await
            .map_err(|e| InferenceError(e.to_string()))?;

        results
            .into_iter()
            .next()
            .map(|r| r.generated_text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| InferenceError("caption model returned no text".into()))
    }

    async fn answer(&self, image: &SessionImage, question: &str) -> Result<String, InferenceError> {
        let jpeg = encode_jpeg(image).map_err(|e| InferenceError(e.to_string()))?;

        let body = serde_json::json!({
            "inputs": {
                "question": question,
                "image": BASE64.encode(jpeg)
            }
        });

        let response = self
            .client
            .post(self.model_url(&self.vqa_model))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(InferenceError(format!(
                "VQA model error ({status}): {error_text}"
            )));
        }

        let results: Vec<VqaResponse> = response
            .json()
            .await
            .map_err(|e| InferenceError(e.to_string()))?;

        results
            .into_iter()
            .next()
            .map(|r| r.answer)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| InferenceError("VQA model returned no answer".into()))
    }

    fn provider_name(&self) -> &str {
        "huggingface"
    }
}
