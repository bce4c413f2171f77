//! Vision inference trait definition.

use crate::media::SessionImage;
use async_trait::async_trait;
use thiserror::Error;

/// Vision inference failure.
#[derive(Debug, Error)]
#[error("vision inference failed: {0}")]
pub struct InferenceError(pub String);

/// The two visual-understanding operations.
///
/// `answer` passes the backend's text through unmodified; whether an
/// out-of-distribution question yields "I don't know" or a best-effort guess
/// is the model's business, not ours.
#[async_trait]
pub trait VisionInference: Send + Sync {
    /// Produce a free-form description of the image.
    async fn caption(&self, image: &SessionImage) -> Result<String, InferenceError>;

    /// Answer a question about the image.
    async fn answer(&self, image: &SessionImage, question: &str) -> Result<String, InferenceError>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;
}
