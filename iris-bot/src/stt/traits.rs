//! Transcriber trait definition.

use crate::media::Waveform;
use async_trait::async_trait;
use thiserror::Error;

/// Transcription failure.
///
/// `Unintelligible` means the engine understood the audio but produced no
/// confident text; `Service` is a transport or backend failure. The two
/// drive different user-facing messages.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("no confident transcription produced")]
    Unintelligible,

    #[error("transcription service error: {0}")]
    Service(String),
}

/// Speech-to-text over a normalized PCM waveform.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a waveform to text.
    async fn transcribe(&self, waveform: &Waveform) -> Result<String, TranscribeError>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;
}
