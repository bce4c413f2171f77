//! Speech synthesizer trait definition.

use async_trait::async_trait;
use thiserror::Error;

/// Speech synthesis failure.
#[derive(Debug, Error)]
#[error("speech synthesis failed: {0}")]
pub struct SynthesisError(pub String);

/// Output audio format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    /// Opus (the container Telegram voice notes use)
    #[default]
    Opus,
    /// MP3 audio (most compatible)
    Mp3,
    /// WAV audio (uncompressed)
    Wav,
}

impl AudioFormat {
    /// Get the file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Opus => "ogg",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }

    /// Get the MIME type for this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Opus => "audio/ogg",
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
        }
    }
}

/// Options for a synthesis request.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Language tag for the spoken reply (e.g. "en")
    pub language: String,
    /// Voice ID override; provider default when absent
    pub voice: Option<String>,
    /// Output container format
    pub format: AudioFormat,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            voice: None,
            format: AudioFormat::default(),
        }
    }
}

/// Text-to-speech synthesis.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize speech audio for the given text.
    async fn synthesize(
        &self,
        text: &str,
        options: &SynthesisOptions,
    ) -> Result<Vec<u8>, SynthesisError>;

    /// Get the provider name.
    fn provider_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_extension_and_mime() {
        assert_eq!(AudioFormat::Opus.extension(), "ogg");
        assert_eq!(AudioFormat::Opus.mime_type(), "audio/ogg");
        assert_eq!(AudioFormat::Mp3.extension(), "mp3");
        assert_eq!(AudioFormat::Wav.mime_type(), "audio/wav");
    }

    #[test]
    fn default_options() {
        let opts = SynthesisOptions::default();
        assert_eq!(opts.language, "en");
        assert_eq!(opts.format, AudioFormat::Opus);
        assert!(opts.voice.is_none());
    }
}
