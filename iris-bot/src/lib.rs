//! Iris Bot - a Telegram visual assistant.
//!
//! Users upload an image, then ask about it by text or voice. Questions
//! (trailing `?`) go to a visual-question-answering model; anything else
//! goes to a captioning model. Every successful answer is delivered twice:
//! as text and as a synthesized voice note.
//!
//! ## Architecture
//!
//! ```text
//! Telegram ─ getUpdates ─→ TelegramChannel ─→ Dispatcher ─→ VisionInference
//!                                │               │  │
//!                                │          SessionStore  Transcriber
//!                                │               │
//! User ←─ sendMessage/sendVoice ─┴── DualResponse ←─ SpeechSynthesizer
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod classify;
pub mod dispatch;
pub mod event;
pub mod media;
pub mod session;
pub mod stt;
pub mod telegram;
pub mod tts;
pub mod vision;

// Re-export commonly used types
pub use classify::{classify, Intent};
pub use dispatch::Dispatcher;
pub use event::{DispatchOutcome, DualResponse, EventKind, InboundEvent, SpeechClip};
pub use media::{MediaError, SessionImage, Waveform};
pub use session::SessionStore;
pub use stt::{create_transcriber, TranscribeError, Transcriber, WhisperTranscriber};
pub use telegram::TelegramChannel;
pub use tts::{
    create_synthesizer, AudioFormat, OpenAiSynthesizer, SpeechSynthesizer, SynthesisError,
    SynthesisOptions,
};
pub use vision::{create_vision, HuggingFaceVision, InferenceError, VisionInference};

use iris_common::Config;
use std::sync::Arc;

/// Build the dispatcher from configuration.
pub fn build_dispatcher(config: &Config) -> anyhow::Result<Arc<Dispatcher>> {
    let transcriber = create_transcriber(
        &config.stt.provider,
        &config.stt.api_key,
        config.stt.model.as_deref(),
        config.stt.base_url.as_deref(),
    )?;

    let synthesizer = create_synthesizer(
        &config.tts.provider,
        &config.tts.api_key,
        config.tts.model.as_deref(),
        config.tts.voice.as_deref(),
        config.tts.base_url.as_deref(),
    )?;

    let vision = create_vision(
        &config.vision.provider,
        &config.vision.api_key,
        &config.vision.caption_model,
        &config.vision.vqa_model,
        config.vision.base_url.as_deref(),
    )?;

    let synthesis = SynthesisOptions {
        language: config.reply.language.clone(),
        voice: config.tts.voice.clone(),
        format: AudioFormat::Opus,
    };

    Ok(Arc::new(Dispatcher::new(
        SessionStore::new(),
        transcriber,
        synthesizer,
        vision,
        synthesis,
    )))
}

/// Start the bot: wire the dispatcher to the Telegram channel and poll
/// until the process is stopped.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let dispatcher = build_dispatcher(config)?;
    let channel = Arc::new(TelegramChannel::new(
        config.telegram.bot_token.clone(),
        config.telegram.allowed_users.clone(),
    ));

    channel.run(dispatcher).await
}
