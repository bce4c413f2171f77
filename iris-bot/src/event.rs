//! Event types for the dispatch pipeline.

use serde::{Deserialize, Serialize};

/// One inbound user action, as delivered by the transport.
///
/// Transient: constructed per transport update and discarded after dispatch.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Stable user identity from the transport
    pub user_id: i64,
    /// Chat to answer into
    pub chat_id: i64,
    /// What the user sent
    pub kind: EventKind,
}

/// Payload of an inbound event.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// Encoded still-image bytes (any parseable format)
    Image(Vec<u8>),
    /// Typed text
    Text(String),
    /// Voice note in a compressed container (Opus-in-Ogg from Telegram)
    Voice(Vec<u8>),
}

impl InboundEvent {
    pub fn new(user_id: i64, chat_id: i64, kind: EventKind) -> Self {
        Self {
            user_id,
            chat_id,
            kind,
        }
    }

    /// Check if this is a voice event.
    pub const fn is_voice(&self) -> bool {
        matches!(self.kind, EventKind::Voice(_))
    }

    /// Check if this is an image event.
    pub const fn is_image(&self) -> bool {
        matches!(self.kind, EventKind::Image(_))
    }
}

/// A synthesized voice clip ready for playback by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechClip {
    /// Encoded audio bytes
    pub data: Vec<u8>,
    /// Container format hint for the transport (e.g. "ogg")
    pub format: String,
}

/// A dual-channel reply: text plus synthesized speech.
///
/// `speech` is `None` only when synthesis failed after a successful
/// inference; the text channel is delivered regardless.
#[derive(Debug, Clone)]
pub struct DualResponse {
    /// Rendered text reply
    pub text: String,
    /// Voice-note rendering of the same answer
    pub speech: Option<SpeechClip>,
}

/// Terminal result of dispatching one inbound event.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// An image was decoded and stored; reply with an acknowledgment.
    ImageStored(String),
    /// A vision query succeeded; reply on both channels.
    Reply(DualResponse),
    /// A recoverable failure; reply with a single user-visible message.
    Rejected(String),
}
