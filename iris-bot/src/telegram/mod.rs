//! Telegram transport adapter.
//!
//! Long-polls the Bot API for updates, maps photo/text/voice messages to
//! inbound events, and delivers the dispatcher's outcomes back as text
//! messages and voice notes.

use crate::dispatch::Dispatcher;
use crate::event::{DispatchOutcome, EventKind, InboundEvent};
use iris_common::logging::generate_trace_id;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;

/// Greeting for `/start`.
const START_TEXT: &str = "Hi! I'm Iris, your vision assistant.\n\
    Send me an image, then ask a question or request a description.\n\
    You can also send voice messages.";

/// Instructions for `/help`.
const HELP_TEXT: &str = "Step 1: Send me an image\n\
    Step 2: Ask a question or request a description, by text or voice\n\
    I'll reply with text and a voice note.";

/// Fallback reply when an event task fails unexpectedly.
const MSG_SOMETHING_WRONG: &str = "Something went wrong. Try again later.";

/// Supplementary notice when the voice reply could not be delivered.
const MSG_VOICE_UNAVAILABLE: &str = "(voice reply unavailable)";

/// Telegram message length limit.
const MAX_MESSAGE_LEN: usize = 4096;

/// Pass-through commands handled by the transport itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
}

/// One update parsed down to what dispatch needs.
#[derive(Debug, Clone)]
struct ParsedMessage {
    user_id: i64,
    chat_id: i64,
    username: Option<String>,
    payload: UpdatePayload,
}

/// Message payload kinds the bot understands.
#[derive(Debug, Clone)]
enum UpdatePayload {
    Text(String),
    Photo { file_id: String },
    Voice { file_id: String },
}

/// Telegram channel - long-polls the Bot API for updates.
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// Create a new Telegram channel.
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot_token, file_path
        )
    }

    fn is_user_allowed(&self, identity: &str) -> bool {
        self.allowed_users.iter().any(|u| u == "*" || u == identity)
    }

    fn is_any_user_allowed<'a, I>(&self, identities: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        identities.into_iter().any(|id| self.is_user_allowed(id))
    }

    /// Download a file from Telegram by its `file_id`.
    async fn download_file(&self, file_id: &str) -> anyhow::Result<Vec<u8>> {
        // Step 1: Get the file path via getFile API
        let url = self.api_url("getFile");
        let body = serde_json::json!({ "file_id": file_id });

        let resp = self.client.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram getFile failed: {err}");
        }

        let data: serde_json::Value = resp.json().await?;
        let file_path = data
            .get("result")
            .and_then(|r| r.get("file_path"))
            .and_then(|p| p.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing file_path in getFile response"))?;

        // Step 2: Download the file
        let download_url = self.file_url(file_path);
        let file_resp = self.client.get(&download_url).send().await?;

        if !file_resp.status().is_success() {
            anyhow::bail!(
                "Failed to download file from Telegram: {}",
                file_resp.status()
            );
        }

        let bytes = file_resp.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Send a text message, split into chunks within the API limit.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk
            });

            let resp = self
                .client
                .post(self.api_url("sendMessage"))
                .json(&body)
                .send()
                .await?;

            if !resp.status().is_success() {
                let err = resp.text().await.unwrap_or_default();
                anyhow::bail!("Telegram sendMessage failed: {err}");
            }
        }

        Ok(())
    }

    /// Send a voice note from in-memory bytes.
    pub async fn send_voice(
        &self,
        chat_id: i64,
        file_bytes: Vec<u8>,
        format: &str,
    ) -> anyhow::Result<()> {
        let filename = format!("voice.{format}");
        let part = Part::bytes(file_bytes).file_name(filename.clone());

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("voice", part);

        let resp = self
            .client
            .post(self.api_url("sendVoice"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("Telegram sendVoice failed: {err}");
        }

        tracing::info!(chat_id, filename = %filename, "Telegram voice sent");
        Ok(())
    }

    /// Long-poll for updates and dispatch each message on its own task.
    pub async fn run(self: Arc<Self>, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
        let mut offset: i64 = 0;

        tracing::info!("Telegram channel listening for messages...");

        loop {
            let url = self.api_url("getUpdates");
            let body = serde_json::json!({
                "offset": offset,
                "timeout": 30,
                "allowed_updates": ["message"]
            });

            let resp = match self.client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Telegram poll error: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            let data: serde_json::Value = match resp.json().await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Telegram parse error: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            let Some(results) = data.get("result").and_then(serde_json::Value::as_array) else {
                continue;
            };

            for update in results {
                if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64) {
                    offset = uid + 1;
                }

                let Some(message) = update.get("message") else {
                    continue;
                };

                let Some(parsed) = parse_message(message) else {
                    continue;
                };

                let user_id_str = parsed.user_id.to_string();
                let mut identities = vec![user_id_str.as_str()];
                if let Some(ref name) = parsed.username {
                    identities.push(name.as_str());
                }
                if !self.is_any_user_allowed(identities) {
                    tracing::warn!(
                        user_id = parsed.user_id,
                        "Telegram: ignoring message from unauthorized user"
                    );
                    continue;
                }

                // Commands are answered inline; everything else gets its own
                // task so a slow inference never stalls other users.
                if let UpdatePayload::Text(ref text) = parsed.payload {
                    if let Some(command) = parse_command(text) {
                        let reply = match command {
                            Command::Start => START_TEXT,
                            Command::Help => HELP_TEXT,
                        };
                        if let Err(e) = self.send_text(parsed.chat_id, reply).await {
                            tracing::error!("Failed to answer command: {e}");
                        }
                        continue;
                    }
                }

                let channel = self.clone();
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    let chat_id = parsed.chat_id;
                    if let Err(e) = channel.handle_message(parsed, dispatcher).await {
                        tracing::error!(chat_id, error = %e, "Event handling failed");
                        if let Err(e) = channel.send_text(chat_id, MSG_SOMETHING_WRONG).await {
                            tracing::error!(chat_id, error = %e, "Failed to send failure notice");
                        }
                    }
                });
            }
        }
    }

    /// Resolve one parsed message to an event, dispatch it, and deliver the
    /// outcome. Text is delivered before voice; a failed voice send after a
    /// delivered text reply is reported, never silently dropped.
    async fn handle_message(
        &self,
        parsed: ParsedMessage,
        dispatcher: Arc<Dispatcher>,
    ) -> anyhow::Result<()> {
        let trace_id = generate_trace_id();
        let ParsedMessage {
            user_id,
            chat_id,
            payload,
            ..
        } = parsed;

        let kind = match payload {
            UpdatePayload::Text(text) => {
                tracing::info!(trace_id = %trace_id, user_id, chat_id, message_type = "text", "Message received");
                EventKind::Text(text)
            }
            UpdatePayload::Photo { file_id } => {
                let bytes = self.download_file(&file_id).await?;
                tracing::info!(trace_id = %trace_id, user_id, chat_id, message_type = "photo", size_bytes = bytes.len(), "Message received");
                EventKind::Image(bytes)
            }
            UpdatePayload::Voice { file_id } => {
                let bytes = self.download_file(&file_id).await?;
                tracing::info!(trace_id = %trace_id, user_id, chat_id, message_type = "voice", size_bytes = bytes.len(), "Message received");
                EventKind::Voice(bytes)
            }
        };

        match dispatcher.dispatch(InboundEvent::new(user_id, chat_id, kind)).await {
            DispatchOutcome::ImageStored(msg) | DispatchOutcome::Rejected(msg) => {
                self.send_text(chat_id, &msg).await?;
            }
            DispatchOutcome::Reply(reply) => {
                self.send_text(chat_id, &reply.text).await?;
                if let Some(clip) = reply.speech {
                    if let Err(e) = self.send_voice(chat_id, clip.data, &clip.format).await {
                        tracing::warn!(trace_id = %trace_id, chat_id, error = %e, "Voice reply delivery failed");
                        self.send_text(chat_id, MSG_VOICE_UNAVAILABLE).await?;
                    }
                }
            }
        }

        Ok(())
    }
}

/// Parse a bot command out of message text.
fn parse_command(text: &str) -> Option<Command> {
    let first = text.trim().split_whitespace().next()?;
    // Commands may carry a bot-name suffix in groups: "/help@iris_bot"
    let name = first.split('@').next().unwrap_or(first);
    match name {
        "/start" => Some(Command::Start),
        "/help" => Some(Command::Help),
        _ => None,
    }
}

/// Parse a Telegram message object into the payload dispatch understands.
fn parse_message(message: &serde_json::Value) -> Option<ParsedMessage> {
    let chat_id = message.get("chat")?.get("id")?.as_i64()?;
    let from = message.get("from")?;
    let user_id = from.get("id")?.as_i64()?;
    let username = from
        .get("username")
        .and_then(|u| u.as_str())
        .map(String::from);

    let payload = if let Some(text) = message.get("text").and_then(|v| v.as_str()) {
        UpdatePayload::Text(text.to_string())
    } else if let Some(photos) = message.get("photo").and_then(serde_json::Value::as_array) {
        // The photo array is ordered smallest to largest; take the largest.
        let file_id = photos
            .last()?
            .get("file_id")?
            .as_str()?
            .to_string();
        UpdatePayload::Photo { file_id }
    } else if let Some(voice) = message.get("voice") {
        let file_id = voice.get("file_id")?.as_str()?.to_string();
        UpdatePayload::Voice { file_id }
    } else {
        return None;
    };

    Some(ParsedMessage {
        user_id,
        chat_id,
        username,
        payload,
    })
}

/// Split a message into chunks that fit within Telegram's limit.
fn split_message(message: &str, max_len: usize) -> Vec<String> {
    if message.len() <= max_len {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = message;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let chunk = &remaining[..max_len];
        let split_pos = chunk
            .rfind("\n\n")
            .or_else(|| chunk.rfind('\n'))
            .or_else(|| chunk.rfind(". "))
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(max_len);

        let actual_split = if split_pos == 0 { max_len } else { split_pos };

        chunks.push(remaining[..actual_split].to_string());
        remaining = remaining[actual_split..].trim_start();
    }

    chunks
}
