//! Configuration management for the Iris bot.
//!
//! Configuration lives in a single JSON file at `~/.iris/config.json`.
//! Every section has serde defaults, so an empty file (or no file at all)
//! yields a fully-formed configuration.
//!
//! # Configuration Priority
//!
//! 1. Explicit config file values
//! 2. Environment variables
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `TELEGRAM_BOT_TOKEN` → telegram.bot_token
//! - `HF_API_TOKEN` → vision.api_key
//! - `OPENAI_API_KEY` → stt.api_key, tts.api_key
//! - `IRIS_LOG_LEVEL` → observability.log_level

use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".iris"),
        |dirs| dirs.home_dir().join(".iris"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Telegram
// ============================================================================

/// Telegram transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather
    #[serde(default)]
    pub bot_token: String,

    /// Usernames or numeric user IDs allowed to talk to the bot.
    /// `"*"` allows everyone.
    #[serde(default = "default_allowed_users")]
    pub allowed_users: Vec<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            allowed_users: default_allowed_users(),
        }
    }
}

fn default_allowed_users() -> Vec<String> {
    vec!["*".into()]
}

// ============================================================================
// Vision inference
// ============================================================================

/// Vision inference (captioning + VQA) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Provider name: "huggingface" or "compatible"
    #[serde(default = "default_vision_provider")]
    pub provider: String,

    /// API token for the inference endpoint
    #[serde(default)]
    pub api_key: String,

    /// Captioning model identifier
    #[serde(default = "default_caption_model")]
    pub caption_model: String,

    /// Visual question answering model identifier
    #[serde(default = "default_vqa_model")]
    pub vqa_model: String,

    /// Base URL override for self-hosted inference servers
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            provider: default_vision_provider(),
            api_key: String::new(),
            caption_model: default_caption_model(),
            vqa_model: default_vqa_model(),
            base_url: None,
        }
    }
}

fn default_vision_provider() -> String {
    "huggingface".into()
}

fn default_caption_model() -> String {
    "Salesforce/blip-image-captioning-base".into()
}

fn default_vqa_model() -> String {
    "Salesforce/blip-vqa-base".into()
}

// ============================================================================
// Speech
// ============================================================================

/// Speech-to-text configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// Provider name: "openai", "whisper", or "compatible"
    #[serde(default = "default_speech_provider")]
    pub provider: String,

    /// API key for the provider
    #[serde(default)]
    pub api_key: String,

    /// Model name (default: whisper-1)
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL for OpenAI-compatible providers
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            provider: default_speech_provider(),
            api_key: String::new(),
            model: None,
            base_url: None,
        }
    }
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Provider name: "openai" or "compatible"
    #[serde(default = "default_speech_provider")]
    pub provider: String,

    /// API key for the provider
    #[serde(default)]
    pub api_key: String,

    /// Model name (default: tts-1)
    #[serde(default)]
    pub model: Option<String>,

    /// Default voice ID
    #[serde(default)]
    pub voice: Option<String>,

    /// Base URL for OpenAI-compatible providers
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: default_speech_provider(),
            api_key: String::new(),
            model: None,
            voice: None,
            base_url: None,
        }
    }
}

fn default_speech_provider() -> String {
    "openai".into()
}

// ============================================================================
// Replies
// ============================================================================

/// Reply rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    /// Language tag for synthesized speech (e.g. "en")
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

fn default_language() -> String {
    "en".into()
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Top-level config
// ============================================================================

/// Top-level Iris configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Telegram transport
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Vision inference backends
    #[serde(default)]
    pub vision: VisionConfig,

    /// Speech-to-text backend
    #[serde(default)]
    pub stt: SttConfig,

    /// Text-to-speech backend
    #[serde(default)]
    pub tts: TtsConfig,

    /// Reply rendering
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Ok(key) = std::env::var("HF_API_TOKEN") {
            self.vision.api_key = key;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if self.stt.api_key.is_empty() {
                self.stt.api_key = key.clone();
            }
            if self.tts.api_key.is_empty() {
                self.tts.api_key = key;
            }
        }
        if let Ok(level) = std::env::var("IRIS_LOG_LEVEL") {
            self.observability.log_level = level;
        }
    }

    /// Validate that the configuration can actually drive the bot.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            return Err(Error::Config(
                "telegram.bot_token is required (or set TELEGRAM_BOT_TOKEN)".into(),
            ));
        }
        Ok(())
    }
}
