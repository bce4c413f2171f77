//! Iris Common - Shared configuration, logging, and error types for the
//! Iris visual assistant bot.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    Config, ObservabilityConfig, ReplyConfig, SttConfig, TelegramConfig, TtsConfig, VisionConfig,
};
pub use error::{Error, Result};
pub use logging::init_logging;
