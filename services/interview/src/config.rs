//! Application Configuration Module
//!
//! Centralizes the configuration for the interview service. Settings are
//! loaded from environment variables into a single struct passed through the
//! application.

use std::env;
use tracing::Level;

/// Model used for question generation, scoring, and report synthesis.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub answer_seconds: u64,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `OPENAI_API_KEY`: Secret key for the OpenAI API. Required unless running with `--offline`.
    // *   `CHAT_MODEL`: (Optional) Model for the interviewer capabilities. Defaults to "gpt-4o-mini".
    // *   `ANSWER_TIME_LIMIT_SECS`: (Optional) Per-question answer budget. Defaults to 160.
    // *   `RUST_LOG`: (Optional) Logging level. Defaults to "INFO".
    pub fn from_env(offline: bool) -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if not present.
        dotenvy::dotenv().ok();

        let openai_api_key = env::var("OPENAI_API_KEY").ok();
        let chat_model = env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());

        let answer_seconds = match env::var("ANSWER_TIME_LIMIT_SECS") {
            Ok(value) => value.parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                name: "ANSWER_TIME_LIMIT_SECS",
                value: value.clone(),
            })?,
            Err(_) => viva_core::timer::DEFAULT_ANSWER_SECONDS,
        };
        if answer_seconds == 0 {
            return Err(ConfigError::InvalidVar {
                name: "ANSWER_TIME_LIMIT_SECS",
                value: answer_seconds.to_string(),
            });
        }

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        if !offline && openai_api_key.is_none() {
            return Err(ConfigError::MissingVar(
                "OPENAI_API_KEY must be set unless --offline is used".to_string(),
            ));
        }

        Ok(Self {
            openai_api_key,
            chat_model,
            answer_seconds,
            log_level,
        })
    }
}
