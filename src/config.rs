//! Configuration module for TrimChat.

use serde::Deserialize;
use std::path::Path;

use crate::{ChatError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins. Empty means permissive (development mode).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5050
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// JWT secret key shared with the auth service (must be set).
    #[serde(default)]
    pub jwt_secret: String,
}

/// Bot responder configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Whether the bot responder is enabled.
    #[serde(default = "default_bot_enabled")]
    pub enabled: bool,
    /// Mention token that addresses the bot inside a message.
    #[serde(default = "default_bot_trigger")]
    pub trigger: String,
    /// Base URL of the text-generation service.
    #[serde(default = "default_bot_endpoint")]
    pub endpoint: String,
    /// Model name passed to the text-generation service.
    #[serde(default = "default_bot_model")]
    pub model: String,
    /// Display name of the bot identity.
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Avatar URL of the bot identity.
    #[serde(default = "default_bot_avatar")]
    pub avatar: String,
    /// System persona prepended to every prompt.
    #[serde(default = "default_bot_persona")]
    pub persona: String,
    /// Connect timeout in seconds for the generation call.
    #[serde(default = "default_bot_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total timeout in seconds for the generation call.
    #[serde(default = "default_bot_total_timeout")]
    pub total_timeout_secs: u64,
}

fn default_bot_enabled() -> bool {
    true
}

fn default_bot_trigger() -> String {
    "@bot".to_string()
}

fn default_bot_endpoint() -> String {
    "https://text.pollinations.ai".to_string()
}

fn default_bot_model() -> String {
    "openai".to_string()
}

fn default_bot_name() -> String {
    "TrimChat Bot".to_string()
}

fn default_bot_avatar() -> String {
    "https://robohash.org/trimchat-bot.png".to_string()
}

fn default_bot_persona() -> String {
    "You are TrimChat Bot, a helpful and funny assistant.".to_string()
}

fn default_bot_connect_timeout() -> u64 {
    10
}

fn default_bot_total_timeout() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            enabled: default_bot_enabled(),
            trigger: default_bot_trigger(),
            endpoint: default_bot_endpoint(),
            model: default_bot_model(),
            name: default_bot_name(),
            avatar: default_bot_avatar(),
            persona: default_bot_persona(),
            connect_timeout_secs: default_bot_connect_timeout(),
            total_timeout_secs: default_bot_total_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/trimchat.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Bot responder configuration.
    #[serde(default)]
    pub bot: BotConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ChatError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ChatError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `TRIMCHAT_JWT_SECRET`: Override the JWT secret key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("TRIMCHAT_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the JWT secret is not set.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ChatError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via TRIMCHAT_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        Ok(())
    }
}
