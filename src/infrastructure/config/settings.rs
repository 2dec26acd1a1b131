//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Values come from an optional TOML file and are then overridden by
//! environment variables, so a container can be configured with env alone.
//!
//! # Example
//!
//! ```no_run
//! use signalbot::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use super::bot::BotConfig;
use super::database::DatabaseConfig;
use super::logging::LoggingConfig;
use super::security::SecurityConfig;
use super::server::ServerConfig;
use super::telegram::TelegramConfig;
use crate::adapter::outbound::crypto::CredentialCipher;
use crate::adapter::outbound::mudrex::MudrexConfig;
use crate::application::bot::BotSettings;
use crate::domain::subscriber::{Leverage, TradeAmount};
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Registration policy and subscriber defaults.
    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Encryption key for stored API credentials.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Mudrex REST settings.
    #[serde(default)]
    pub exchange: MudrexConfig,

    /// Listener for `/health` and the webhook.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Parse TOML content, apply process environment overrides, and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed, an environment value does
    /// not parse, or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        Self::parse_with_env(content, |key| std::env::var(key).ok())
    }

    /// Like [`Config::parse_toml`] with an explicit environment lookup.
    #[allow(clippy::result_large_err)]
    pub fn parse_with_env<F>(content: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file. A missing file means defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or if
    /// parsing or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(ConfigError::ReadFile(e).into()),
        };
        Self::parse_toml(&content)
    }

    /// Initialize the tracing subscriber from the logging section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    #[allow(clippy::result_large_err)]
    fn apply_env<F>(&mut self, env: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = env_string(env, "DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(token) = env_string(env, "TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(admin_id) = env_parse(env, "ADMIN_TELEGRAM_ID")? {
            self.telegram.admin_id = Some(admin_id);
        }
        if let Some(channel_id) = env_parse(env, "SIGNAL_CHANNEL_ID")? {
            self.telegram.signal_channel_id = Some(channel_id);
        }
        if let Some(url) = env_string(env, "WEBHOOK_URL") {
            self.telegram.webhook_url = Some(url);
        }
        if let Some(path) = env_string(env, "WEBHOOK_PATH") {
            self.telegram.webhook_path = path;
        }
        if let Some(allow) = env_bool(env, "ALLOW_REGISTRATION")? {
            self.bot.allow_registration = allow;
        }
        if let Some(amount) = env_parse(env, "DEFAULT_TRADE_AMOUNT")? {
            self.bot.default_trade_amount = amount;
        }
        if let Some(leverage) = env_parse(env, "DEFAULT_MAX_LEVERAGE")? {
            self.bot.default_max_leverage = leverage;
        }
        if let Some(key) = env_string(env, "ENCRYPTION_KEY") {
            self.security.encryption_key = Some(key);
        }
        if let Some(base_url) = env_string(env, "MUDREX_BASE_URL") {
            self.exchange.base_url = base_url;
        }
        if let Some(host) = env_string(env, "HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse(env, "PORT")? {
            self.server.port = port;
        }
        if let Some(level) = env_string(env, "LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = env_string(env, "LOG_FORMAT") {
            self.logging.format = format.to_ascii_lowercase();
        }
        Ok(())
    }

    /// Check that required fields are present and values are in range.
    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "TELEGRAM_BOT_TOKEN",
            }
            .into());
        }
        if self.telegram.admin_id.is_none() {
            return Err(ConfigError::MissingField {
                field: "ADMIN_TELEGRAM_ID",
            }
            .into());
        }

        let Some(key) = self.security.encryption_key.as_deref() else {
            return Err(ConfigError::MissingField {
                field: "ENCRYPTION_KEY",
            }
            .into());
        };
        CredentialCipher::from_key(key).map_err(|e| ConfigError::InvalidValue {
            field: "ENCRYPTION_KEY",
            reason: e.to_string(),
        })?;

        TradeAmount::new(self.bot.default_trade_amount).map_err(|e| {
            ConfigError::InvalidValue {
                field: "DEFAULT_TRADE_AMOUNT",
                reason: e.to_string(),
            }
        })?;
        Leverage::new(i64::from(self.bot.default_max_leverage)).map_err(|e| {
            ConfigError::InvalidValue {
                field: "DEFAULT_MAX_LEVERAGE",
                reason: e.to_string(),
            }
        })?;
        if self.bot.validation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "validation_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.database.path.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "DATABASE_PATH",
            }
            .into());
        }

        url::Url::parse(&self.exchange.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "MUDREX_BASE_URL",
            reason: e.to_string(),
        })?;
        if self.exchange.http.timeout_ms == 0 || self.exchange.http.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "exchange.http",
                reason: "timeout and retry attempts must be greater than 0".to_string(),
            }
            .into());
        }

        if let Some(webhook) = self.telegram.full_webhook_url() {
            let parsed = url::Url::parse(&webhook).map_err(|e| ConfigError::InvalidValue {
                field: "WEBHOOK_URL",
                reason: e.to_string(),
            })?;
            if !matches!(parsed.scheme(), "https" | "http") {
                return Err(ConfigError::InvalidValue {
                    field: "WEBHOOK_URL",
                    reason: "must be an http(s) URL".to_string(),
                }
                .into());
            }
        }

        self.server.socket_addr()?;

        if !self.logging.is_known_format() {
            return Err(ConfigError::InvalidValue {
                field: "LOG_FORMAT",
                reason: format!("expected `pretty` or `json`, got `{}`", self.logging.format),
            }
            .into());
        }

        Ok(())
    }

    /// Settings for the message handler.
    ///
    /// # Errors
    ///
    /// Returns an error when the admin id or the subscriber defaults are
    /// invalid; [`Config::load`] already rejects such configs.
    #[allow(clippy::result_large_err)]
    pub fn bot_settings(&self) -> Result<BotSettings> {
        let admin_id = self.telegram.admin_id.ok_or(ConfigError::MissingField {
            field: "ADMIN_TELEGRAM_ID",
        })?;
        Ok(BotSettings {
            admin_id,
            signal_channel_id: self.telegram.signal_channel_id,
            allow_registration: self.bot.allow_registration,
            default_trade_amount: TradeAmount::new(self.bot.default_trade_amount)?,
            default_max_leverage: Leverage::new(i64::from(self.bot.default_max_leverage))?,
            validation_timeout: Duration::from_secs(self.bot.validation_timeout_secs),
        })
    }

    /// Cipher for subscriber credentials.
    #[allow(clippy::result_large_err)]
    pub fn cipher(&self) -> Result<CredentialCipher> {
        let key = self
            .security
            .encryption_key
            .as_deref()
            .ok_or(ConfigError::MissingField {
                field: "ENCRYPTION_KEY",
            })?;
        CredentialCipher::from_key(key)
    }
}

/// Non-empty, trimmed environment value.
fn env_string<F>(env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[allow(clippy::result_large_err)]
fn env_parse<F, T>(env: &F, key: &'static str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    env_string(env, key)
        .map(|value| {
            value.parse::<T>().map_err(|e| {
                ConfigError::InvalidValue {
                    field: key,
                    reason: format!("`{value}`: {e}"),
                }
                .into()
            })
        })
        .transpose()
}

#[allow(clippy::result_large_err)]
fn env_bool<F>(env: &F, key: &'static str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = env_string(env, key) else {
        return Ok(None);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            field: key,
            reason: format!("`{value}` is not a boolean"),
        }
        .into()),
    }
}
