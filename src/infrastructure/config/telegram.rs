//! Telegram bot configuration.

use std::fmt;

use serde::Deserialize;

/// Telegram connection and chat configuration.
#[derive(Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token from BotFather.
    #[serde(default)]
    pub bot_token: String,
    /// The single admin allowed to post signals.
    #[serde(default)]
    pub admin_id: Option<i64>,
    /// Channel or group whose posts are read as signals.
    #[serde(default)]
    pub signal_channel_id: Option<i64>,
    /// Public base URL for webhook mode. Unset means long polling.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

fn default_webhook_path() -> String {
    "/webhook".into()
}

impl TelegramConfig {
    /// `webhook_url` joined with `webhook_path`, when webhook mode is on.
    #[must_use]
    pub fn full_webhook_url(&self) -> Option<String> {
        let base = self.webhook_url.as_deref()?.trim().trim_end_matches('/');
        if base.is_empty() {
            return None;
        }
        let path = self.webhook_path.trim();
        if path.starts_with('/') {
            Some(format!("{base}{path}"))
        } else {
            Some(format!("{base}/{path}"))
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_id: None,
            signal_channel_id: None,
            webhook_url: None,
            webhook_path: default_webhook_path(),
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("admin_id", &self.admin_id)
            .field("signal_channel_id", &self.signal_channel_id)
            .field("webhook_url", &self.webhook_url)
            .field("webhook_path", &self.webhook_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_webhook(url: &str, path: &str) -> TelegramConfig {
        TelegramConfig {
            webhook_url: Some(url.into()),
            webhook_path: path.into(),
            ..TelegramConfig::default()
        }
    }

    #[test]
    fn no_webhook_means_polling() {
        assert_eq!(TelegramConfig::default().full_webhook_url(), None);
        assert_eq!(with_webhook("  ", "/webhook").full_webhook_url(), None);
    }

    #[test]
    fn joins_url_and_path() {
        assert_eq!(
            with_webhook("https://bot.example.com/", "/webhook").full_webhook_url(),
            Some("https://bot.example.com/webhook".into())
        );
        assert_eq!(
            with_webhook("https://bot.example.com", "hook").full_webhook_url(),
            Some("https://bot.example.com/hook".into())
        );
    }

    #[test]
    fn debug_hides_token() {
        let config = TelegramConfig {
            bot_token: "123:secret".into(),
            ..TelegramConfig::default()
        };
        assert!(!format!("{config:?}").contains("123:secret"));
    }
}
