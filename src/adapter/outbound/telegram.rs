//! Telegram implementation of the [`Messenger`] port.

use async_trait::async_trait;
use teloxide::prelude::*;

use crate::error::Result;
use crate::port::outbound::messenger::Messenger;

/// Sends plain-text messages through the Bot API.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }
}
