//! Chat messages in, chat actions out.
//!
//! The Telegram adapter converts updates into [`InboundMessage`]s, hands
//! them to a [`MessageHandler`], and performs the returned [`BotAction`]s.

use async_trait::async_trait;

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

/// A text message from any chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    /// Sender; channel posts usually have none.
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub message_id: i32,
    pub text: String,
}

impl InboundMessage {
    /// A private message from `user_id`, the common case in tests.
    pub fn private(user_id: i64, message_id: i32, text: impl Into<String>) -> Self {
        Self {
            chat_id: user_id,
            chat_kind: ChatKind::Private,
            user_id: Some(user_id),
            username: None,
            first_name: None,
            message_id,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn is_private(&self) -> bool {
        self.chat_kind == ChatKind::Private
    }
}

/// Something the transport should do in response to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotAction {
    Reply { chat_id: i64, text: String },
    /// Remove a message, e.g. one containing an API secret.
    Delete { chat_id: i64, message_id: i32 },
}

impl BotAction {
    pub fn reply(chat_id: i64, text: impl Into<String>) -> Self {
        Self::Reply {
            chat_id,
            text: text.into(),
        }
    }
}

/// Handles chat messages.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &InboundMessage) -> Vec<BotAction>;
}
