//! Telegram update intake.
//!
//! Messages and channel posts are converted to [`InboundMessage`]s, passed
//! to the [`MessageHandler`], and the returned [`BotAction`]s are executed
//! against the Bot API. Updates arrive by long polling, or through a
//! webhook route that is merged into the HTTP server.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use teloxide::dispatching::{DefaultKey, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{BotCommand, MessageId};
use teloxide::update_listeners::{webhooks, UpdateListener};
use teloxide::RequestError;
use tracing::{debug, info, warn};

use crate::application::command::bot_commands;
use crate::error::Result;
use crate::port::inbound::chat::{BotAction, ChatKind, InboundMessage, MessageHandler};

/// Dispatcher type driven by [`build_dispatcher`].
pub type TelegramDispatcher = Dispatcher<Bot, RequestError, DefaultKey>;

/// Convert a Telegram message into the transport-neutral form.
///
/// Returns `None` for messages without text (stickers, photos, joins).
#[must_use]
pub fn to_inbound(msg: &Message) -> Option<InboundMessage> {
    let text = msg.text()?;
    let chat_kind = if msg.chat.is_private() {
        ChatKind::Private
    } else if msg.chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Group
    };
    let user = msg.from.as_ref();

    Some(InboundMessage {
        chat_id: msg.chat.id.0,
        chat_kind,
        user_id: user.and_then(|u| i64::try_from(u.id.0).ok()),
        username: user.and_then(|u| u.username.clone()),
        first_name: user.map(|u| u.first_name.clone()),
        message_id: msg.id.0,
        text: text.to_string(),
    })
}

fn schema() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_channel_post().endpoint(on_message))
}

async fn on_message(
    bot: Bot,
    msg: Message,
    handler: Arc<dyn MessageHandler>,
) -> ResponseResult<()> {
    let Some(inbound) = to_inbound(&msg) else {
        return Ok(());
    };

    let actions = handler.handle(&inbound).await;
    perform_actions(&bot, actions).await;
    Ok(())
}

/// Execute handler actions in order. Failures are logged, not propagated.
pub async fn perform_actions(bot: &Bot, actions: Vec<BotAction>) {
    for action in actions {
        match action {
            BotAction::Reply { chat_id, text } => {
                if let Err(e) = bot.send_message(ChatId(chat_id), text).await {
                    warn!(chat_id, error = %e, "Failed to send Telegram reply");
                }
            }
            BotAction::Delete {
                chat_id,
                message_id,
            } => {
                if let Err(e) = bot
                    .delete_message(ChatId(chat_id), MessageId(message_id))
                    .await
                {
                    debug!(chat_id, message_id, error = %e, "Could not delete message");
                }
            }
        }
    }
}

/// Build the update dispatcher around a message handler.
#[must_use]
pub fn build_dispatcher(bot: Bot, handler: Arc<dyn MessageHandler>) -> TelegramDispatcher {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![handler])
        .default_handler(|_| async {})
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in Telegram update handler",
        ))
        .build()
}

/// Register the webhook with Telegram and return its listener and route.
///
/// The router must be served by the caller; `addr` is the local listen
/// address and `url` the public URL Telegram will call.
pub async fn webhook_listener(
    bot: Bot,
    addr: SocketAddr,
    url: &str,
) -> Result<(impl UpdateListener<Err = Infallible>, Router)> {
    let url = url::Url::parse(url)?;
    let (listener, _stop_flag, router) =
        webhooks::axum_to_router(bot, webhooks::Options::new(addr, url.clone())).await?;
    info!(%url, "Telegram webhook registered");
    Ok((listener, router))
}

/// Register bot commands with Telegram for the "/" menu.
pub async fn register_bot_commands(bot: &Bot) -> Result<()> {
    let commands: Vec<BotCommand> = bot_commands()
        .into_iter()
        .map(|(cmd, desc)| BotCommand::new(cmd, desc))
        .collect();

    bot.set_my_commands(commands).await?;
    info!("Registered bot commands with Telegram");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn private_message_carries_sender() {
        let msg = message(json!({
            "message_id": 17,
            "date": 1_700_000_000,
            "chat": {"id": 42, "type": "private", "first_name": "Ann"},
            "from": {"id": 42, "is_bot": false, "first_name": "Ann", "username": "ann"},
            "text": "/start"
        }));

        let inbound = to_inbound(&msg).unwrap();
        assert_eq!(inbound.chat_id, 42);
        assert_eq!(inbound.chat_kind, ChatKind::Private);
        assert_eq!(inbound.user_id, Some(42));
        assert_eq!(inbound.username.as_deref(), Some("ann"));
        assert_eq!(inbound.first_name.as_deref(), Some("Ann"));
        assert_eq!(inbound.message_id, 17);
        assert_eq!(inbound.text, "/start");
    }

    #[test]
    fn channel_post_has_no_sender() {
        let msg = message(json!({
            "message_id": 5,
            "date": 1_700_000_000,
            "chat": {"id": -1_001_234_567_890_i64, "type": "channel", "title": "Signals"},
            "text": "/close SIG-1"
        }));

        let inbound = to_inbound(&msg).unwrap();
        assert_eq!(inbound.chat_kind, ChatKind::Channel);
        assert_eq!(inbound.user_id, None);
        assert!(!inbound.is_private());
    }
}
