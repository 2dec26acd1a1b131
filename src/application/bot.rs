//! Chat message handling for subscribers and the admin.
//!
//! [`SignalBot`] routes every incoming message:
//!
//! 1. Private messages from a user mid-registration feed the registration
//!    conversation (`/cancel` and `/skip` included).
//! 2. Signal commands are accepted only from the admin's private chat or the
//!    configured signal channel, and ignored silently anywhere else.
//! 3. Subscriber commands are answered in private chats.
//!
//! Signal flows report progress through the [`Messenger`] as they go, since
//! a broadcast can take a while; everything else is returned as
//! [`BotAction`]s for the transport to perform.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::broadcast::SignalBroadcaster;
use super::command::{parse_command, CommandParseError, UserCommand};
use super::format::{
    format_admin_stats, format_broadcast_summary, format_close_header,
    format_followup_notification, format_help, format_signal_summary, format_subscriber_status,
    format_update_header, format_user_trade_notification,
};
use super::registration::{RegistrationDrafts, RegistrationStep};
use crate::domain::parser::parse_signal;
use crate::domain::signal::{ParsedSignal, Signal, SignalClose, SignalUpdate};
use crate::domain::subscriber::{
    validate_credential, ApiCredentials, Leverage, NewSubscriber, Subscriber, TradeAmount,
    MAX_TRADE_AMOUNT, MIN_TRADE_AMOUNT,
};
use crate::domain::trade::{TradeResult, TradeStatus};
use crate::error::{Error, Result};
use crate::port::inbound::chat::{BotAction, InboundMessage, MessageHandler};
use crate::port::outbound::exchange::ExchangeConnector;
use crate::port::outbound::messenger::Messenger;
use crate::port::outbound::store::Store;

/// Behavior knobs for [`SignalBot`].
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Telegram user allowed to post signals and see stats.
    pub admin_id: i64,
    /// Channel or group whose posts are treated as signals.
    pub signal_channel_id: Option<i64>,
    pub allow_registration: bool,
    pub default_trade_amount: TradeAmount,
    pub default_max_leverage: Leverage,
    /// Budget for the balance call that validates new credentials.
    pub validation_timeout: Duration,
}

/// Default time allowed for credential validation.
pub const DEFAULT_VALIDATION_TIMEOUT: Duration = Duration::from_secs(15);

const ERROR_PREVIEW_CHARS: usize = 100;

/// Telegram-facing application service.
pub struct SignalBot {
    settings: BotSettings,
    store: Arc<dyn Store>,
    broadcaster: SignalBroadcaster,
    connector: Arc<dyn ExchangeConnector>,
    messenger: Arc<dyn Messenger>,
    drafts: RegistrationDrafts,
}

impl SignalBot {
    #[must_use]
    pub fn new(
        settings: BotSettings,
        store: Arc<dyn Store>,
        connector: Arc<dyn ExchangeConnector>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let broadcaster = SignalBroadcaster::new(Arc::clone(&store), Arc::clone(&connector));
        Self {
            settings,
            store,
            broadcaster,
            connector,
            messenger,
            drafts: RegistrationDrafts::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    /// Registration drafts currently open.
    #[must_use]
    pub fn drafts(&self) -> &RegistrationDrafts {
        &self.drafts
    }

    fn is_admin(&self, user_id: Option<i64>) -> bool {
        user_id == Some(self.settings.admin_id)
    }

    fn is_signal_source(&self, message: &InboundMessage) -> bool {
        (message.is_private() && self.is_admin(message.user_id))
            || self.settings.signal_channel_id == Some(message.chat_id)
    }

    async fn route(&self, message: &InboundMessage) -> Result<Vec<BotAction>> {
        let text = message.text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        if message.is_private() {
            if let Some(user_id) = message.user_id {
                if let Some(step) = self.drafts.step(user_id) {
                    match parse_command(text) {
                        Ok(UserCommand::Cancel | UserCommand::Skip)
                        | Err(CommandParseError::NotACommand) => {
                            return self.continue_registration(message, user_id, step).await;
                        }
                        _ => {}
                    }
                }
            }
        }

        match parse_signal(text) {
            Ok(Some(parsed)) => {
                if !self.is_signal_source(message) {
                    debug!(chat_id = message.chat_id, "Ignoring signal from unauthorized chat");
                    return Ok(Vec::new());
                }
                return self.handle_signal(message.chat_id, parsed).await;
            }
            Err(e) => {
                if !self.is_signal_source(message) {
                    return Ok(Vec::new());
                }
                return Ok(vec![BotAction::reply(
                    message.chat_id,
                    format!("⚠️ Signal parse error: {e}"),
                )]);
            }
            Ok(None) => {}
        }

        if !message.is_private() {
            return Ok(Vec::new());
        }
        let Some(user_id) = message.user_id else {
            return Ok(Vec::new());
        };

        match parse_command(text) {
            Ok(command) => self.handle_command(message, user_id, command).await,
            Err(CommandParseError::NotACommand) => Ok(Vec::new()),
            Err(CommandParseError::UnknownCommand(command)) => Ok(vec![BotAction::reply(
                message.chat_id,
                format!("Unknown command {command}. Send /help for the list."),
            )]),
        }
    }

    // -------------------------------------------------------------------------
    // Subscriber commands
    // -------------------------------------------------------------------------

    async fn handle_command(
        &self,
        message: &InboundMessage,
        user_id: i64,
        command: UserCommand,
    ) -> Result<Vec<BotAction>> {
        let chat_id = message.chat_id;
        let reply = |text: String| -> Result<Vec<BotAction>> {
            Ok(vec![BotAction::reply(chat_id, text)])
        };

        match command {
            UserCommand::Start => reply(self.start_text(message, user_id).await?),
            UserCommand::Help => reply(format_help(self.is_admin(Some(user_id)))),
            UserCommand::Status => match self.active_subscriber(user_id).await? {
                Some(subscriber) => reply(format_subscriber_status(&subscriber)),
                None => reply("❌ You're not registered.\n\nUse /register to get started.".into()),
            },
            UserCommand::Register => reply(self.begin_registration(user_id).await?),
            UserCommand::Cancel => reply("Nothing to cancel.".into()),
            UserCommand::Skip => reply("Nothing to skip.".into()),
            UserCommand::SetAmount(argument) => {
                reply(self.set_amount(user_id, argument.as_deref()).await?)
            }
            UserCommand::SetLeverage(argument) => {
                reply(self.set_leverage(user_id, argument.as_deref()).await?)
            }
            UserCommand::Unregister => {
                self.drafts.cancel(user_id);
                if self.store.deactivate_subscriber(user_id).await? {
                    info!(subscriber_id = user_id, "Subscriber unregistered");
                    reply(
                        "✅ You've been unregistered.\n\nYou will no longer receive trading signals.\n\
                         Use /register to sign up again."
                            .into(),
                    )
                } else {
                    reply("❌ You're not registered.".into())
                }
            }
            UserCommand::AdminStats => {
                if !self.is_admin(Some(user_id)) {
                    return Ok(Vec::new());
                }
                let stats = self.store.stats().await?;
                reply(format_admin_stats(&stats))
            }
        }
    }

    async fn active_subscriber(&self, user_id: i64) -> Result<Option<Subscriber>> {
        Ok(self
            .store
            .get_subscriber(user_id)
            .await?
            .filter(|s| s.is_active))
    }

    async fn start_text(&self, message: &InboundMessage, user_id: i64) -> Result<String> {
        let name = message.first_name.as_deref().unwrap_or("there");
        if let Some(subscriber) = self.active_subscriber(user_id).await? {
            return Ok(format!(
                "👋 Welcome back, {name}!\n\nYou're already registered.\n\n\
                 💰 Trade amount: {} USDT\n⚡ Max leverage: {}x\n📊 Total trades: {}\n\n\
                 /status - view your settings\n/setamount - change trade amount\n\
                 /setleverage - change max leverage\n/unregister - stop receiving signals",
                subscriber.trade_amount_usdt.normalize(),
                subscriber.max_leverage,
                subscriber.total_trades,
            ));
        }

        let mut text = format!(
            "🤖 Mudrex signal bot\n\nWelcome, {name}!\n\n\
             I execute the admin's futures signals on your Mudrex account automatically.\n\n"
        );
        if self.settings.allow_registration {
            text.push_str(
                "To get started:\n/register - connect your Mudrex account\n\n\
                 You'll need your Mudrex API key and API secret.\n\
                 🔒 Your API keys are encrypted before they are stored.",
            );
        } else {
            text.push_str("Registration is currently closed.");
        }
        Ok(text)
    }

    async fn set_amount(&self, user_id: i64, argument: Option<&str>) -> Result<String> {
        let Some(subscriber) = self.active_subscriber(user_id).await? else {
            return Ok("❌ You're not registered. Use /register first.".into());
        };
        let Some(argument) = argument else {
            return Ok(format!(
                "💰 Current trade amount: {} USDT\n\nUsage: /setamount <amount>\nExample: /setamount 100",
                subscriber.trade_amount_usdt.normalize()
            ));
        };

        match TradeAmount::parse(argument) {
            Ok(amount) => {
                self.store.update_trade_amount(user_id, amount).await?;
                info!(subscriber_id = user_id, amount = %amount.value(), "Trade amount updated");
                Ok(format!(
                    "✅ Trade amount updated to {} USDT",
                    amount.value().normalize()
                ))
            }
            Err(_) => Ok(format!(
                "❌ Please enter a valid amount between {MIN_TRADE_AMOUNT} and {MAX_TRADE_AMOUNT}"
            )),
        }
    }

    async fn set_leverage(&self, user_id: i64, argument: Option<&str>) -> Result<String> {
        let Some(subscriber) = self.active_subscriber(user_id).await? else {
            return Ok("❌ You're not registered. Use /register first.".into());
        };
        let Some(argument) = argument else {
            return Ok(format!(
                "⚡ Current max leverage: {}x\n\nUsage: /setleverage <n>\nExample: /setleverage 10",
                subscriber.max_leverage
            ));
        };

        match Leverage::parse(argument) {
            Ok(leverage) => {
                self.store.update_max_leverage(user_id, leverage).await?;
                info!(subscriber_id = user_id, leverage = leverage.value(), "Max leverage updated");
                Ok(format!("✅ Max leverage updated to {}x", leverage.value()))
            }
            Err(_) => Ok("❌ Please enter a valid leverage between 1 and 125".into()),
        }
    }

    // -------------------------------------------------------------------------
    // Registration conversation
    // -------------------------------------------------------------------------

    async fn begin_registration(&self, user_id: i64) -> Result<String> {
        if !self.settings.allow_registration {
            return Ok("❌ Registration is currently closed.".into());
        }
        if self.active_subscriber(user_id).await?.is_some() {
            return Ok(
                "⚠️ You're already registered!\n\nUse /unregister first if you want to re-register."
                    .into(),
            );
        }

        self.drafts.begin(user_id);
        Ok("🔑 Registration step 1/3\n\nPlease send your Mudrex API key.\n\n\
            You can create one under Mudrex → Settings → API Keys.\n\n\
            🔒 Your key will be encrypted.\n\n/cancel to abort"
            .into())
    }

    async fn continue_registration(
        &self,
        message: &InboundMessage,
        user_id: i64,
        step: RegistrationStep,
    ) -> Result<Vec<BotAction>> {
        let chat_id = message.chat_id;
        let text = message.text.trim();
        let command = parse_command(text).ok();

        if command == Some(UserCommand::Cancel) {
            self.drafts.cancel(user_id);
            return Ok(vec![BotAction::reply(chat_id, "❌ Registration cancelled.")]);
        }

        match step {
            RegistrationStep::AwaitingApiKey => {
                if command.is_some() {
                    return Ok(vec![BotAction::reply(
                        chat_id,
                        "Please send your Mudrex API key, or /cancel.",
                    )]);
                }
                let Ok(api_key) = validate_credential(text, "API key") else {
                    return Ok(vec![BotAction::reply(
                        chat_id,
                        "❌ That doesn't look like a valid API key.\nPlease try again or /cancel",
                    )]);
                };
                self.drafts
                    .advance(user_id, RegistrationStep::AwaitingApiSecret { api_key });
                Ok(vec![
                    BotAction::Delete {
                        chat_id,
                        message_id: message.message_id,
                    },
                    BotAction::reply(
                        chat_id,
                        "✅ API key received!\n\n🔐 Registration step 2/3\n\n\
                         Now send your Mudrex API secret.\n\n🔒 Your secret will be encrypted.\n\n\
                         /cancel to abort",
                    ),
                ])
            }
            RegistrationStep::AwaitingApiSecret { api_key } => {
                if command.is_some() {
                    return Ok(vec![BotAction::reply(
                        chat_id,
                        "Please send your Mudrex API secret, or /cancel.",
                    )]);
                }
                let Ok(api_secret) = validate_credential(text, "API secret") else {
                    return Ok(vec![BotAction::reply(
                        chat_id,
                        "❌ That doesn't look like a valid API secret.\nPlease try again or /cancel",
                    )]);
                };
                self.drafts.advance(
                    user_id,
                    RegistrationStep::AwaitingAmount {
                        credentials: ApiCredentials::new(api_key, api_secret),
                    },
                );
                Ok(vec![
                    BotAction::Delete {
                        chat_id,
                        message_id: message.message_id,
                    },
                    BotAction::reply(
                        chat_id,
                        format!(
                            "✅ API secret received!\n\n💰 Registration step 3/3\n\n\
                             How much USDT do you want to trade per signal?\n\n\
                             Default: {} USDT\n\nSend a number (e.g. 50 or 100) or /skip for the default\n\n\
                             /cancel to abort",
                            self.settings.default_trade_amount.value().normalize()
                        ),
                    ),
                ])
            }
            RegistrationStep::AwaitingAmount { credentials } => {
                let amount = if command == Some(UserCommand::Skip) {
                    self.settings.default_trade_amount
                } else if let Ok(amount) = TradeAmount::parse(text) {
                    amount
                } else {
                    return Ok(vec![BotAction::reply(
                        chat_id,
                        format!(
                            "❌ Please enter a valid amount between {MIN_TRADE_AMOUNT} and {MAX_TRADE_AMOUNT}.\n\
                             Or use /skip for the default."
                        ),
                    )]);
                };
                self.complete_registration(message, user_id, credentials, amount)
                    .await
            }
        }
    }

    async fn complete_registration(
        &self,
        message: &InboundMessage,
        user_id: i64,
        credentials: ApiCredentials,
        amount: TradeAmount,
    ) -> Result<Vec<BotAction>> {
        let chat_id = message.chat_id;
        self.drafts.cancel(user_id);
        self.send(chat_id, "🔄 Validating your API credentials...")
            .await;

        let exchange = self.connector.connect(&credentials);
        let balance =
            match tokio::time::timeout(self.settings.validation_timeout, exchange.futures_balance())
                .await
            {
                Ok(Ok(balance)) => balance,
                Ok(Err(e)) => {
                    warn!(subscriber_id = user_id, error = %e, "Credential validation failed");
                    let preview: String = e.to_string().chars().take(ERROR_PREVIEW_CHARS).collect();
                    return Ok(vec![BotAction::reply(
                        chat_id,
                        format!(
                            "❌ API validation failed!\n\nError: {preview}\n\n\
                             Please check your credentials and try /register again."
                        ),
                    )]);
                }
                Err(_) => {
                    warn!(subscriber_id = user_id, "Credential validation timed out");
                    return Ok(vec![BotAction::reply(
                        chat_id,
                        "❌ Validation timed out!\n\nThe API request took too long. Please check:\n\
                         1. Your API secret is correct\n2. Mudrex API is accessible\n\n\
                         Try again with /register",
                    )]);
                }
            };
        info!(subscriber_id = user_id, %balance, "Credentials validated");

        let new_subscriber = NewSubscriber {
            telegram_id: user_id,
            username: message.username.clone(),
            credentials,
            trade_amount: amount,
            max_leverage: self.settings.default_max_leverage,
        };
        let subscriber = match self.store.upsert_subscriber(&new_subscriber).await {
            Ok(subscriber) => subscriber,
            Err(e) => {
                error!(subscriber_id = user_id, error = %e, "Failed to save subscriber");
                return Ok(vec![BotAction::reply(
                    chat_id,
                    "❌ Registration failed while saving your details.\n\nPlease try again with /register",
                )]);
            }
        };
        info!(
            subscriber_id = user_id,
            username = subscriber.username.as_deref().unwrap_or("-"),
            "Subscriber registered"
        );

        Ok(vec![BotAction::reply(
            chat_id,
            format!(
                "🎉 Registration complete!\n━━━━━━━━━━━━━━━━━━━━\n\
                 💰 Trade amount: {} USDT\n⚡ Max leverage: {}x\n💼 Futures balance: {:.2} USDT\n\
                 ━━━━━━━━━━━━━━━━━━━━\n\n\
                 You'll now receive trades automatically when signals are posted!\n\n\
                 /status - view your settings\n/setamount - change trade amount\n\
                 /setleverage - change max leverage\n/unregister - stop receiving signals",
                subscriber.trade_amount_usdt.normalize(),
                subscriber.max_leverage,
                balance,
            ),
        )])
    }

    // -------------------------------------------------------------------------
    // Signals
    // -------------------------------------------------------------------------

    async fn handle_signal(&self, chat_id: i64, parsed: ParsedSignal) -> Result<Vec<BotAction>> {
        match parsed {
            ParsedSignal::New(signal) => self.handle_new_signal(chat_id, &signal).await,
            ParsedSignal::Update(update) => self.handle_update(chat_id, &update).await,
            ParsedSignal::Close(close) => self.handle_close(chat_id, &close).await,
        }
    }

    async fn handle_new_signal(&self, chat_id: i64, signal: &Signal) -> Result<Vec<BotAction>> {
        info!(signal_id = %signal.id, symbol = %signal.symbol, "New signal received");
        self.send(chat_id, &format_signal_summary(signal)).await;

        let results = self.broadcaster.broadcast_signal(signal).await?;
        self.send(
            chat_id,
            &format_broadcast_summary("Broadcast", signal.id.as_str(), &results),
        )
        .await;

        for result in &results {
            self.send(
                result.subscriber_id,
                &format_user_trade_notification(signal, result),
            )
            .await;
        }
        Ok(Vec::new())
    }

    async fn handle_update(&self, chat_id: i64, update: &SignalUpdate) -> Result<Vec<BotAction>> {
        info!(signal_id = %update.id, "Signal update received");
        self.send(chat_id, &format_update_header(update)).await;

        let results = match self.broadcaster.broadcast_update(update).await {
            Ok(results) => results,
            Err(Error::Domain(e)) => {
                return Ok(vec![BotAction::reply(chat_id, format!("⚠️ {e}"))]);
            }
            Err(e) => return Err(e),
        };
        self.report_followup(chat_id, "Signal update", update.id.as_str(), &results)
            .await;
        Ok(Vec::new())
    }

    async fn handle_close(&self, chat_id: i64, close: &SignalClose) -> Result<Vec<BotAction>> {
        info!(signal_id = %close.id, partial = ?close.partial_percent, "Signal close received");
        self.send(chat_id, &format_close_header(close)).await;

        let results = match self.broadcaster.broadcast_close(close).await {
            Ok(results) => results,
            Err(Error::Domain(e)) => {
                return Ok(vec![BotAction::reply(chat_id, format!("⚠️ {e}"))]);
            }
            Err(e) => return Err(e),
        };
        let title = if close.is_full() {
            "Signal closed"
        } else {
            "Partial close"
        };
        self.report_followup(chat_id, title, close.id.as_str(), &results)
            .await;
        Ok(Vec::new())
    }

    async fn report_followup(
        &self,
        chat_id: i64,
        title: &str,
        signal_id: &str,
        results: &[TradeResult],
    ) {
        self.send(chat_id, &format_broadcast_summary(title, signal_id, results))
            .await;
        for result in results.iter().filter(|r| r.status != TradeStatus::Skipped) {
            self.send(
                result.subscriber_id,
                &format_followup_notification(title, signal_id, result),
            )
            .await;
        }
    }

    /// Send a message, logging instead of failing; a blocked bot or a
    /// deleted chat must not stop the flow for everyone else.
    async fn send(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text).await {
            warn!(chat_id, error = %e, "Failed to send Telegram message");
        }
    }
}

#[async_trait]
impl MessageHandler for SignalBot {
    async fn handle(&self, message: &InboundMessage) -> Vec<BotAction> {
        match self.route(message).await {
            Ok(actions) => actions,
            Err(e) => {
                error!(chat_id = message.chat_id, error = %e, "Failed to handle message");
                vec![BotAction::reply(
                    message.chat_id,
                    "⚠️ Something went wrong. Please try again later.",
                )]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::SignalId;
    use crate::error::ExchangeError;
    use crate::port::inbound::chat::ChatKind;
    use crate::port::outbound::store::{SignalStore, SubscriberStore};
    use crate::testkit::domain::{market_signal, new_subscriber, xrp};
    use crate::testkit::exchange::{MockConnector, ScriptedExchange};
    use crate::testkit::messenger::RecordingMessenger;
    use crate::testkit::store::MemoryStore;
    use rust_decimal_macros::dec;

    const ADMIN: i64 = 1000;
    const CHANNEL: i64 = -100_500;
    const USER: i64 = 42;

    struct Harness {
        bot: SignalBot,
        store: Arc<MemoryStore>,
        messenger: RecordingMessenger,
    }

    fn settings() -> BotSettings {
        BotSettings {
            admin_id: ADMIN,
            signal_channel_id: Some(CHANNEL),
            allow_registration: true,
            default_trade_amount: TradeAmount::new(dec!(50)).unwrap(),
            default_max_leverage: Leverage::new(20).unwrap(),
            validation_timeout: DEFAULT_VALIDATION_TIMEOUT,
        }
    }

    fn harness_with(settings: BotSettings, connector: MockConnector) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let messenger = RecordingMessenger::new();
        let bot = SignalBot::new(
            settings,
            store.clone(),
            Arc::new(connector),
            Arc::new(messenger.clone()),
        );
        Harness {
            bot,
            store,
            messenger,
        }
    }

    fn harness() -> Harness {
        let exchange = Arc::new(ScriptedExchange::new().with_asset(xrp()));
        harness_with(settings(), MockConnector::new(exchange))
    }

    fn replies(actions: &[BotAction]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|action| match action {
                BotAction::Reply { text, .. } => Some(text.as_str()),
                BotAction::Delete { .. } => None,
            })
            .collect()
    }

    fn channel_post(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: CHANNEL,
            chat_kind: ChatKind::Channel,
            user_id: None,
            username: None,
            first_name: None,
            message_id: 1,
            text: text.to_string(),
        }
    }

    impl Harness {
        async fn say(&self, user_id: i64, text: &str) -> Vec<BotAction> {
            self.bot
                .handle(&InboundMessage::private(user_id, 7, text))
                .await
        }

        async fn register(&self, user_id: i64, api_key: &str) {
            self.store
                .upsert_subscriber(&new_subscriber(user_id, api_key, dec!(50)))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn registration_walks_through_three_steps() {
        let h = harness();

        let actions = h.say(USER, "/register").await;
        assert!(replies(&actions)[0].contains("step 1/3"));

        let actions = h.say(USER, "mudrex-key-0001").await;
        assert_eq!(
            actions[0],
            BotAction::Delete {
                chat_id: USER,
                message_id: 7
            }
        );
        assert!(replies(&actions)[0].contains("step 2/3"));

        let actions = h.say(USER, "mudrex-secret-0001").await;
        assert!(matches!(actions[0], BotAction::Delete { .. }));
        assert!(replies(&actions)[0].contains("Default: 50 USDT"));

        let actions = h.say(USER, "75").await;
        let text = replies(&actions)[0];
        assert!(text.starts_with("🎉 Registration complete!"));
        assert!(text.contains("Trade amount: 75 USDT"));
        assert!(text.contains("Futures balance: 1000.00 USDT"));
        assert_eq!(
            h.messenger.messages_to(USER),
            vec!["🔄 Validating your API credentials...".to_string()]
        );

        let saved = h.store.get_subscriber(USER).await.unwrap().unwrap();
        assert_eq!(saved.credentials.api_key, "mudrex-key-0001");
        assert_eq!(saved.credentials.api_secret, "mudrex-secret-0001");
        assert_eq!(saved.trade_amount_usdt, dec!(75));
        assert_eq!(saved.max_leverage, 20);
        assert!(!h.bot.drafts().is_active(USER));
    }

    #[tokio::test]
    async fn skip_uses_default_amount() {
        let h = harness();
        h.say(USER, "/register").await;
        h.say(USER, "mudrex-key-0001").await;
        h.say(USER, "mudrex-secret-0001").await;
        h.say(USER, "/skip").await;

        let saved = h.store.get_subscriber(USER).await.unwrap().unwrap();
        assert_eq!(saved.trade_amount_usdt, dec!(50));
    }

    #[tokio::test]
    async fn invalid_input_keeps_the_current_step() {
        let h = harness();
        h.say(USER, "/register").await;

        let actions = h.say(USER, "short").await;
        assert!(replies(&actions)[0].contains("doesn't look like a valid API key"));
        assert_eq!(
            h.bot.drafts().step(USER),
            Some(RegistrationStep::AwaitingApiKey)
        );

        h.say(USER, "mudrex-key-0001").await;
        h.say(USER, "mudrex-secret-0001").await;
        let actions = h.say(USER, "5000000").await;
        assert!(replies(&actions)[0].contains("valid amount between 1 and 10000"));
        assert!(h.bot.drafts().is_active(USER));
        assert!(h.store.get_subscriber(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_aborts_registration() {
        let h = harness();
        h.say(USER, "/register").await;
        h.say(USER, "mudrex-key-0001").await;

        let actions = h.say(USER, "/cancel").await;
        assert_eq!(replies(&actions), vec!["❌ Registration cancelled."]);
        assert!(!h.bot.drafts().is_active(USER));

        let actions = h.say(USER, "/cancel").await;
        assert_eq!(replies(&actions), vec!["Nothing to cancel."]);
    }

    #[tokio::test]
    async fn other_commands_still_work_mid_registration() {
        let h = harness();
        h.say(USER, "/register").await;

        let actions = h.say(USER, "/help").await;
        assert!(replies(&actions)[0].contains("/register"));
        assert_eq!(
            h.bot.drafts().step(USER),
            Some(RegistrationStep::AwaitingApiKey)
        );
    }

    #[tokio::test]
    async fn rejected_credentials_are_not_saved() {
        let exchange = Arc::new(
            ScriptedExchange::new()
                .with_balance_error(ExchangeError::AuthFailed("invalid signature".into())),
        );
        let h = harness_with(settings(), MockConnector::new(exchange));
        h.say(USER, "/register").await;
        h.say(USER, "mudrex-key-0001").await;
        h.say(USER, "mudrex-secret-0001").await;

        let actions = h.say(USER, "/skip").await;
        let text = replies(&actions)[0];
        assert!(text.starts_with("❌ API validation failed!"));
        assert!(text.contains("invalid signature"));
        assert!(h.store.get_subscriber(USER).await.unwrap().is_none());
        assert!(!h.bot.drafts().is_active(USER));
    }

    #[tokio::test]
    async fn slow_validation_times_out() {
        let exchange =
            Arc::new(ScriptedExchange::new().with_balance_delay(Duration::from_secs(30)));
        let mut settings = settings();
        settings.validation_timeout = Duration::from_millis(20);
        let h = harness_with(settings, MockConnector::new(exchange));
        h.say(USER, "/register").await;
        h.say(USER, "mudrex-key-0001").await;
        h.say(USER, "mudrex-secret-0001").await;

        let actions = h.say(USER, "/skip").await;
        assert!(replies(&actions)[0].starts_with("❌ Validation timed out!"));
        assert!(h.store.get_subscriber(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closed_registration_is_refused() {
        let mut settings = settings();
        settings.allow_registration = false;
        let h = harness_with(settings, MockConnector::default());

        let actions = h.say(USER, "/register").await;
        assert_eq!(replies(&actions), vec!["❌ Registration is currently closed."]);
        assert!(!h.bot.drafts().is_active(USER));

        let actions = h.say(USER, "/start").await;
        assert!(replies(&actions)[0].ends_with("Registration is currently closed."));
    }

    #[tokio::test]
    async fn registered_user_cannot_register_twice() {
        let h = harness();
        h.register(USER, "mudrex-key-0001").await;

        let actions = h.say(USER, "/register").await;
        assert!(replies(&actions)[0].contains("already registered"));

        let actions = h.say(USER, "/start").await;
        assert!(replies(&actions)[0].contains("Welcome back"));
    }

    #[tokio::test]
    async fn settings_commands_update_the_subscriber() {
        let h = harness();
        h.register(USER, "mudrex-key-0001").await;

        let actions = h.say(USER, "/setamount").await;
        assert!(replies(&actions)[0].contains("Current trade amount: 50 USDT"));

        let actions = h.say(USER, "/setamount 120.5").await;
        assert_eq!(replies(&actions), vec!["✅ Trade amount updated to 120.5 USDT"]);

        let actions = h.say(USER, "/setamount 0").await;
        assert!(replies(&actions)[0].starts_with("❌ Please enter a valid amount"));

        let actions = h.say(USER, "/setleverage 5x").await;
        assert_eq!(replies(&actions), vec!["✅ Max leverage updated to 5x"]);

        let actions = h.say(USER, "/setleverage 500").await;
        assert!(replies(&actions)[0].contains("between 1 and 125"));

        let saved = h.store.get_subscriber(USER).await.unwrap().unwrap();
        assert_eq!(saved.trade_amount_usdt, dec!(120.5));
        assert_eq!(saved.max_leverage, 5);

        let actions = h.say(USER, "/status").await;
        assert!(replies(&actions)[0].contains("Status: Active"));
    }

    #[tokio::test]
    async fn unregister_deactivates() {
        let h = harness();
        h.register(USER, "mudrex-key-0001").await;

        let actions = h.say(USER, "/unregister").await;
        assert!(replies(&actions)[0].starts_with("✅ You've been unregistered."));

        let actions = h.say(USER, "/status").await;
        assert!(replies(&actions)[0].starts_with("❌ You're not registered."));
        let actions = h.say(USER, "/setamount 10").await;
        assert!(replies(&actions)[0].contains("Use /register first"));
        let actions = h.say(USER, "/unregister").await;
        assert_eq!(replies(&actions), vec!["❌ You're not registered."]);
    }

    #[tokio::test]
    async fn unknown_commands_get_a_hint() {
        let h = harness();
        let actions = h.say(USER, "/moon").await;
        assert_eq!(
            replies(&actions),
            vec!["Unknown command /moon. Send /help for the list."]
        );
        assert!(h.say(USER, "hello there").await.is_empty());
    }

    #[tokio::test]
    async fn group_chatter_is_ignored() {
        let h = harness();
        let mut message = InboundMessage::private(USER, 3, "/start");
        message.chat_id = -42;
        message.chat_kind = ChatKind::Group;

        assert!(h.bot.handle(&message).await.is_empty());
    }

    #[tokio::test]
    async fn admin_stats_are_admin_only() {
        let h = harness();
        h.register(USER, "mudrex-key-0001").await;

        assert!(h.say(USER, "/adminstats").await.is_empty());

        let actions = h.say(ADMIN, "/adminstats").await;
        assert!(replies(&actions)[0].contains("Subscribers: 1 (1 active)"));
    }

    #[tokio::test]
    async fn admin_signal_is_mirrored_to_subscribers() {
        let h = harness();
        h.register(USER, "mudrex-key-0001").await;
        h.register(43, "mudrex-key-0002").await;

        let actions = h.say(ADMIN, "/long XRPUSDT market 5x").await;
        assert!(actions.is_empty());

        let admin = h.messenger.messages_to(ADMIN);
        assert_eq!(admin.len(), 2);
        assert!(admin[1].contains("📊 Broadcast SIG-"));

        for id in [USER, 43] {
            let received = h.messenger.messages_to(id);
            assert_eq!(received.len(), 1);
            assert!(received[0].contains("LONG XRPUSDT"));
        }

        let trades = h.store.trades();
        assert_eq!(trades.len(), 2);
        assert!(trades.iter().all(|t| t.status == TradeStatus::Success));
    }

    #[tokio::test]
    async fn channel_posts_are_signals() {
        let h = harness();
        h.register(USER, "mudrex-key-0001").await;

        let actions = h
            .bot
            .handle(&channel_post("/signal SHORT XRPUSDT market"))
            .await;

        assert!(actions.is_empty());
        assert_eq!(h.messenger.messages_to(CHANNEL).len(), 2);
        assert_eq!(h.store.trades().len(), 1);
    }

    #[tokio::test]
    async fn signals_from_other_users_are_ignored() {
        let h = harness();
        h.register(USER, "mudrex-key-0001").await;

        assert!(h.say(USER, "/long XRPUSDT market").await.is_empty());
        assert!(h.say(USER, "/long").await.is_empty());
        assert!(h.messenger.is_empty());
        assert!(h.store.trades().is_empty());
    }

    #[tokio::test]
    async fn admin_sees_parse_errors() {
        let h = harness();
        let actions = h.say(ADMIN, "/signal SIDEWAYS XRPUSDT").await;
        assert!(replies(&actions)[0].starts_with("⚠️ Signal parse error: invalid side"));
    }

    #[tokio::test]
    async fn followup_for_unknown_signal_is_reported() {
        let h = harness();
        let actions = h.say(ADMIN, "/close SIG-NOPE").await;
        assert_eq!(replies(&actions), vec!["⚠️ signal `SIG-NOPE` not found"]);
    }

    #[tokio::test]
    async fn close_notifies_position_holders() {
        let h = harness();
        h.register(USER, "mudrex-key-0001").await;
        let signal = market_signal("SIG-CLOSE", "XRPUSDT");
        h.bot.broadcaster.broadcast_signal(&signal).await.unwrap();

        let actions = h.say(ADMIN, "/close SIG-CLOSE").await;
        assert!(actions.is_empty());

        let received = h.messenger.messages_to(USER);
        assert_eq!(received.len(), 1);
        assert!(received[0].contains("Signal closed SIG-CLOSE"));
        let stored = h
            .store
            .get_signal(&SignalId::new("SIG-CLOSE"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, crate::domain::signal::SignalStatus::Closed);
    }

    #[tokio::test]
    async fn blocked_subscriber_does_not_stop_the_broadcast() {
        let h = harness();
        h.register(USER, "mudrex-key-0001").await;
        h.register(43, "mudrex-key-0002").await;
        h.messenger.fail_for(USER);

        h.say(ADMIN, "/long XRPUSDT market").await;

        assert!(h.messenger.messages_to(USER).is_empty());
        assert_eq!(h.messenger.messages_to(43).len(), 1);
        assert_eq!(h.store.trades().len(), 2);
    }
}
