mod harness;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use harness::temp_db::TempDb;
use signalbot::application::bot::{BotSettings, SignalBot};
use signalbot::domain::id::SignalId;
use signalbot::domain::signal::SignalStatus;
use signalbot::domain::subscriber::{Leverage, TradeAmount};
use signalbot::port::inbound::chat::{BotAction, ChatKind, InboundMessage, MessageHandler};
use signalbot::port::outbound::store::{SignalStore, SubscriberStore};
use signalbot::testkit::domain::xrp;
use signalbot::testkit::exchange::{MockConnector, ScriptedExchange};
use signalbot::testkit::messenger::RecordingMessenger;

const ADMIN: i64 = 7;
const CHANNEL: i64 = -1_001_000;

fn settings() -> BotSettings {
    BotSettings {
        admin_id: ADMIN,
        signal_channel_id: Some(CHANNEL),
        allow_registration: true,
        default_trade_amount: TradeAmount::new(dec!(50)).unwrap(),
        default_max_leverage: Leverage::new(20).unwrap(),
        validation_timeout: Duration::from_secs(5),
    }
}

fn channel(text: &str) -> InboundMessage {
    InboundMessage {
        chat_id: CHANNEL,
        chat_kind: ChatKind::Channel,
        user_id: None,
        username: None,
        first_name: None,
        message_id: 99,
        text: text.to_string(),
    }
}

fn last_reply(actions: &[BotAction]) -> &str {
    actions
        .iter()
        .rev()
        .find_map(|action| match action {
            BotAction::Reply { text, .. } => Some(text.as_str()),
            BotAction::Delete { .. } => None,
        })
        .expect("a reply")
}

async fn register(bot: &SignalBot, user_id: i64, key: &str) {
    let secret = format!("{key}-secret");
    for text in ["/register", key, secret.as_str(), "40"] {
        let mut message = InboundMessage::private(user_id, 1, text);
        message.username = Some(format!("trader{user_id}"));
        bot.handle(&message).await;
    }
}

#[tokio::test]
async fn subscriber_lifecycle_against_sqlite() {
    let db = TempDb::create();
    let store = db.store();
    let exchange = Arc::new(ScriptedExchange::new().with_asset(xrp()));
    let messenger = RecordingMessenger::new();
    let bot = SignalBot::new(
        settings(),
        store.clone(),
        Arc::new(MockConnector::new(exchange.clone())),
        Arc::new(messenger.clone()),
    );

    register(&bot, 100, "alpha-key-0001").await;
    register(&bot, 200, "bravo-key-0002").await;

    let saved = store.get_subscriber(100).await.unwrap().unwrap();
    assert_eq!(saved.username.as_deref(), Some("trader100"));
    assert_eq!(saved.credentials.api_secret, "alpha-key-0001-secret");
    assert_eq!(saved.trade_amount_usdt, dec!(40));

    // Subscriber 200 leaves before the signal.
    let actions = bot
        .handle(&InboundMessage::private(200, 2, "/unregister"))
        .await;
    assert!(last_reply(&actions).contains("unregistered"));

    bot.handle(&channel("/long XRPUSDT entry=2 sl=1.8 tp=2.6 lev=50"))
        .await;

    let orders = exchange.placed_orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].quantity, dec!(20));
    assert_eq!(orders[0].leverage, 20);

    let signal_id = messenger
        .messages_to(CHANNEL)
        .iter()
        .find_map(|text| {
            text.split_whitespace()
                .find(|word| word.starts_with("SIG-"))
                .map(str::to_string)
        })
        .expect("signal id in the channel summary");
    let id = SignalId::new(signal_id.as_str());
    assert_eq!(store.successful_trades(&id).await.unwrap().len(), 1);
    assert_eq!(
        store.get_subscriber(100).await.unwrap().unwrap().total_trades,
        1
    );

    bot.handle(&channel(&format!("/update {signal_id} sl=1.9")))
        .await;
    let stored = store.get_signal(&id).await.unwrap().unwrap();
    assert_eq!(stored.signal.stop_loss, Some(dec!(1.9)));
    assert_eq!(stored.signal.take_profit, Some(dec!(2.6)));

    bot.handle(&channel(&format!("/close {signal_id}"))).await;
    let stored = store.get_signal(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, SignalStatus::Closed);
    assert!(exchange.positions().is_empty());

    // Validation notice, then entry, update, and close.
    assert_eq!(messenger.messages_to(100).len(), 1 + 3);
    assert_eq!(messenger.messages_to(200).len(), 1);

    let actions = bot
        .handle(&InboundMessage::private(ADMIN, 3, "/adminstats"))
        .await;
    let stats = last_reply(&actions);
    assert!(stats.contains("Subscribers: 2 (1 active)"));
    assert!(stats.contains("Active signals: 0"));
}

#[tokio::test]
async fn registrations_survive_a_restart() {
    let db = TempDb::create();
    {
        let bot = SignalBot::new(
            settings(),
            db.store(),
            Arc::new(MockConnector::default()),
            Arc::new(RecordingMessenger::new()),
        );
        register(&bot, 100, "alpha-key-0001").await;
    }

    let reopened = db.store();
    let active = reopened.active_subscribers().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].credentials.api_key, "alpha-key-0001");
}
