//! Persistence ports for subscribers, signals, and trade records.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::id::SignalId;
use crate::domain::signal::{Signal, StoredSignal};
use crate::domain::subscriber::{Leverage, NewSubscriber, Subscriber, SubscriberStats, TradeAmount};
use crate::domain::trade::TradeRecord;
use crate::error::Result;

/// Storage operations for subscribers.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Get a subscriber (active or not) by Telegram user id.
    async fn get_subscriber(&self, telegram_id: i64) -> Result<Option<Subscriber>>;

    /// Insert a subscriber, or overwrite and reactivate an existing one.
    async fn upsert_subscriber(&self, subscriber: &NewSubscriber) -> Result<Subscriber>;

    /// All subscribers currently receiving signals.
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>>;

    /// Returns false when no active subscriber matched.
    async fn update_trade_amount(&self, telegram_id: i64, amount: TradeAmount) -> Result<bool>;

    /// Returns false when no active subscriber matched.
    async fn update_max_leverage(&self, telegram_id: i64, leverage: Leverage) -> Result<bool>;

    /// Returns false when the user was not an active subscriber.
    async fn deactivate_subscriber(&self, telegram_id: i64) -> Result<bool>;

    async fn stats(&self) -> Result<SubscriberStats>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> Result<()>;
}

/// Storage operations for signals and per-subscriber trade records.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Save a new signal as active. Re-saving an id replaces it.
    async fn save_signal(&self, signal: &Signal) -> Result<()>;

    async fn get_signal(&self, id: &SignalId) -> Result<Option<StoredSignal>>;

    /// Replace the provided risk levels; `None` leaves a level unchanged.
    async fn update_signal_risk(
        &self,
        id: &SignalId,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<bool>;

    /// Mark a signal closed. Returns false when it does not exist.
    async fn close_signal(&self, id: &SignalId) -> Result<bool>;

    /// Append a trade record. Successful trades bump the subscriber's counter.
    async fn record_trade(&self, record: &TradeRecord) -> Result<()>;

    /// Successful trade records for a signal, oldest first.
    async fn successful_trades(&self, id: &SignalId) -> Result<Vec<TradeRecord>>;
}

/// Combined store used by the application services.
pub trait Store: SubscriberStore + SignalStore {}

impl<T: SubscriberStore + SignalStore> Store for T {}
