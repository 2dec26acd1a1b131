//! In-memory store with the same semantics as the SQLite adapter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::id::SignalId;
use crate::domain::signal::{Signal, SignalStatus, StoredSignal};
use crate::domain::subscriber::{Leverage, NewSubscriber, Subscriber, SubscriberStats, TradeAmount};
use crate::domain::trade::{TradeRecord, TradeStatus};
use crate::error::{Error, Result};
use crate::port::outbound::store::{SignalStore, SubscriberStore};

#[derive(Default)]
struct Inner {
    // Registration order doubles as `created_at` order.
    subscribers: Vec<Subscriber>,
    signals: HashMap<SignalId, StoredSignal>,
    trades: Vec<TradeRecord>,
}

/// Store kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    ping_fails: AtomicBool,
    ping_delay_ms: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("lock memory store")
    }

    /// Make `ping` fail, as an unreachable database would.
    pub fn fail_pings(&self) {
        self.ping_fails.store(true, Ordering::SeqCst);
    }

    /// Make `ping` hang for `delay` before answering.
    pub fn delay_pings(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.ping_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Every trade record written so far.
    pub fn trades(&self) -> Vec<TradeRecord> {
        self.inner().trades.clone()
    }

    fn update_active<F>(&self, telegram_id: i64, apply: F) -> bool
    where
        F: FnOnce(&mut Subscriber),
    {
        let mut inner = self.inner();
        match inner
            .subscribers
            .iter_mut()
            .find(|s| s.telegram_id == telegram_id && s.is_active)
        {
            Some(subscriber) => {
                apply(subscriber);
                subscriber.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SubscriberStore for MemoryStore {
    async fn get_subscriber(&self, telegram_id: i64) -> Result<Option<Subscriber>> {
        Ok(self
            .inner()
            .subscribers
            .iter()
            .find(|s| s.telegram_id == telegram_id)
            .cloned())
    }

    async fn upsert_subscriber(&self, new: &NewSubscriber) -> Result<Subscriber> {
        let now = Utc::now();
        let mut inner = self.inner();

        if let Some(existing) = inner
            .subscribers
            .iter_mut()
            .find(|s| s.telegram_id == new.telegram_id)
        {
            existing.username = new.username.clone();
            existing.credentials = new.credentials.clone();
            existing.trade_amount_usdt = new.trade_amount.value();
            existing.max_leverage = new.max_leverage.value();
            existing.is_active = true;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let subscriber = Subscriber {
            telegram_id: new.telegram_id,
            username: new.username.clone(),
            credentials: new.credentials.clone(),
            trade_amount_usdt: new.trade_amount.value(),
            max_leverage: new.max_leverage.value(),
            is_active: true,
            total_trades: 0,
            total_pnl: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        inner.subscribers.push(subscriber.clone());
        Ok(subscriber)
    }

    async fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self
            .inner()
            .subscribers
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    async fn update_trade_amount(&self, telegram_id: i64, amount: TradeAmount) -> Result<bool> {
        Ok(self.update_active(telegram_id, |s| s.trade_amount_usdt = amount.value()))
    }

    async fn update_max_leverage(&self, telegram_id: i64, leverage: Leverage) -> Result<bool> {
        Ok(self.update_active(telegram_id, |s| s.max_leverage = leverage.value()))
    }

    async fn deactivate_subscriber(&self, telegram_id: i64) -> Result<bool> {
        Ok(self.update_active(telegram_id, |s| s.is_active = false))
    }

    async fn stats(&self) -> Result<SubscriberStats> {
        let inner = self.inner();
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);

        Ok(SubscriberStats {
            total_subscribers: count(inner.subscribers.len()),
            active_subscribers: count(inner.subscribers.iter().filter(|s| s.is_active).count()),
            total_trades: count(
                inner
                    .trades
                    .iter()
                    .filter(|t| t.status == TradeStatus::Success)
                    .count(),
            ),
            active_signals: count(
                inner
                    .signals
                    .values()
                    .filter(|s| s.status == SignalStatus::Active)
                    .count(),
            ),
        })
    }

    async fn ping(&self) -> Result<()> {
        let delay = self.ping_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.ping_fails.load(Ordering::SeqCst) {
            return Err(Error::Connection("memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn save_signal(&self, signal: &Signal) -> Result<()> {
        self.inner().signals.insert(
            signal.id.clone(),
            StoredSignal {
                signal: signal.clone(),
                status: SignalStatus::Active,
            },
        );
        Ok(())
    }

    async fn get_signal(&self, id: &SignalId) -> Result<Option<StoredSignal>> {
        Ok(self.inner().signals.get(id).cloned())
    }

    async fn update_signal_risk(
        &self,
        id: &SignalId,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<bool> {
        let mut inner = self.inner();
        let Some(stored) = inner.signals.get_mut(id) else {
            return Ok(false);
        };
        if stop_loss.is_some() {
            stored.signal.stop_loss = stop_loss;
        }
        if take_profit.is_some() {
            stored.signal.take_profit = take_profit;
        }
        Ok(true)
    }

    async fn close_signal(&self, id: &SignalId) -> Result<bool> {
        let mut inner = self.inner();
        match inner.signals.get_mut(id) {
            Some(stored) => {
                stored.status = SignalStatus::Closed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_trade(&self, record: &TradeRecord) -> Result<()> {
        let mut inner = self.inner();
        inner.trades.push(record.clone());
        if record.status == TradeStatus::Success {
            if let Some(subscriber) = inner
                .subscribers
                .iter_mut()
                .find(|s| s.telegram_id == record.telegram_id)
            {
                subscriber.total_trades += 1;
                subscriber.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn successful_trades(&self, id: &SignalId) -> Result<Vec<TradeRecord>> {
        Ok(self
            .inner()
            .trades
            .iter()
            .filter(|t| &t.signal_id == id && t.status == TradeStatus::Success)
            .cloned()
            .collect())
    }
}
