//! SQLite subscriber and signal store.
//!
//! Implements [`SubscriberStore`] and [`SignalStore`] on a Diesel pool.
//! Credentials pass through [`CredentialCipher`] on the way in and out, so
//! plaintext keys never touch the database file.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::warn;

use crate::adapter::outbound::crypto::CredentialCipher;
use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::{
    NewTradeRow, SignalRow, SubscriberRegistration, SubscriberRow, TradeRow,
};
use crate::adapter::outbound::sqlite::database::schema::{signals, subscribers, trades};
use crate::domain::id::SignalId;
use crate::domain::signal::{OrderType, Side, Signal, SignalStatus, StoredSignal};
use crate::domain::subscriber::{
    ApiCredentials, Leverage, NewSubscriber, Subscriber, SubscriberStats, TradeAmount,
};
use crate::domain::trade::{TradeRecord, TradeStatus};
use crate::error::{Error, Result};
use crate::port::outbound::store::{SignalStore, SubscriberStore};

type PooledConnection = diesel::r2d2::PooledConnection<
    diesel::r2d2::ConnectionManager<diesel::SqliteConnection>,
>;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// SQLite-backed store for subscribers, signals, and trades.
pub struct SqliteStore {
    pool: DbPool,
    cipher: CredentialCipher,
}

impl SqliteStore {
    #[must_use]
    pub fn new(pool: DbPool, cipher: CredentialCipher) -> Self {
        Self { pool, cipher }
    }

    fn conn(&self) -> Result<PooledConnection> {
        self.pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))
    }

    fn subscriber_from_row(&self, row: SubscriberRow) -> Result<Subscriber> {
        let credentials = ApiCredentials::new(
            self.cipher.decrypt(&row.api_key_enc)?,
            self.cipher.decrypt(&row.api_secret_enc)?,
        );
        Ok(Subscriber {
            telegram_id: row.telegram_id,
            username: row.username,
            credentials,
            trade_amount_usdt: f64_to_decimal(row.trade_amount_usdt),
            max_leverage: u32::try_from(row.max_leverage).unwrap_or(1),
            is_active: row.is_active,
            total_trades: row.total_trades,
            total_pnl: f64_to_decimal(row.total_pnl),
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }

    fn signal_to_row(signal: &Signal, now: &str) -> SignalRow {
        SignalRow {
            signal_id: signal.id.to_string(),
            symbol: signal.symbol.clone(),
            signal_type: signal.side.as_str().to_string(),
            order_type: signal.order_type.as_str().to_string(),
            entry_price: signal.entry_price.map(decimal_to_f64),
            stop_loss: signal.stop_loss.map(decimal_to_f64),
            take_profit: signal.take_profit.map(decimal_to_f64),
            leverage: i32::try_from(signal.leverage).unwrap_or(i32::MAX),
            status: SignalStatus::Active.as_str().to_string(),
            created_at: now.to_string(),
            closed_at: None,
        }
    }

    fn signal_from_row(row: SignalRow) -> Result<StoredSignal> {
        Ok(StoredSignal {
            signal: Signal {
                id: SignalId::from(row.signal_id),
                symbol: row.symbol,
                side: Side::from_str(&row.signal_type).map_err(Error::Parse)?,
                order_type: OrderType::from_str(&row.order_type).map_err(Error::Parse)?,
                entry_price: row.entry_price.map(f64_to_decimal),
                stop_loss: row.stop_loss.map(f64_to_decimal),
                take_profit: row.take_profit.map(f64_to_decimal),
                leverage: u32::try_from(row.leverage).unwrap_or(1),
            },
            status: SignalStatus::from_db(&row.status),
        })
    }

    fn trade_from_row(row: TradeRow) -> Result<TradeRecord> {
        Ok(TradeRecord {
            telegram_id: row.telegram_id,
            signal_id: SignalId::from(row.signal_id),
            symbol: row.symbol,
            side: Side::from_str(&row.side).map_err(Error::Parse)?,
            order_type: OrderType::from_str(&row.order_type).map_err(Error::Parse)?,
            status: TradeStatus::from_db(&row.status),
            quantity: row.quantity.map(f64_to_decimal),
            entry_price: row.entry_price.map(f64_to_decimal),
            order_id: row.order_id,
            error_message: row.error_message,
        })
    }
}

#[async_trait]
impl SubscriberStore for SqliteStore {
    async fn get_subscriber(&self, telegram_id: i64) -> Result<Option<Subscriber>> {
        let mut conn = self.conn()?;
        let row = subscribers::table
            .find(telegram_id)
            .select(SubscriberRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(|r| self.subscriber_from_row(r)).transpose()
    }

    async fn upsert_subscriber(&self, subscriber: &NewSubscriber) -> Result<Subscriber> {
        let now = Utc::now().to_rfc3339();
        let registration = SubscriberRegistration {
            username: subscriber.username.clone(),
            api_key_enc: self.cipher.encrypt(&subscriber.credentials.api_key)?,
            api_secret_enc: self.cipher.encrypt(&subscriber.credentials.api_secret)?,
            trade_amount_usdt: decimal_to_f64(subscriber.trade_amount.value()),
            max_leverage: i32::try_from(subscriber.max_leverage.value()).unwrap_or(i32::MAX),
            is_active: true,
            updated_at: now.clone(),
        };
        let id = subscriber.telegram_id;

        let mut conn = self.conn()?;
        let row = conn.transaction::<_, Error, _>(|conn| {
            let exists = subscribers::table
                .find(id)
                .select(subscribers::telegram_id)
                .first::<i64>(conn)
                .optional()?
                .is_some();

            if exists {
                diesel::update(subscribers::table.find(id))
                    .set(&registration)
                    .execute(conn)?;
            } else {
                let row = SubscriberRow {
                    telegram_id: id,
                    username: registration.username.clone(),
                    api_key_enc: registration.api_key_enc.clone(),
                    api_secret_enc: registration.api_secret_enc.clone(),
                    trade_amount_usdt: registration.trade_amount_usdt,
                    max_leverage: registration.max_leverage,
                    is_active: true,
                    total_trades: 0,
                    total_pnl: 0.0,
                    created_at: now.clone(),
                    updated_at: now.clone(),
                };
                diesel::insert_into(subscribers::table)
                    .values(&row)
                    .execute(conn)?;
            }

            Ok(subscribers::table
                .find(id)
                .select(SubscriberRow::as_select())
                .first(conn)?)
        })?;

        self.subscriber_from_row(row)
    }

    async fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
        let mut conn = self.conn()?;
        let rows: Vec<SubscriberRow> = subscribers::table
            .filter(subscribers::is_active.eq(true))
            .order(subscribers::created_at.asc())
            .select(SubscriberRow::as_select())
            .load(&mut conn)?;

        // A row that no longer decrypts must not block everyone else's trades.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let telegram_id = row.telegram_id;
                match self.subscriber_from_row(row) {
                    Ok(subscriber) => Some(subscriber),
                    Err(e) => {
                        warn!(telegram_id, error = %e, "Skipping unreadable subscriber");
                        None
                    }
                }
            })
            .collect())
    }

    async fn update_trade_amount(&self, telegram_id: i64, amount: TradeAmount) -> Result<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            subscribers::table
                .filter(subscribers::telegram_id.eq(telegram_id))
                .filter(subscribers::is_active.eq(true)),
        )
        .set((
            subscribers::trade_amount_usdt.eq(decimal_to_f64(amount.value())),
            subscribers::updated_at.eq(Utc::now().to_rfc3339()),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn update_max_leverage(&self, telegram_id: i64, leverage: Leverage) -> Result<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            subscribers::table
                .filter(subscribers::telegram_id.eq(telegram_id))
                .filter(subscribers::is_active.eq(true)),
        )
        .set((
            subscribers::max_leverage.eq(i32::try_from(leverage.value()).unwrap_or(i32::MAX)),
            subscribers::updated_at.eq(Utc::now().to_rfc3339()),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn deactivate_subscriber(&self, telegram_id: i64) -> Result<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(
            subscribers::table
                .filter(subscribers::telegram_id.eq(telegram_id))
                .filter(subscribers::is_active.eq(true)),
        )
        .set((
            subscribers::is_active.eq(false),
            subscribers::updated_at.eq(Utc::now().to_rfc3339()),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn stats(&self) -> Result<SubscriberStats> {
        let mut conn = self.conn()?;

        let total_subscribers: i64 = subscribers::table.count().get_result(&mut conn)?;
        let active_subscribers: i64 = subscribers::table
            .filter(subscribers::is_active.eq(true))
            .count()
            .get_result(&mut conn)?;
        let total_trades: i64 = trades::table
            .filter(trades::status.eq(TradeStatus::Success.as_str()))
            .count()
            .get_result(&mut conn)?;
        let active_signals: i64 = signals::table
            .filter(signals::status.eq(SignalStatus::Active.as_str()))
            .count()
            .get_result(&mut conn)?;

        Ok(SubscriberStats {
            total_subscribers,
            active_subscribers,
            total_trades,
            active_signals,
        })
    }

    async fn ping(&self) -> Result<()> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get_timeout(PING_TIMEOUT)
                .map_err(|e| Error::Connection(e.to_string()))?;
            diesel::sql_query("SELECT 1").execute(&mut conn)?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Connection(format!("database ping task failed: {e}")))?
    }
}

#[async_trait]
impl SignalStore for SqliteStore {
    async fn save_signal(&self, signal: &Signal) -> Result<()> {
        let row = Self::signal_to_row(signal, &Utc::now().to_rfc3339());
        let mut conn = self.conn()?;

        diesel::replace_into(signals::table)
            .values(&row)
            .execute(&mut conn)?;

        Ok(())
    }

    async fn get_signal(&self, id: &SignalId) -> Result<Option<StoredSignal>> {
        let mut conn = self.conn()?;
        let row: Option<SignalRow> = signals::table
            .find(id.as_str())
            .select(SignalRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(Self::signal_from_row).transpose()
    }

    async fn update_signal_risk(
        &self,
        id: &SignalId,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<bool> {
        let mut conn = self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            let current: Option<(Option<f64>, Option<f64>)> = signals::table
                .find(id.as_str())
                .select((signals::stop_loss, signals::take_profit))
                .first(conn)
                .optional()?;

            let Some((current_sl, current_tp)) = current else {
                return Ok(false);
            };

            diesel::update(signals::table.find(id.as_str()))
                .set((
                    signals::stop_loss.eq(stop_loss.map(decimal_to_f64).or(current_sl)),
                    signals::take_profit.eq(take_profit.map(decimal_to_f64).or(current_tp)),
                ))
                .execute(conn)?;
            Ok(true)
        })
    }

    async fn close_signal(&self, id: &SignalId) -> Result<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(signals::table.find(id.as_str()))
            .set((
                signals::status.eq(SignalStatus::Closed.as_str()),
                signals::closed_at.eq(Some(Utc::now().to_rfc3339())),
            ))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    async fn record_trade(&self, record: &TradeRecord) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let row = NewTradeRow {
            telegram_id: record.telegram_id,
            signal_id: record.signal_id.to_string(),
            symbol: record.symbol.clone(),
            side: record.side.as_str().to_string(),
            order_type: record.order_type.as_str().to_string(),
            status: record.status.as_str().to_string(),
            quantity: record.quantity.map(decimal_to_f64),
            entry_price: record.entry_price.map(decimal_to_f64),
            order_id: record.order_id.clone(),
            error_message: record.error_message.clone(),
            created_at: now.clone(),
        };

        let mut conn = self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            diesel::insert_into(trades::table)
                .values(&row)
                .execute(conn)?;

            if record.status == TradeStatus::Success {
                diesel::update(subscribers::table.find(record.telegram_id))
                    .set((
                        subscribers::total_trades.eq(subscribers::total_trades + 1),
                        subscribers::updated_at.eq(&now),
                    ))
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    async fn successful_trades(&self, id: &SignalId) -> Result<Vec<TradeRecord>> {
        let mut conn = self.conn()?;
        let rows: Vec<TradeRow> = trades::table
            .filter(trades::signal_id.eq(id.as_str()))
            .filter(trades::status.eq(TradeStatus::Success.as_str()))
            .order(trades::id.asc())
            .select(TradeRow::as_select())
            .load(&mut conn)?;

        rows.into_iter().map(Self::trade_from_row).collect()
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(e.to_string()))
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn f64_to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().normalize()
}
