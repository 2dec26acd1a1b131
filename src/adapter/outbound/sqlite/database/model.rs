//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{signals, subscribers, trades};

/// Database row for a subscriber. Credentials are stored encrypted.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = subscribers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SubscriberRow {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub api_key_enc: String,
    pub api_secret_enc: String,
    pub trade_amount_usdt: f64,
    pub max_leverage: i32,
    pub is_active: bool,
    pub total_trades: i64,
    pub total_pnl: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields overwritten when a known user registers again.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = subscribers)]
#[diesel(treat_none_as_null = true)]
pub struct SubscriberRegistration {
    pub username: Option<String>,
    pub api_key_enc: String,
    pub api_secret_enc: String,
    pub trade_amount_usdt: f64,
    pub max_leverage: i32,
    pub is_active: bool,
    pub updated_at: String,
}

/// Database row for a signal.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = signals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SignalRow {
    pub signal_id: String,
    pub symbol: String,
    pub signal_type: String,
    pub order_type: String,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub leverage: i32,
    pub status: String,
    pub created_at: String,
    pub closed_at: Option<String>,
}

/// Database row for a trade (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = trades)]
pub struct NewTradeRow {
    pub telegram_id: i64,
    pub signal_id: String,
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub status: String,
    pub quantity: Option<f64>,
    pub entry_price: Option<f64>,
    pub order_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}

/// Database row for a trade (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = trades)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TradeRow {
    pub id: Option<i32>,
    pub telegram_id: i64,
    pub signal_id: String,
    pub symbol: String,
    pub side: String,
    pub order_type: String,
    pub status: String,
    pub quantity: Option<f64>,
    pub entry_price: Option<f64>,
    pub order_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}
