//! Exchange port for balances, orders, and positions.
//!
//! One [`FuturesExchange`] handle is bound to one subscriber's credentials.
//! The [`ExchangeConnector`] builds those handles so the broadcaster never
//! deals with authentication details.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::signal::{OrderType, Side};
use crate::domain::subscriber::ApiCredentials;
use crate::error::ExchangeError;

/// Margin mode applied when setting leverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginType {
    Isolated,
    Cross,
}

impl MarginType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Isolated => "ISOLATED",
            Self::Cross => "CROSS",
        }
    }
}

/// Tradeable futures contract metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub symbol: String,
    /// Smallest quantity increment.
    pub quantity_step: Decimal,
    pub min_quantity: Decimal,
    pub max_quantity: Option<Decimal>,
    /// Last traded price, used to size market orders without an entry.
    pub last_price: Option<Decimal>,
}

/// Order placement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Required for limit orders.
    pub price: Option<Decimal>,
    pub leverage: u32,
}

/// Acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: String,
}

/// An open futures position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub position_id: String,
    pub symbol: String,
    pub side: Option<Side>,
    pub quantity: Decimal,
}

/// Futures account operations for a single subscriber.
#[async_trait]
pub trait FuturesExchange: Send + Sync {
    /// Available USDT balance in the futures wallet.
    async fn futures_balance(&self) -> Result<Decimal, ExchangeError>;

    /// Contract metadata, or `None` when the symbol is not listed.
    async fn asset(&self, symbol: &str) -> Result<Option<Asset>, ExchangeError>;

    async fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        margin: MarginType,
    ) -> Result<(), ExchangeError>;

    async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ExchangeError>;

    async fn open_positions(&self) -> Result<Vec<Position>, ExchangeError>;

    /// Attach or replace stop loss / take profit on a position.
    async fn set_risk_order(
        &self,
        position_id: &str,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<(), ExchangeError>;

    async fn close_position(&self, position_id: &str) -> Result<(), ExchangeError>;

    async fn close_partial(&self, position_id: &str, quantity: Decimal)
        -> Result<(), ExchangeError>;

    /// Find the open position for a symbol, if any.
    async fn position_for_symbol(&self, symbol: &str) -> Result<Option<Position>, ExchangeError> {
        let positions = self.open_positions().await?;
        Ok(positions.into_iter().find(|p| p.symbol.eq_ignore_ascii_case(symbol)))
    }
}

/// Builds exchange handles for subscriber credentials.
pub trait ExchangeConnector: Send + Sync {
    fn connect(&self, credentials: &ApiCredentials) -> Arc<dyn FuturesExchange>;

    /// Exchange name for logs and messages.
    fn exchange_name(&self) -> &'static str;
}
