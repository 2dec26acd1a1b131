//! Scripted exchange for broadcaster and bot tests.
//!
//! [`ScriptedExchange`] answers from in-memory state and records every
//! call. By default a placed order opens a position on its symbol, so
//! stop-loss attachment and later closes find something to act on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::subscriber::ApiCredentials;
use crate::error::ExchangeError;
use crate::port::outbound::exchange::{
    Asset, ExchangeConnector, FuturesExchange, MarginType, OrderRequest, PlacedOrder, Position,
};

/// A call made against a [`ScriptedExchange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeCall {
    Balance,
    Asset(String),
    SetLeverage {
        symbol: String,
        leverage: u32,
        margin: MarginType,
    },
    PlaceOrder(OrderRequest),
    OpenPositions,
    SetRiskOrder {
        position_id: String,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    },
    ClosePosition(String),
    ClosePartial {
        position_id: String,
        quantity: Decimal,
    },
}

struct Script {
    balance: Result<Decimal, ExchangeError>,
    balance_delay: Option<Duration>,
    assets: HashMap<String, Asset>,
    positions: Vec<Position>,
    order_error: Option<ExchangeError>,
    risk_error: Option<ExchangeError>,
    open_on_order: bool,
    next_order: u32,
}

/// In-memory [`FuturesExchange`].
pub struct ScriptedExchange {
    script: Mutex<Script>,
    calls: Mutex<Vec<ExchangeCall>>,
}

impl Default for ScriptedExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedExchange {
    /// 1000 USDT balance, no listed assets, no positions.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                balance: Ok(dec!(1000)),
                balance_delay: None,
                assets: HashMap::new(),
                positions: Vec::new(),
                order_error: None,
                risk_error: None,
                open_on_order: true,
                next_order: 1,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("lock exchange script")
    }

    fn record(&self, call: ExchangeCall) {
        self.calls.lock().expect("lock exchange calls").push(call);
    }

    #[must_use]
    pub fn with_balance(self, balance: Decimal) -> Self {
        self.script().balance = Ok(balance);
        self
    }

    #[must_use]
    pub fn with_balance_error(self, error: ExchangeError) -> Self {
        self.script().balance = Err(error);
        self
    }

    /// Delay balance responses, e.g. to trip a validation timeout.
    #[must_use]
    pub fn with_balance_delay(self, delay: Duration) -> Self {
        self.script().balance_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_asset(self, asset: Asset) -> Self {
        self.script()
            .assets
            .insert(asset.symbol.to_ascii_uppercase(), asset);
        self
    }

    #[must_use]
    pub fn with_position(self, position: Position) -> Self {
        self.script().positions.push(position);
        self
    }

    #[must_use]
    pub fn with_order_error(self, error: ExchangeError) -> Self {
        self.script().order_error = Some(error);
        self
    }

    #[must_use]
    pub fn with_risk_error(self, error: ExchangeError) -> Self {
        self.script().risk_error = Some(error);
        self
    }

    /// Keep placed orders from opening positions.
    #[must_use]
    pub fn without_fills(self) -> Self {
        self.script().open_on_order = false;
        self
    }

    /// Every call, in order.
    pub fn calls(&self) -> Vec<ExchangeCall> {
        self.calls.lock().expect("lock exchange calls").clone()
    }

    /// Order requests that reached the exchange.
    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ExchangeCall::PlaceOrder(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Positions currently open.
    pub fn positions(&self) -> Vec<Position> {
        self.script().positions.clone()
    }
}

#[async_trait]
impl FuturesExchange for ScriptedExchange {
    async fn futures_balance(&self) -> Result<Decimal, ExchangeError> {
        self.record(ExchangeCall::Balance);
        let delay = self.script().balance_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let balance = self.script().balance.clone();
        balance
    }

    async fn asset(&self, symbol: &str) -> Result<Option<Asset>, ExchangeError> {
        self.record(ExchangeCall::Asset(symbol.to_string()));
        Ok(self
            .script()
            .assets
            .get(&symbol.to_ascii_uppercase())
            .cloned())
    }

    async fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        margin: MarginType,
    ) -> Result<(), ExchangeError> {
        self.record(ExchangeCall::SetLeverage {
            symbol: symbol.to_string(),
            leverage,
            margin,
        });
        Ok(())
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<PlacedOrder, ExchangeError> {
        self.record(ExchangeCall::PlaceOrder(request.clone()));
        let mut script = self.script();
        if let Some(error) = script.order_error.clone() {
            return Err(error);
        }

        let order_id = format!("ord-{}", script.next_order);
        script.next_order += 1;
        if script.open_on_order {
            script.positions.push(Position {
                position_id: format!("pos-{}", request.symbol),
                symbol: request.symbol.clone(),
                side: Some(request.side),
                quantity: request.quantity,
            });
        }
        Ok(PlacedOrder { order_id })
    }

    async fn open_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.record(ExchangeCall::OpenPositions);
        Ok(self.script().positions.clone())
    }

    async fn set_risk_order(
        &self,
        position_id: &str,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> Result<(), ExchangeError> {
        self.record(ExchangeCall::SetRiskOrder {
            position_id: position_id.to_string(),
            stop_loss,
            take_profit,
        });
        match self.script().risk_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn close_position(&self, position_id: &str) -> Result<(), ExchangeError> {
        self.record(ExchangeCall::ClosePosition(position_id.to_string()));
        self.script()
            .positions
            .retain(|p| p.position_id != position_id);
        Ok(())
    }

    async fn close_partial(
        &self,
        position_id: &str,
        quantity: Decimal,
    ) -> Result<(), ExchangeError> {
        self.record(ExchangeCall::ClosePartial {
            position_id: position_id.to_string(),
            quantity,
        });
        let mut script = self.script();
        if let Some(position) = script
            .positions
            .iter_mut()
            .find(|p| p.position_id == position_id)
        {
            position.quantity -= quantity;
        }
        Ok(())
    }
}

/// Connector handing out a scripted exchange per API key.
///
/// Unknown keys get the fallback exchange.
pub struct MockConnector {
    accounts: Mutex<HashMap<String, Arc<ScriptedExchange>>>,
    fallback: Arc<ScriptedExchange>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new(Arc::new(ScriptedExchange::new()))
    }
}

impl MockConnector {
    pub fn new(fallback: Arc<ScriptedExchange>) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            fallback,
        }
    }

    /// Route `api_key` to `exchange`.
    #[must_use]
    pub fn with_account(self, api_key: &str, exchange: Arc<ScriptedExchange>) -> Self {
        self.accounts
            .lock()
            .expect("lock connector accounts")
            .insert(api_key.to_string(), exchange);
        self
    }
}

impl ExchangeConnector for MockConnector {
    fn connect(&self, credentials: &ApiCredentials) -> Arc<dyn FuturesExchange> {
        self.accounts
            .lock()
            .expect("lock connector accounts")
            .get(&credentials.api_key)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    fn exchange_name(&self) -> &'static str {
        "Scripted"
    }
}
