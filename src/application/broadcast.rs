//! Signal fan-out to subscriber accounts.
//!
//! [`SignalBroadcaster`] executes one admin instruction on every affected
//! subscriber's exchange account concurrently. Each subscriber runs in its
//! own task, so one account failing (or panicking) only produces a failed
//! [`TradeResult`] for that subscriber.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::domain::error::DomainError;
use crate::domain::quantity::{partial_close_quantity, quantity_from_usd, SizedQuantity};
use crate::domain::signal::{OrderType, Signal, SignalClose, SignalStatus, SignalUpdate};
use crate::domain::subscriber::Subscriber;
use crate::domain::trade::{TradeRecord, TradeResult, TradeStatus};
use crate::error::{ExchangeError, Result};
use crate::port::outbound::exchange::{
    ExchangeConnector, FuturesExchange, MarginType, OrderRequest,
};
use crate::port::outbound::store::Store;

/// Executes signals and follow-ups across all subscribers.
#[derive(Clone)]
pub struct SignalBroadcaster {
    store: Arc<dyn Store>,
    connector: Arc<dyn ExchangeConnector>,
}

/// What happened on one account, before it becomes a result and a record.
struct Execution {
    status: TradeStatus,
    message: String,
    error: Option<String>,
    sized: Option<SizedQuantity>,
    order_id: Option<String>,
}

impl Execution {
    fn failed(status: TradeStatus, message: String, error: Option<String>) -> Self {
        Self {
            status,
            message,
            error,
            sized: None,
            order_id: None,
        }
    }
}

impl SignalBroadcaster {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, connector: Arc<dyn ExchangeConnector>) -> Self {
        Self { store, connector }
    }

    /// Execute a new signal for every active subscriber.
    ///
    /// The signal is persisted only when at least one subscriber exists.
    ///
    /// # Errors
    /// Returns an error when the subscriber list or signal cannot be
    /// read or written. Per-subscriber failures are reported in the results.
    pub async fn broadcast_signal(&self, signal: &Signal) -> Result<Vec<TradeResult>> {
        let subscribers = self.store.active_subscribers().await?;
        if subscribers.is_empty() {
            warn!(signal_id = %signal.id, "No active subscribers for signal");
            return Ok(Vec::new());
        }

        self.store.save_signal(signal).await?;
        info!(
            signal_id = %signal.id,
            symbol = %signal.symbol,
            side = %signal.side,
            subscribers = subscribers.len(),
            exchange = self.connector.exchange_name(),
            "Broadcasting signal"
        );

        let signal = Arc::new(signal.clone());
        let results = fan_out(subscribers, |subscriber| {
            let this = self.clone();
            let signal = Arc::clone(&signal);
            async move { this.execute_for_subscriber(&signal, &subscriber).await }
        })
        .await;

        let success = results.iter().filter(|r| r.is_success()).count();
        info!(
            signal_id = %signal.id,
            success,
            total = results.len(),
            "Broadcast complete"
        );
        Ok(results)
    }

    /// Open the signal's position on one subscriber's account and record it.
    pub async fn execute_for_subscriber(
        &self,
        signal: &Signal,
        subscriber: &Subscriber,
    ) -> TradeResult {
        let exchange = self.connector.connect(&subscriber.credentials);
        let execution = match open_position(exchange.as_ref(), signal, subscriber).await {
            Ok(execution) => execution,
            Err(e) => {
                error!(
                    subscriber_id = subscriber.telegram_id,
                    signal_id = %signal.id,
                    error = %e,
                    "Trade execution failed"
                );
                Execution::failed(
                    TradeStatus::ApiError,
                    format!("Exchange error: {e}"),
                    Some(e.to_string()),
                )
            }
        };

        let record = TradeRecord {
            telegram_id: subscriber.telegram_id,
            signal_id: signal.id.clone(),
            symbol: signal.symbol.clone(),
            side: signal.side,
            order_type: signal.order_type,
            status: execution.status,
            quantity: execution.sized.as_ref().map(|s| s.quantity),
            entry_price: signal.entry_price,
            order_id: execution.order_id.clone(),
            error_message: execution.error.clone(),
        };
        if let Err(e) = self.store.record_trade(&record).await {
            error!(
                subscriber_id = subscriber.telegram_id,
                signal_id = %signal.id,
                error = %e,
                "Failed to record trade"
            );
        }

        TradeResult {
            subscriber_id: subscriber.telegram_id,
            username: subscriber.username.clone(),
            status: execution.status,
            message: execution.message,
            order_id: execution.order_id,
            quantity: execution.sized.as_ref().map(SizedQuantity::quantity_text),
            actual_value: execution.sized.map(|s| s.actual_value),
        }
    }

    /// Move stop loss / take profit on every position opened by a signal.
    ///
    /// # Errors
    /// Returns [`DomainError::SignalNotFound`] or [`DomainError::SignalClosed`]
    /// when the signal cannot be updated, or a storage error.
    pub async fn broadcast_update(&self, update: &SignalUpdate) -> Result<Vec<TradeResult>> {
        let stored = self
            .store
            .get_signal(&update.id)
            .await?
            .ok_or_else(|| DomainError::SignalNotFound(update.id.to_string()))?;
        if stored.status == SignalStatus::Closed {
            return Err(DomainError::SignalClosed(update.id.to_string()).into());
        }

        let stop_loss = update.stop_loss.or(stored.signal.stop_loss);
        let take_profit = update.take_profit.or(stored.signal.take_profit);
        let symbol = Arc::new(stored.signal.symbol.clone());
        let subscribers = self.followup_subscribers(&stored.signal).await?;
        info!(
            signal_id = %update.id,
            subscribers = subscribers.len(),
            "Broadcasting risk update"
        );

        let results = fan_out(subscribers, |subscriber| {
            let connector = Arc::clone(&self.connector);
            let symbol = Arc::clone(&symbol);
            async move {
                let exchange = connector.connect(&subscriber.credentials);
                let (status, message) =
                    match update_risk(exchange.as_ref(), &symbol, stop_loss, take_profit).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(subscriber_id = subscriber.telegram_id, error = %e, "Risk update failed");
                            (TradeStatus::ApiError, format!("Update failed: {e}"))
                        }
                    };
                TradeResult::new(subscriber.telegram_id, subscriber.username, status, message)
            }
        })
        .await;

        self.store
            .update_signal_risk(&update.id, update.stop_loss, update.take_profit)
            .await?;
        Ok(results)
    }

    /// Close (fully or partially) every position opened by a signal.
    ///
    /// A full close marks the signal closed.
    ///
    /// # Errors
    /// Returns [`DomainError::SignalNotFound`] or [`DomainError::SignalClosed`]
    /// when the signal cannot be closed, or a storage error.
    pub async fn broadcast_close(&self, close: &SignalClose) -> Result<Vec<TradeResult>> {
        let stored = self
            .store
            .get_signal(&close.id)
            .await?
            .ok_or_else(|| DomainError::SignalNotFound(close.id.to_string()))?;
        if stored.status == SignalStatus::Closed {
            return Err(DomainError::SignalClosed(close.id.to_string()).into());
        }

        let percent = close.partial_percent.filter(|_| !close.is_full());
        let symbol = Arc::new(stored.signal.symbol.clone());
        let subscribers = self.followup_subscribers(&stored.signal).await?;
        info!(
            signal_id = %close.id,
            subscribers = subscribers.len(),
            partial = ?percent,
            "Broadcasting close"
        );

        let results = fan_out(subscribers, |subscriber| {
            let connector = Arc::clone(&self.connector);
            let symbol = Arc::clone(&symbol);
            async move {
                let exchange = connector.connect(&subscriber.credentials);
                let (status, message) =
                    match close_position(exchange.as_ref(), &symbol, percent).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(subscriber_id = subscriber.telegram_id, error = %e, "Close failed");
                            (TradeStatus::ApiError, format!("Close failed: {e}"))
                        }
                    };
                TradeResult::new(subscriber.telegram_id, subscriber.username, status, message)
            }
        })
        .await;

        if percent.is_none() {
            self.store.close_signal(&close.id).await?;
        }
        Ok(results)
    }

    /// Subscribers holding a successful entry for the signal, once each.
    async fn followup_subscribers(&self, signal: &Signal) -> Result<Vec<Subscriber>> {
        let trades = self.store.successful_trades(&signal.id).await?;
        let mut ids: Vec<i64> = Vec::with_capacity(trades.len());
        for trade in trades {
            if !ids.contains(&trade.telegram_id) {
                ids.push(trade.telegram_id);
            }
        }

        let mut subscribers = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.get_subscriber(id).await {
                Ok(Some(subscriber)) => subscribers.push(subscriber),
                Ok(None) => warn!(subscriber_id = id, "Trade owner no longer exists"),
                Err(e) => warn!(subscriber_id = id, error = %e, "Failed to load subscriber"),
            }
        }
        Ok(subscribers)
    }
}

/// Run `task` for every subscriber in its own tokio task and collect results
/// in subscriber order.
async fn fan_out<F, Fut>(subscribers: Vec<Subscriber>, task: F) -> Vec<TradeResult>
where
    F: Fn(Subscriber) -> Fut,
    Fut: Future<Output = TradeResult> + Send + 'static,
{
    let mut owners = Vec::with_capacity(subscribers.len());
    let mut handles = Vec::with_capacity(subscribers.len());
    for subscriber in subscribers {
        owners.push((subscriber.telegram_id, subscriber.username.clone()));
        handles.push(tokio::spawn(task(subscriber)));
    }

    join_all(handles)
        .await
        .into_iter()
        .zip(owners)
        .map(|(joined, (id, username))| {
            joined.unwrap_or_else(|e| {
                error!(subscriber_id = id, error = %e, "Subscriber task aborted");
                TradeResult::new(
                    id,
                    username,
                    TradeStatus::ApiError,
                    format!("Execution aborted: {e}"),
                )
            })
        })
        .collect()
}

async fn open_position(
    exchange: &dyn FuturesExchange,
    signal: &Signal,
    subscriber: &Subscriber,
) -> std::result::Result<Execution, ExchangeError> {
    let amount = subscriber.trade_amount_usdt;

    let balance = exchange.futures_balance().await?;
    if balance < amount {
        info!(
            subscriber_id = subscriber.telegram_id,
            %balance,
            %amount,
            "Insufficient balance"
        );
        return Ok(Execution::failed(
            TradeStatus::InsufficientBalance,
            format!("Insufficient balance: {balance:.2} USDT (need {amount} USDT)"),
            Some(format!("Balance: {balance:.2} USDT")),
        ));
    }

    let Some(asset) = exchange.asset(&signal.symbol).await? else {
        return Ok(Execution::failed(
            TradeStatus::SymbolNotFound,
            format!("Symbol not found: {}", signal.symbol),
            Some(format!("Symbol not found: {}", signal.symbol)),
        ));
    };

    let leverage = subscriber.effective_leverage(signal.leverage);
    exchange
        .set_leverage(&signal.symbol, leverage, MarginType::Isolated)
        .await?;

    let Some(price) = signal.entry_price.or(asset.last_price) else {
        return Ok(Execution::failed(
            TradeStatus::ApiError,
            format!("No reference price for {}", signal.symbol),
            Some("no reference price".to_string()),
        ));
    };

    let Some(sized) = quantity_from_usd(
        amount,
        price,
        asset.quantity_step,
        asset.min_quantity,
        asset.max_quantity,
    ) else {
        let message = format!("Quantity out of range at price {}", price.normalize());
        return Ok(Execution::failed(
            TradeStatus::ApiError,
            message.clone(),
            Some(message),
        ));
    };
    if sized.is_zero() || sized.quantity < asset.min_quantity {
        let message = format!(
            "Quantity too small: {} < {}",
            sized.quantity_text(),
            asset.min_quantity.normalize()
        );
        return Ok(Execution::failed(
            TradeStatus::ApiError,
            message.clone(),
            Some(message),
        ));
    }

    let request = OrderRequest {
        symbol: signal.symbol.clone(),
        side: signal.side,
        order_type: signal.order_type,
        quantity: sized.quantity,
        price: match signal.order_type {
            OrderType::Limit => signal.entry_price,
            OrderType::Market => None,
        },
        leverage,
    };
    let order = exchange.place_order(&request).await?;
    info!(
        subscriber_id = subscriber.telegram_id,
        signal_id = %signal.id,
        order_id = %order.order_id,
        quantity = %sized.quantity,
        leverage,
        "Order placed"
    );

    let mut message = format!(
        "{} {} {} (~${:.2})",
        signal.side,
        sized.quantity_text(),
        signal.symbol,
        sized.actual_value
    );
    if signal.has_risk_orders() {
        message.push_str(&attach_risk_orders(exchange, signal).await);
    }

    Ok(Execution {
        status: TradeStatus::Success,
        message,
        error: None,
        sized: Some(sized),
        order_id: Some(order.order_id),
    })
}

/// Attach SL/TP after the entry. Never fails the trade; returns the message
/// suffix describing what happened.
async fn attach_risk_orders(exchange: &dyn FuturesExchange, signal: &Signal) -> String {
    let position = match exchange.position_for_symbol(&signal.symbol).await {
        Ok(Some(position)) => position,
        Ok(None) => return " | No position for SL/TP".to_string(),
        Err(e) => {
            warn!(symbol = %signal.symbol, error = %e, "Failed to look up position for SL/TP");
            return format!(" | SL/TP failed: {e}");
        }
    };

    match exchange
        .set_risk_order(&position.position_id, signal.stop_loss, signal.take_profit)
        .await
    {
        Ok(()) => " | SL/TP set".to_string(),
        Err(e) => {
            warn!(position_id = %position.position_id, error = %e, "Failed to set SL/TP");
            format!(" | SL/TP failed: {e}")
        }
    }
}

async fn update_risk(
    exchange: &dyn FuturesExchange,
    symbol: &str,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
) -> std::result::Result<(TradeStatus, String), ExchangeError> {
    let Some(position) = exchange.position_for_symbol(symbol).await? else {
        return Ok((
            TradeStatus::Skipped,
            format!("No open position for {symbol}"),
        ));
    };

    exchange
        .set_risk_order(&position.position_id, stop_loss, take_profit)
        .await?;
    Ok((
        TradeStatus::Success,
        format!(
            "{symbol} SL {} | TP {}",
            stop_loss.map_or_else(|| "-".to_string(), |p| p.normalize().to_string()),
            take_profit.map_or_else(|| "-".to_string(), |p| p.normalize().to_string()),
        ),
    ))
}

async fn close_position(
    exchange: &dyn FuturesExchange,
    symbol: &str,
    percent: Option<Decimal>,
) -> std::result::Result<(TradeStatus, String), ExchangeError> {
    let Some(position) = exchange.position_for_symbol(symbol).await? else {
        return Ok((
            TradeStatus::Skipped,
            format!("No open position for {symbol}"),
        ));
    };

    let Some(percent) = percent else {
        exchange.close_position(&position.position_id).await?;
        return Ok((TradeStatus::Success, format!("{symbol} position closed")));
    };

    let step = exchange
        .asset(symbol)
        .await?
        .map_or(Decimal::ZERO, |asset| asset.quantity_step);
    let Some(quantity) = partial_close_quantity(position.quantity, percent, step) else {
        return Ok((
            TradeStatus::ApiError,
            format!("Partial close quantity out of range for {symbol}"),
        ));
    };
    if quantity.is_zero() {
        return Ok((
            TradeStatus::Skipped,
            format!("{}% of {} rounds to zero", percent.normalize(), position.quantity.normalize()),
        ));
    }

    exchange
        .close_partial(&position.position_id, quantity)
        .await?;
    Ok((
        TradeStatus::Success,
        format!(
            "Closed {}% of {symbol} ({} closed)",
            percent.normalize(),
            quantity.normalize()
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::domain::id::SignalId;
    use crate::domain::signal::Side;
    use crate::error::Error;
    use crate::port::outbound::store::{SignalStore, SubscriberStore};
    use crate::testkit::domain::{asset, limit_signal, market_signal, new_subscriber, xrp};
    use crate::testkit::exchange::{ExchangeCall, MockConnector, ScriptedExchange};
    use crate::testkit::store::MemoryStore;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<MemoryStore>,
        broadcaster: SignalBroadcaster,
    }

    fn fixture(connector: MockConnector) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let broadcaster = SignalBroadcaster::new(store.clone(), Arc::new(connector));
        Fixture { store, broadcaster }
    }

    #[tokio::test]
    async fn no_subscribers_means_nothing_saved() {
        let f = fixture(MockConnector::default());
        let signal = market_signal("SIG-EMPTY", "XRPUSDT");

        let results = f.broadcaster.broadcast_signal(&signal).await.unwrap();

        assert!(results.is_empty());
        assert!(f.store.get_signal(&signal.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn each_subscriber_gets_its_own_outcome() {
        let rich = Arc::new(ScriptedExchange::new().with_asset(xrp()));
        let poor = Arc::new(ScriptedExchange::new().with_balance(dec!(10)).with_asset(xrp()));
        let unlisted = Arc::new(ScriptedExchange::new());
        let connector = MockConnector::default()
            .with_account("rich-key-000", rich.clone())
            .with_account("poor-key-000", poor.clone())
            .with_account("none-key-000", unlisted);
        let f = fixture(connector);
        for (id, key) in [(1, "rich-key-000"), (2, "poor-key-000"), (3, "none-key-000")] {
            f.store
                .upsert_subscriber(&new_subscriber(id, key, dec!(50)))
                .await
                .unwrap();
        }

        let signal = market_signal("SIG-MIX", "XRPUSDT");
        let results = f.broadcaster.broadcast_signal(&signal).await.unwrap();

        let statuses: Vec<_> = results.iter().map(|r| (r.subscriber_id, r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (1, TradeStatus::Success),
                (2, TradeStatus::InsufficientBalance),
                (3, TradeStatus::SymbolNotFound),
            ]
        );
        assert_eq!(results[0].quantity.as_deref(), Some("25"));
        assert_eq!(results[0].actual_value, Some(dec!(50)));
        assert!(results[1].message.contains("10.00 USDT"));
        assert!(poor.placed_orders().is_empty());

        assert!(f.store.get_signal(&signal.id).await.unwrap().is_some());
        assert_eq!(f.store.trades().len(), 3);
        let rich_sub = f.store.get_subscriber(1).await.unwrap().unwrap();
        assert_eq!(rich_sub.total_trades, 1);
        let poor_sub = f.store.get_subscriber(2).await.unwrap().unwrap();
        assert_eq!(poor_sub.total_trades, 0);
    }

    #[tokio::test]
    async fn limit_order_uses_entry_price_and_attaches_stop_loss() {
        let exchange = Arc::new(ScriptedExchange::new().with_asset(xrp()));
        let f = fixture(MockConnector::new(exchange.clone()));
        f.store
            .upsert_subscriber(&new_subscriber(1, "key-0000000001", dec!(50)))
            .await
            .unwrap();

        let mut signal = limit_signal("SIG-LMT", "XRPUSDT", Side::Short, dec!(2.5), dec!(2.8));
        signal.leverage = 50;
        let results = f.broadcaster.broadcast_signal(&signal).await.unwrap();

        assert_eq!(results[0].status, TradeStatus::Success);
        assert!(results[0].message.ends_with("| SL/TP set"));

        let orders = exchange.placed_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].quantity, dec!(20));
        assert_eq!(orders[0].price, Some(dec!(2.5)));
        assert_eq!(orders[0].leverage, 20);

        let calls = exchange.calls();
        assert!(calls.contains(&ExchangeCall::SetLeverage {
            symbol: "XRPUSDT".into(),
            leverage: 20,
            margin: MarginType::Isolated,
        }));
        assert!(calls.contains(&ExchangeCall::SetRiskOrder {
            position_id: "pos-XRPUSDT".into(),
            stop_loss: Some(dec!(2.8)),
            take_profit: None,
        }));
    }

    #[tokio::test]
    async fn failed_stop_loss_keeps_the_trade() {
        let exchange = Arc::new(
            ScriptedExchange::new()
                .with_asset(xrp())
                .with_risk_error(ExchangeError::Api {
                    code: Some(400),
                    message: "price out of range".into(),
                }),
        );
        let f = fixture(MockConnector::new(exchange));
        f.store
            .upsert_subscriber(&new_subscriber(1, "key-0000000001", dec!(50)))
            .await
            .unwrap();

        let signal = limit_signal("SIG-SL", "XRPUSDT", Side::Long, dec!(2), dec!(1.8));
        let results = f.broadcaster.broadcast_signal(&signal).await.unwrap();

        assert_eq!(results[0].status, TradeStatus::Success);
        assert!(results[0].message.contains("SL/TP failed"));
    }

    #[tokio::test]
    async fn rejected_order_is_an_api_error() {
        let exchange = Arc::new(
            ScriptedExchange::new()
                .with_asset(xrp())
                .with_order_error(ExchangeError::Api {
                    code: None,
                    message: "margin mode locked".into(),
                }),
        );
        let f = fixture(MockConnector::new(exchange));
        f.store
            .upsert_subscriber(&new_subscriber(1, "key-0000000001", dec!(50)))
            .await
            .unwrap();

        let results = f
            .broadcaster
            .broadcast_signal(&market_signal("SIG-REJ", "XRPUSDT"))
            .await
            .unwrap();

        assert_eq!(results[0].status, TradeStatus::ApiError);
        assert!(results[0].message.contains("margin mode locked"));
        let trades = f.store.trades();
        assert_eq!(trades[0].status, TradeStatus::ApiError);
        assert!(trades[0].error_message.is_some());
    }

    #[tokio::test]
    async fn amount_below_one_step_is_rejected() {
        let btc = asset("BTCUSDT", dec!(1), dec!(0), dec!(60000));
        let exchange = Arc::new(ScriptedExchange::new().with_asset(btc));
        let f = fixture(MockConnector::new(exchange.clone()));
        f.store
            .upsert_subscriber(&new_subscriber(1, "key-0000000001", dec!(5)))
            .await
            .unwrap();

        let results = f
            .broadcaster
            .broadcast_signal(&market_signal("SIG-TINY", "BTCUSDT"))
            .await
            .unwrap();

        assert_eq!(results[0].status, TradeStatus::ApiError);
        assert!(results[0].message.starts_with("Quantity too small"));
        assert!(exchange.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn oversized_quantity_is_recorded_as_api_error() {
        let exchange = Arc::new(
            ScriptedExchange::new()
                .with_balance(dec!(20000))
                .with_asset(xrp()),
        );
        let f = fixture(MockConnector::new(exchange.clone()));
        f.store
            .upsert_subscriber(&new_subscriber(1, "key-0000000001", dec!(10000)))
            .await
            .unwrap();

        let mut signal = market_signal("SIG-DUST", "XRPUSDT");
        signal.entry_price = Some(Decimal::new(1, 28));
        let results = f.broadcaster.broadcast_signal(&signal).await.unwrap();

        assert_eq!(results[0].status, TradeStatus::ApiError);
        assert!(results[0].message.starts_with("Quantity out of range"));
        assert!(exchange.placed_orders().is_empty());
        let trades = f.store.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].status, TradeStatus::ApiError);
    }

    #[tokio::test]
    async fn followups_on_unknown_or_closed_signals_fail() {
        let f = fixture(MockConnector::default());
        let missing = SignalUpdate {
            id: SignalId::new("SIG-NONE"),
            stop_loss: Some(dec!(1)),
            take_profit: None,
        };
        let err = f.broadcaster.broadcast_update(&missing).await.unwrap_err();
        assert!(matches!(err, Error::Domain(DomainError::SignalNotFound(_))));

        let signal = market_signal("SIG-DONE", "XRPUSDT");
        f.store.save_signal(&signal).await.unwrap();
        f.store.close_signal(&signal.id).await.unwrap();
        let close = SignalClose {
            id: signal.id.clone(),
            partial_percent: None,
        };
        let err = f.broadcaster.broadcast_close(&close).await.unwrap_err();
        assert!(matches!(err, Error::Domain(DomainError::SignalClosed(_))));
    }

    #[tokio::test]
    async fn update_reaches_only_filled_subscribers() {
        let filled = Arc::new(ScriptedExchange::new().with_asset(xrp()));
        let gone = Arc::new(ScriptedExchange::new().with_asset(xrp()));
        let broke = Arc::new(ScriptedExchange::new().with_balance(dec!(1)).with_asset(xrp()));
        let connector = MockConnector::default()
            .with_account("filled-key-0", filled.clone())
            .with_account("gone-key-000", gone.clone())
            .with_account("broke-key-00", broke.clone());
        let f = fixture(connector);
        for (id, key) in [(1, "filled-key-0"), (2, "gone-key-000"), (3, "broke-key-00")] {
            f.store
                .upsert_subscriber(&new_subscriber(id, key, dec!(50)))
                .await
                .unwrap();
        }
        let signal = limit_signal("SIG-UPD", "XRPUSDT", Side::Long, dec!(2), dec!(1.8));
        f.broadcaster.broadcast_signal(&signal).await.unwrap();
        // Subscriber 2 closed the position manually.
        gone.close_position("pos-XRPUSDT").await.unwrap();

        let update = SignalUpdate {
            id: signal.id.clone(),
            stop_loss: Some(dec!(1.9)),
            take_profit: None,
        };
        let results = f.broadcaster.broadcast_update(&update).await.unwrap();

        assert_eq!(results.len(), 2);
        let by_id = |id: i64| results.iter().find(|r| r.subscriber_id == id).unwrap();
        assert_eq!(by_id(1).status, TradeStatus::Success);
        assert_eq!(by_id(1).message, "XRPUSDT SL 1.9 | TP -");
        assert_eq!(by_id(2).status, TradeStatus::Skipped);
        assert!(!broke
            .calls()
            .iter()
            .any(|c| matches!(c, ExchangeCall::SetRiskOrder { .. })));

        let stored = f.store.get_signal(&signal.id).await.unwrap().unwrap();
        assert_eq!(stored.signal.stop_loss, Some(dec!(1.9)));
        assert_eq!(stored.signal.entry_price, Some(dec!(2)));
        // Follow-ups are not trades.
        assert_eq!(f.store.trades().len(), 3);
    }

    #[tokio::test]
    async fn partial_close_keeps_signal_active() {
        let exchange = Arc::new(ScriptedExchange::new().with_asset(xrp()));
        let f = fixture(MockConnector::new(exchange.clone()));
        f.store
            .upsert_subscriber(&new_subscriber(1, "key-0000000001", dec!(50)))
            .await
            .unwrap();
        let signal = market_signal("SIG-PART", "XRPUSDT");
        f.broadcaster.broadcast_signal(&signal).await.unwrap();

        let close = SignalClose {
            id: signal.id.clone(),
            partial_percent: Some(dec!(30)),
        };
        let results = f.broadcaster.broadcast_close(&close).await.unwrap();

        assert_eq!(results[0].status, TradeStatus::Success);
        assert_eq!(results[0].message, "Closed 30% of XRPUSDT (7.5 closed)");
        assert!(exchange.calls().contains(&ExchangeCall::ClosePartial {
            position_id: "pos-XRPUSDT".into(),
            quantity: dec!(7.5),
        }));
        let stored = f.store.get_signal(&signal.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SignalStatus::Active);
    }

    #[tokio::test]
    async fn full_close_marks_signal_closed() {
        let exchange = Arc::new(ScriptedExchange::new().with_asset(xrp()));
        let f = fixture(MockConnector::new(exchange.clone()));
        f.store
            .upsert_subscriber(&new_subscriber(1, "key-0000000001", dec!(50)))
            .await
            .unwrap();
        let signal = market_signal("SIG-FULL", "XRPUSDT");
        f.broadcaster.broadcast_signal(&signal).await.unwrap();

        let close = SignalClose {
            id: signal.id.clone(),
            partial_percent: Some(dec!(100)),
        };
        let results = f.broadcaster.broadcast_close(&close).await.unwrap();

        assert_eq!(results[0].message, "XRPUSDT position closed");
        assert!(exchange.positions().is_empty());
        let stored = f.store.get_signal(&signal.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SignalStatus::Closed);
    }
}
