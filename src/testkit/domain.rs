//! Builders for domain values used across tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::id::SignalId;
use crate::domain::signal::{OrderType, Side, Signal};
use crate::domain::subscriber::{ApiCredentials, Leverage, NewSubscriber, TradeAmount};
use crate::port::outbound::exchange::{Asset, Position};

/// Market LONG signal on `symbol` with leverage 10 and no risk orders.
pub fn market_signal(id: &str, symbol: &str) -> Signal {
    Signal {
        id: SignalId::new(id),
        symbol: symbol.to_string(),
        side: Side::Long,
        order_type: OrderType::Market,
        entry_price: None,
        stop_loss: None,
        take_profit: None,
        leverage: 10,
    }
}

/// Limit signal with an entry price and stop loss.
pub fn limit_signal(id: &str, symbol: &str, side: Side, entry: Decimal, sl: Decimal) -> Signal {
    Signal {
        id: SignalId::new(id),
        symbol: symbol.to_string(),
        side,
        order_type: OrderType::Limit,
        entry_price: Some(entry),
        stop_loss: Some(sl),
        take_profit: None,
        leverage: 10,
    }
}

/// Credentials whose key is `api_key` and whose secret is derived from it.
pub fn credentials(api_key: &str) -> ApiCredentials {
    ApiCredentials::new(api_key, format!("{api_key}-secret"))
}

/// Registration for `telegram_id` trading `amount` USDT at up to 20x.
///
/// # Panics
///
/// Panics if `amount` is outside the accepted trade amount range.
pub fn new_subscriber(telegram_id: i64, api_key: &str, amount: Decimal) -> NewSubscriber {
    NewSubscriber {
        telegram_id,
        username: Some(format!("user{telegram_id}")),
        credentials: credentials(api_key),
        trade_amount: TradeAmount::new(amount).expect("valid trade amount"),
        max_leverage: Leverage::new(20).expect("valid leverage"),
    }
}

/// Contract with the given step, minimum quantity, and last price.
pub fn asset(symbol: &str, step: Decimal, min: Decimal, last_price: Decimal) -> Asset {
    Asset {
        symbol: symbol.to_string(),
        quantity_step: step,
        min_quantity: min,
        max_quantity: None,
        last_price: Some(last_price),
    }
}

/// `XRPUSDT` with a 0.1 step, minimum 1, last price 2.
pub fn xrp() -> Asset {
    asset("XRPUSDT", dec!(0.1), dec!(1), dec!(2))
}

/// Open LONG position.
pub fn position(position_id: &str, symbol: &str, quantity: Decimal) -> Position {
    Position {
        position_id: position_id.to_string(),
        symbol: symbol.to_string(),
        side: Some(Side::Long),
        quantity,
    }
}
