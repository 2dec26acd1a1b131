//! Signal command parsing.
//!
//! Admin signals are plain Telegram commands:
//!
//! ```text
//! /signal LONG BTCUSDT entry=65000 sl=63000 tp=70000 lev=10
//! /short ETHUSDT market sl=3900 10x
//! /update SIG-20260115-3FA9C2 sl=64000
//! /close SIG-20260115-3FA9C2 50%
//! ```
//!
//! Anything that is not one of these commands parses to `Ok(None)` so the
//! caller can hand it to the regular command handler.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::error::SignalParseError;
use super::id::SignalId;
use super::signal::{OrderType, ParsedSignal, Side, Signal, SignalClose, SignalUpdate, MAX_LEVERAGE};

/// Leverage applied when a signal does not specify one.
pub const DEFAULT_SIGNAL_LEVERAGE: u32 = 1;

/// Commands handled by [`parse_signal`], without the leading slash.
pub const SIGNAL_COMMANDS: [&str; 5] = ["signal", "long", "short", "update", "close"];

/// Parse a message into a signal instruction.
///
/// Returns `Ok(None)` for messages that are not signal commands.
pub fn parse_signal(text: &str) -> Result<Option<ParsedSignal>, SignalParseError> {
    let mut parts = text.split_whitespace();
    let Some(raw_command) = parts.next() else {
        return Ok(None);
    };
    if !raw_command.starts_with('/') {
        return Ok(None);
    }

    let command = raw_command
        .split_once('@')
        .map_or(raw_command, |(head, _)| head)
        .to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    match command.as_str() {
        "/signal" => parse_new(None, &args).map(|s| Some(ParsedSignal::New(s))),
        "/long" => parse_new(Some(Side::Long), &args).map(|s| Some(ParsedSignal::New(s))),
        "/short" => parse_new(Some(Side::Short), &args).map(|s| Some(ParsedSignal::New(s))),
        "/update" => parse_update(&args).map(|u| Some(ParsedSignal::Update(u))),
        "/close" => parse_close(&args).map(|c| Some(ParsedSignal::Close(c))),
        _ => Ok(None),
    }
}

enum PriceKey {
    Entry,
    StopLoss,
    TakeProfit,
    Leverage,
}

fn price_key(key: &str) -> Option<PriceKey> {
    match key.to_ascii_lowercase().as_str() {
        "entry" | "price" | "e" => Some(PriceKey::Entry),
        "sl" | "stop" | "stoploss" => Some(PriceKey::StopLoss),
        "tp" | "target" | "takeprofit" => Some(PriceKey::TakeProfit),
        "lev" | "leverage" => Some(PriceKey::Leverage),
        _ => None,
    }
}

fn parse_decimal(raw: &str, token: &str) -> Result<Decimal, SignalParseError> {
    Decimal::from_str(raw).map_err(|_| SignalParseError::InvalidNumber(token.to_string()))
}

fn parse_leverage(raw: &str, token: &str) -> Result<u32, SignalParseError> {
    let value: i64 = raw
        .parse()
        .map_err(|_| SignalParseError::InvalidNumber(token.to_string()))?;
    match u32::try_from(value) {
        Ok(lev) if (1..=MAX_LEVERAGE).contains(&lev) => Ok(lev),
        _ => Err(SignalParseError::LeverageOutOfRange(value)),
    }
}

fn require_positive(value: Option<Decimal>, field: &'static str) -> Result<(), SignalParseError> {
    match value {
        Some(v) if v <= Decimal::ZERO => Err(SignalParseError::NonPositivePrice(field)),
        _ => Ok(()),
    }
}

fn parse_new(side_hint: Option<Side>, args: &[&str]) -> Result<Signal, SignalParseError> {
    let mut args = args.iter().copied();

    let side = match side_hint {
        Some(side) => side,
        None => {
            let raw = args.next().ok_or(SignalParseError::MissingSide)?;
            Side::from_str(raw).map_err(|_| SignalParseError::InvalidSide(raw.to_string()))?
        }
    };

    let raw_symbol = args.next().ok_or(SignalParseError::MissingSymbol)?;
    if !raw_symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SignalParseError::InvalidSymbol(raw_symbol.to_string()));
    }
    let symbol = raw_symbol.to_ascii_uppercase();

    let mut explicit_type = None;
    let mut entry_price = None;
    let mut stop_loss = None;
    let mut take_profit = None;
    let mut leverage = None;

    for token in args {
        if let Ok(order_type) = OrderType::from_str(token) {
            explicit_type = Some(order_type);
            continue;
        }

        if let Some(raw) = token.strip_suffix(['x', 'X']) {
            if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
                leverage = Some(parse_leverage(raw, token)?);
                continue;
            }
        }

        let Some((key, value)) = token.split_once('=') else {
            return Err(SignalParseError::UnknownToken(token.to_string()));
        };
        match price_key(key) {
            Some(PriceKey::Entry) => entry_price = Some(parse_decimal(value, token)?),
            Some(PriceKey::StopLoss) => stop_loss = Some(parse_decimal(value, token)?),
            Some(PriceKey::TakeProfit) => take_profit = Some(parse_decimal(value, token)?),
            Some(PriceKey::Leverage) => leverage = Some(parse_leverage(value, token)?),
            None => return Err(SignalParseError::UnknownToken(token.to_string())),
        }
    }

    require_positive(entry_price, "entry")?;
    require_positive(stop_loss, "stop loss")?;
    require_positive(take_profit, "take profit")?;

    let order_type = explicit_type.unwrap_or(if entry_price.is_some() {
        OrderType::Limit
    } else {
        OrderType::Market
    });
    if order_type == OrderType::Limit && entry_price.is_none() {
        return Err(SignalParseError::LimitWithoutEntry);
    }

    if let Some(entry) = entry_price {
        check_price_relation(side, entry, stop_loss, take_profit)?;
    }

    Ok(Signal {
        id: SignalId::generate(),
        symbol,
        side,
        order_type,
        entry_price,
        stop_loss,
        take_profit,
        leverage: leverage.unwrap_or(DEFAULT_SIGNAL_LEVERAGE),
    })
}

fn check_price_relation(
    side: Side,
    entry: Decimal,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
) -> Result<(), SignalParseError> {
    let (sl_ok, tp_ok, sl_word, tp_word) = match side {
        Side::Long => (
            stop_loss.map_or(true, |sl| sl < entry),
            take_profit.map_or(true, |tp| tp > entry),
            "below",
            "above",
        ),
        Side::Short => (
            stop_loss.map_or(true, |sl| sl > entry),
            take_profit.map_or(true, |tp| tp < entry),
            "above",
            "below",
        ),
    };

    if !sl_ok {
        return Err(SignalParseError::InvalidPriceRelation(format!(
            "{side} stop loss must be {sl_word} entry {entry}"
        )));
    }
    if !tp_ok {
        return Err(SignalParseError::InvalidPriceRelation(format!(
            "{side} take profit must be {tp_word} entry {entry}"
        )));
    }
    Ok(())
}

fn parse_update(args: &[&str]) -> Result<SignalUpdate, SignalParseError> {
    let mut args = args.iter().copied();
    let id = args.next().ok_or(SignalParseError::MissingSignalId)?;

    let mut stop_loss = None;
    let mut take_profit = None;
    for token in args {
        let Some((key, value)) = token.split_once('=') else {
            return Err(SignalParseError::UnknownToken(token.to_string()));
        };
        match price_key(key) {
            Some(PriceKey::StopLoss) => stop_loss = Some(parse_decimal(value, token)?),
            Some(PriceKey::TakeProfit) => take_profit = Some(parse_decimal(value, token)?),
            _ => return Err(SignalParseError::UnknownToken(token.to_string())),
        }
    }

    if stop_loss.is_none() && take_profit.is_none() {
        return Err(SignalParseError::EmptyUpdate);
    }
    require_positive(stop_loss, "stop loss")?;
    require_positive(take_profit, "take profit")?;

    Ok(SignalUpdate {
        id: SignalId::new(id),
        stop_loss,
        take_profit,
    })
}

fn parse_close(args: &[&str]) -> Result<SignalClose, SignalParseError> {
    let mut args = args.iter().copied();
    let id = args.next().ok_or(SignalParseError::MissingSignalId)?;

    let partial_percent = match args.next() {
        None => None,
        Some(raw) => {
            let digits = raw.strip_suffix('%').unwrap_or(raw);
            let percent = Decimal::from_str(digits)
                .map_err(|_| SignalParseError::InvalidPercent(raw.to_string()))?;
            if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
                return Err(SignalParseError::InvalidPercent(raw.to_string()));
            }
            Some(percent)
        }
    };

    if let Some(extra) = args.next() {
        return Err(SignalParseError::UnknownToken(extra.to_string()));
    }

    Ok(SignalClose {
        id: SignalId::new(id),
        partial_percent,
    })
}
