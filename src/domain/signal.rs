//! Admin trading signals and their follow-up instructions.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::SignalId;

/// Highest leverage the bot will ever request.
pub const MAX_LEVERAGE: u32 = 125;

/// Direction of a futures position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Canonical upper-case name used on the wire and in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" | "buy" => Ok(Self::Long),
            "short" | "sell" => Ok(Self::Short),
            other => Err(other.to_string()),
        }
    }
}

/// How the entry order is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(Self::Market),
            "limit" => Ok(Self::Limit),
            other => Err(other.to_string()),
        }
    }
}

/// A new position to open on every subscriber account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub id: SignalId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price, or sizing reference for market orders.
    pub entry_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub leverage: u32,
}

impl Signal {
    /// True when either a stop loss or a take profit is attached.
    #[must_use]
    pub const fn has_risk_orders(&self) -> bool {
        self.stop_loss.is_some() || self.take_profit.is_some()
    }
}

/// New stop loss / take profit for positions opened by an earlier signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalUpdate {
    pub id: SignalId,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

/// Close (fully or partially) the positions opened by an earlier signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalClose {
    pub id: SignalId,
    /// Percentage of each position to close. `None` or `100` closes fully.
    pub partial_percent: Option<Decimal>,
}

impl SignalClose {
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.partial_percent
            .map_or(true, |p| p >= Decimal::ONE_HUNDRED)
    }
}

/// Result of parsing an admin signal command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedSignal {
    New(Signal),
    Update(SignalUpdate),
    Close(SignalClose),
}

/// Lifecycle of a stored signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatus {
    Active,
    Closed,
}

impl SignalStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Closed => "CLOSED",
        }
    }

    /// Parse the stored representation; anything unknown is treated as closed.
    #[must_use]
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("ACTIVE") {
            Self::Active
        } else {
            Self::Closed
        }
    }
}

/// A signal as persisted, with its lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSignal {
    pub signal: Signal,
    pub status: SignalStatus,
}
