//! Per-subscriber execution outcomes.

use std::fmt;

use rust_decimal::Decimal;

use super::id::SignalId;
use super::signal::{OrderType, Side};

/// Outcome of executing an instruction for one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeStatus {
    Success,
    InsufficientBalance,
    SymbolNotFound,
    ApiError,
    Skipped,
}

impl TradeStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::SymbolNotFound => "SYMBOL_NOT_FOUND",
            Self::ApiError => "API_ERROR",
            Self::Skipped => "SKIPPED",
        }
    }

    #[must_use]
    pub fn from_db(value: &str) -> Self {
        match value {
            "SUCCESS" => Self::Success,
            "INSUFFICIENT_BALANCE" => Self::InsufficientBalance,
            "SYMBOL_NOT_FOUND" => Self::SymbolNotFound,
            "SKIPPED" => Self::Skipped,
            _ => Self::ApiError,
        }
    }

    /// Counted as a failure in broadcast summaries.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::ApiError | Self::SymbolNotFound)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a trade execution for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeResult {
    pub subscriber_id: i64,
    pub username: Option<String>,
    pub status: TradeStatus,
    pub message: String,
    pub order_id: Option<String>,
    pub quantity: Option<String>,
    pub actual_value: Option<Decimal>,
}

impl TradeResult {
    /// A result carrying only a status and message.
    pub fn new(
        subscriber_id: i64,
        username: Option<String>,
        status: TradeStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subscriber_id,
            username,
            status,
            message: message.into(),
            order_id: None,
            quantity: None,
            actual_value: None,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, TradeStatus::Success)
    }
}

/// Counts over a set of trade results, for the admin summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub total: usize,
    pub success: usize,
    pub insufficient_balance: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BroadcastSummary {
    #[must_use]
    pub fn from_results(results: &[TradeResult]) -> Self {
        results.iter().fold(
            Self {
                total: results.len(),
                ..Self::default()
            },
            |mut acc, result| {
                match result.status {
                    TradeStatus::Success => acc.success += 1,
                    TradeStatus::InsufficientBalance => acc.insufficient_balance += 1,
                    TradeStatus::Skipped => acc.skipped += 1,
                    TradeStatus::ApiError | TradeStatus::SymbolNotFound => acc.failed += 1,
                }
                acc
            },
        )
    }
}

/// A trade attempt as written to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    pub telegram_id: i64,
    pub signal_id: SignalId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub status: TradeStatus,
    pub quantity: Option<Decimal>,
    pub entry_price: Option<Decimal>,
    pub order_id: Option<String>,
    pub error_message: Option<String>,
}
