//! Mudrex wire types.
//!
//! Every response is wrapped in an [`Envelope`]. Numeric fields arrive as
//! either JSON strings or numbers; `rust_decimal` accepts both.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Standard response wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorItem {
    pub code: Option<i64>,
    #[serde(alias = "message")]
    pub text: String,
}

impl<T> Envelope<T> {
    /// First error code and all error texts joined.
    pub fn error_summary(&self) -> (Option<i64>, String) {
        let code = self.errors.first().and_then(|e| e.code);
        let text = self
            .errors
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        (code, text)
    }
}

/// `GET /futures/funds`
#[derive(Debug, Deserialize)]
pub struct FundsData {
    pub balance: Decimal,
}

/// `GET /futures/{symbol}?is_symbol`
#[derive(Debug, Deserialize)]
pub struct AssetData {
    pub symbol: String,
    pub quantity_step: Decimal,
    #[serde(alias = "min_contract")]
    pub min_quantity: Decimal,
    #[serde(default, alias = "max_contract")]
    pub max_quantity: Option<Decimal>,
    #[serde(default, alias = "price")]
    pub last_price: Option<Decimal>,
}

/// `POST /futures/{symbol}/leverage?is_symbol`
#[derive(Debug, Serialize)]
pub struct LeverageBody {
    pub margin_type: &'static str,
    pub leverage: String,
}

/// `POST /futures/{symbol}/order?is_symbol`
#[derive(Debug, Serialize)]
pub struct OrderBody {
    pub leverage: String,
    pub quantity: String,
    /// `LONG` or `SHORT`.
    pub order_type: &'static str,
    /// `MARKET` or `LIMIT`.
    pub trigger_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_price: Option<String>,
    pub reduce_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct OrderData {
    #[serde(alias = "id")]
    pub order_id: String,
}

/// `GET /futures/positions`
#[derive(Debug, Deserialize)]
pub struct PositionData {
    #[serde(alias = "id")]
    pub position_id: String,
    pub symbol: String,
    #[serde(default, alias = "order_type")]
    pub side: Option<String>,
    pub quantity: Decimal,
}

/// `POST /futures/positions/{id}/riskorder`
#[derive(Debug, Serialize)]
pub struct RiskOrderBody {
    pub is_stoploss: bool,
    pub is_takeprofit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stoploss_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub takeprofit_price: Option<String>,
}

/// `POST /futures/positions/{id}/close/partial`
#[derive(Debug, Serialize)]
pub struct PartialCloseBody {
    pub quantity: String,
}
