//! Registered subscribers and the limits they may configure.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::DomainError;
use super::signal::MAX_LEVERAGE;

/// Smallest per-signal trade amount in USDT.
pub const MIN_TRADE_AMOUNT: Decimal = dec!(1);
/// Largest per-signal trade amount in USDT.
pub const MAX_TRADE_AMOUNT: Decimal = dec!(10000);
/// Minimum plausible length for an API key or secret.
pub const MIN_CREDENTIAL_LEN: usize = 10;

/// Exchange API credentials for one subscriber.
///
/// `Debug` never prints the values.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Check that a pasted credential is plausibly real.
pub fn validate_credential(value: &str, field: &'static str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.len() < MIN_CREDENTIAL_LEN {
        return Err(DomainError::CredentialTooShort { field });
    }
    Ok(trimmed.to_string())
}

/// Per-signal trade amount in USDT, within `1..=10000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TradeAmount(Decimal);

impl TradeAmount {
    /// Validate an amount.
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value < MIN_TRADE_AMOUNT || value > MAX_TRADE_AMOUNT {
            return Err(DomainError::TradeAmountOutOfRange {
                value,
                min: MIN_TRADE_AMOUNT,
                max: MAX_TRADE_AMOUNT,
            });
        }
        Ok(Self(value))
    }

    /// Parse user input such as `50` or `12.5`.
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let value = Decimal::from_str(text.trim())
            .map_err(|_| DomainError::InvalidNumber(text.trim().to_string()))?;
        Self::new(value)
    }

    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

/// Maximum leverage a subscriber accepts, within `1..=125`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Leverage(u32);

impl Leverage {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        match u32::try_from(value) {
            Ok(v) if (1..=MAX_LEVERAGE).contains(&v) => Ok(Self(v)),
            _ => Err(DomainError::LeverageOutOfRange {
                value,
                min: 1,
                max: MAX_LEVERAGE,
            }),
        }
    }

    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let trimmed = text.trim().trim_end_matches(['x', 'X']);
        let value: i64 = trimmed
            .parse()
            .map_err(|_| DomainError::InvalidNumber(text.trim().to_string()))?;
        Self::new(value)
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

/// Input for registering (or re-registering) a subscriber.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub credentials: ApiCredentials,
    pub trade_amount: TradeAmount,
    pub max_leverage: Leverage,
}

/// A registered subscriber.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub credentials: ApiCredentials,
    pub trade_amount_usdt: Decimal,
    pub max_leverage: u32,
    pub is_active: bool,
    pub total_trades: i64,
    pub total_pnl: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    /// Leverage actually used for a signal: the signal's, capped at ours.
    #[must_use]
    pub fn effective_leverage(&self, requested: u32) -> u32 {
        requested.min(self.max_leverage)
    }

    /// `@username` when known, otherwise the numeric id.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.username
            .as_deref()
            .map_or_else(|| self.telegram_id.to_string(), |u| format!("@{u}"))
    }
}

/// Aggregate counts for the admin `/adminstats` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    pub total_subscribers: i64,
    pub active_subscribers: i64,
    pub total_trades: i64,
    pub active_signals: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_amount_bounds_are_inclusive() {
        assert!(TradeAmount::parse("1").is_ok());
        assert!(TradeAmount::parse("10000").is_ok());
        assert!(TradeAmount::parse("0.99").is_err());
        assert!(TradeAmount::parse("10000.01").is_err());
    }

    #[test]
    fn trade_amount_rejects_garbage() {
        assert_eq!(
            TradeAmount::parse(" fifty "),
            Err(DomainError::InvalidNumber("fifty".into()))
        );
    }

    #[test]
    fn trade_amount_keeps_fraction() {
        assert_eq!(TradeAmount::parse("12.5").unwrap().value(), dec!(12.5));
    }

    #[test]
    fn leverage_bounds() {
        assert_eq!(Leverage::parse("1").unwrap().value(), 1);
        assert_eq!(Leverage::parse("125").unwrap().value(), 125);
        assert_eq!(Leverage::parse("20x").unwrap().value(), 20);
        assert!(matches!(
            Leverage::parse("0"),
            Err(DomainError::LeverageOutOfRange { value: 0, .. })
        ));
        assert!(matches!(
            Leverage::parse("126"),
            Err(DomainError::LeverageOutOfRange { value: 126, .. })
        ));
        assert!(matches!(
            Leverage::parse("-3"),
            Err(DomainError::LeverageOutOfRange { value: -3, .. })
        ));
        assert!(Leverage::parse("2.5").is_err());
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = ApiCredentials::new("key-1234567890", "secret-1234567890");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("key-1234567890"));
        assert!(!rendered.contains("secret-1234567890"));
    }

    #[test]
    fn credential_length_check_trims() {
        assert_eq!(
            validate_credential("  abcdefghij  ", "API key").unwrap(),
            "abcdefghij"
        );
        assert_eq!(
            validate_credential("short", "API key"),
            Err(DomainError::CredentialTooShort { field: "API key" })
        );
    }

    #[test]
    fn effective_leverage_is_capped() {
        let now = Utc::now();
        let subscriber = Subscriber {
            telegram_id: 42,
            username: Some("trader".into()),
            credentials: ApiCredentials::new("k".repeat(12), "s".repeat(12)),
            trade_amount_usdt: dec!(50),
            max_leverage: 10,
            is_active: true,
            total_trades: 0,
            total_pnl: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(subscriber.effective_leverage(25), 10);
        assert_eq!(subscriber.effective_leverage(5), 5);
        assert_eq!(subscriber.display_name(), "@trader");
    }
}
