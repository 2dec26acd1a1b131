//! Domain validation errors.
//!
//! Returned by the `parse` constructors that guard subscriber limits and
//! by services when a referenced signal does not exist or is no longer
//! actionable.
//!
//! # Examples
//!
//! ```
//! use signalbot::domain::error::DomainError;
//! use signalbot::domain::subscriber::Leverage;
//!
//! let result = Leverage::parse("500");
//! assert!(matches!(result, Err(DomainError::LeverageOutOfRange { .. })));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use super::signal::MAX_LEVERAGE;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Trade amount outside the accepted USDT range.
    #[error("trade amount must be between {min} and {max} USDT, got {value}")]
    TradeAmountOutOfRange {
        /// The rejected amount.
        value: Decimal,
        /// Inclusive lower bound.
        min: Decimal,
        /// Inclusive upper bound.
        max: Decimal,
    },

    /// Leverage outside the accepted range.
    #[error("leverage must be between {min} and {max}, got {value}")]
    LeverageOutOfRange {
        /// The rejected leverage.
        value: i64,
        /// Inclusive lower bound.
        min: u32,
        /// Inclusive upper bound.
        max: u32,
    },

    /// Text could not be read as a number.
    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    /// An API credential is too short to be genuine.
    #[error("{field} looks too short to be valid")]
    CredentialTooShort {
        /// Which credential failed the check.
        field: &'static str,
    },

    /// No signal exists with the given id.
    #[error("signal `{0}` not found")]
    SignalNotFound(String),

    /// The signal exists but has already been closed.
    #[error("signal `{0}` is already closed")]
    SignalClosed(String),
}

/// Parse error for signal command messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalParseError {
    #[error("missing side (LONG or SHORT)")]
    MissingSide,
    #[error("invalid side `{0}` (use LONG or SHORT)")]
    InvalidSide(String),
    #[error("missing symbol")]
    MissingSymbol,
    #[error("invalid symbol `{0}`")]
    InvalidSymbol(String),
    #[error("invalid number in `{0}`")]
    InvalidNumber(String),
    #[error("unexpected `{0}`")]
    UnknownToken(String),
    #[error("limit orders need an entry price (entry=<price>)")]
    LimitWithoutEntry,
    #[error("leverage {0}x is outside 1-{max}x", max = MAX_LEVERAGE)]
    LeverageOutOfRange(i64),
    #[error("{0} must be greater than 0")]
    NonPositivePrice(&'static str),
    #[error("{0}")]
    InvalidPriceRelation(String),
    #[error("missing signal id")]
    MissingSignalId,
    #[error("invalid close percentage `{0}` (use 1-100%)")]
    InvalidPercent(String),
    #[error("update needs sl=<price> and/or tp=<price>")]
    EmptyUpdate,
}
