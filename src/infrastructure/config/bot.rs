//! Subscriber-facing defaults.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

const fn default_true() -> bool {
    true
}

/// Registration policy and defaults for new subscribers.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_true")]
    pub allow_registration: bool,
    /// USDT per signal when the user skips the amount step.
    #[serde(default = "default_trade_amount")]
    pub default_trade_amount: Decimal,
    #[serde(default = "default_max_leverage")]
    pub default_max_leverage: u32,
    /// Budget for the balance call that validates new credentials.
    #[serde(default = "default_validation_timeout_secs")]
    pub validation_timeout_secs: u64,
}

fn default_trade_amount() -> Decimal {
    dec!(50)
}

const fn default_max_leverage() -> u32 {
    20
}

const fn default_validation_timeout_secs() -> u64 {
    15
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            allow_registration: default_true(),
            default_trade_amount: default_trade_amount(),
            default_max_leverage: default_max_leverage(),
            validation_timeout_secs: default_validation_timeout_secs(),
        }
    }
}
