//! Conversion from a USDT budget to an exchange-valid contract quantity.
//!
//! Exchanges only accept quantities that are multiples of the asset's
//! quantity step and inside its min/max bounds. Sizing always rounds
//! toward zero so a subscriber never spends more than their trade amount
//! (clamping up to the minimum is the only exception).

use rust_decimal::{Decimal, RoundingStrategy};

/// A quantity ready to send to the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedQuantity {
    /// Quantity in contracts/coins.
    pub quantity: Decimal,
    /// Approximate USDT value (`quantity * price`).
    pub actual_value: Decimal,
}

impl SizedQuantity {
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Quantity rendered without trailing zeros (`26.20` → `26.2`).
    #[must_use]
    pub fn quantity_text(&self) -> String {
        format_quantity(self.quantity)
    }
}

/// Truncate `value` to a multiple of `step`. A non-positive step leaves the
/// value untouched. Returns `None` when the arithmetic overflows.
#[must_use]
pub fn truncate_to_step(value: Decimal, step: Decimal) -> Option<Decimal> {
    if step <= Decimal::ZERO {
        return Some(value);
    }
    let steps = value
        .checked_div(step)?
        .round_dp_with_strategy(0, RoundingStrategy::ToZero);
    Some(steps.checked_mul(step)?.normalize())
}

/// Calculate the coin quantity purchasable with `usd_amount` at `price`.
///
/// The raw quantity is truncated to `quantity_step`, then clamped into
/// `[min_quantity, max_quantity]`. A non-positive price yields zero.
/// Returns `None` when the quantity or its value does not fit a `Decimal`
/// (a vanishingly small price, for instance).
#[must_use]
pub fn quantity_from_usd(
    usd_amount: Decimal,
    price: Decimal,
    quantity_step: Decimal,
    min_quantity: Decimal,
    max_quantity: Option<Decimal>,
) -> Option<SizedQuantity> {
    if price <= Decimal::ZERO {
        return Some(SizedQuantity {
            quantity: Decimal::ZERO,
            actual_value: Decimal::ZERO,
        });
    }

    let raw = usd_amount.checked_div(price)?;
    let mut quantity = truncate_to_step(raw, quantity_step)?;

    quantity = quantity.max(min_quantity);
    if let Some(max) = max_quantity {
        quantity = quantity.min(max);
    }

    Some(SizedQuantity {
        quantity: quantity.normalize(),
        actual_value: quantity.checked_mul(price)?,
    })
}

/// Quantity of an open position to close for a partial close.
#[must_use]
pub fn partial_close_quantity(
    position_quantity: Decimal,
    percent: Decimal,
    quantity_step: Decimal,
) -> Option<Decimal> {
    let raw = position_quantity
        .checked_mul(percent)?
        .checked_div(Decimal::ONE_HUNDRED)?;
    truncate_to_step(raw, quantity_step)
}

/// Render a quantity with trailing zeros and a dangling point removed.
#[must_use]
pub fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}
