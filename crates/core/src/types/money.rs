//! Decimal money helpers.
//!
//! All amounts are `rust_decimal::Decimal` in the currency's major unit
//! (e.g. `12.50` JOD), stored as `NUMERIC(12,2)`.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Sales tax applied to carts and orders, in percent.
pub const TAX_RATE_PERCENT: Decimal = Decimal::from_parts(8, 0, 0, false, 0);

/// Round an amount to two decimal places, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Tax owed on a taxable amount.
#[must_use]
pub fn tax_on(taxable: Decimal) -> Decimal {
    round_money(taxable * TAX_RATE_PERCENT / Decimal::ONE_HUNDRED)
}

/// Convert a major-unit amount to minor units (cents/fils at 2 dp).
///
/// Returns `None` if the amount is negative or does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    use rust_decimal::prelude::ToPrimitive;

    if amount.is_sign_negative() {
        return None;
    }
    (round_money(amount) * Decimal::ONE_HUNDRED).to_i64()
}

/// Currencies accepted for catalog prices and orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    USD,
    #[default]
    JOD,
    EUR,
    SAR,
}

impl CurrencyCode {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::JOD => "JOD",
            Self::EUR => "EUR",
            Self::SAR => "SAR",
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "JOD" => Ok(Self::JOD),
            "EUR" => Ok(Self::EUR),
            "SAR" => Ok(Self::SAR),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::from_str("1.005").unwrap()), Decimal::from_str("1.01").unwrap());
        assert_eq!(round_money(Decimal::from_str("2.344").unwrap()), Decimal::from_str("2.34").unwrap());
    }

    #[test]
    fn test_tax_on_is_eight_percent() {
        assert_eq!(tax_on(Decimal::from(100)), Decimal::from(8));
        assert_eq!(
            tax_on(Decimal::from_str("19.99").unwrap()),
            Decimal::from_str("1.60").unwrap()
        );
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::from_str("45.5").unwrap()), Some(4550));
        assert_eq!(to_minor_units(Decimal::ZERO), Some(0));
        assert_eq!(to_minor_units(Decimal::from(-1)), None);
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(CurrencyCode::from_str("jod").unwrap(), CurrencyCode::JOD);
        assert_eq!(CurrencyCode::from_str(" usd ").unwrap(), CurrencyCode::USD);
        assert!(CurrencyCode::from_str("GBP").is_err());
        assert_eq!(CurrencyCode::default().to_string(), "JOD");
    }
}
