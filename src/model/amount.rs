//! Amount type for presenting monetary values.
//!
//! The tree engine only ever deals in `Decimal`. This wrapper exists for output: a sign, grouped
//! thousands, two decimal places and a trailing currency symbol, e.g. `-1,234.50 €`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

/// The currency symbol used when none is configured.
pub const DEFAULT_CURRENCY: &str = "€";

/// A monetary value together with the currency symbol it is displayed with.
///
/// # Examples
///
/// ```
/// # use bommel::model::Amount;
/// # use rust_decimal::Decimal;
/// let amount = Amount::new(Decimal::new(-123450, 2), "€");
/// assert_eq!(amount.to_string(), "-1,234.50 €");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    value: Decimal,
    currency: String,
}

impl Amount {
    pub fn new(value: Decimal, currency: impl Into<String>) -> Self {
        Self {
            value,
            currency: currency.into(),
        }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.value.is_sign_positive()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value.is_sign_negative()
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::new(Decimal::ZERO, DEFAULT_CURRENCY)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let num = self.value.abs().round_dp(2);
        let grouped = format_num::format_num!(",.2", num.to_f64().unwrap_or_default());
        if self.currency.is_empty() {
            write!(f, "{sign}{grouped}")
        } else {
            write!(f, "{sign}{grouped} {}", self.currency)
        }
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
