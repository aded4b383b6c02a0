use std::{fmt::Display, iter::Sum, ops::Add};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY: &str = "eur";

//--------------------------------------       Cents         ---------------------------------------------------------
/// An amount of money in the minor unit of its currency (e.g. euro cents).
///
/// Stripe reports every amount this way, so the value is stored and passed around untouched. Conversion to major
/// units only happens for display.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(unary Cents, Neg, neg);

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self).map_err(|_| CentsConversionError(format!("{value} is too large")))
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The amount in major units, e.g. 8000 cents is 80.0. Only use this for display and JSON responses.
    pub fn as_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Formats the amount with the currency symbol for the common currencies, and the ISO code otherwise.
    /// `Cents::from(8000).format_with_currency("eur")` gives `€80.00`.
    pub fn format_with_currency(&self, currency: &str) -> String {
        match currency.to_ascii_lowercase().as_str() {
            "eur" => format!("€{self}"),
            "usd" => format!("${self}"),
            "gbp" => format!("£{self}"),
            other => format!("{self} {}", other.to_ascii_uppercase()),
        }
    }
}
