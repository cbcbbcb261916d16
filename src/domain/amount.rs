use crate::error::GatewayError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A positive payment amount.
///
/// Wraps `rust_decimal::Decimal` so that a transaction can never be created
/// for zero or a negative amount. Rendered with two decimal places on the
/// wire, which is what the acquirer expects for `total_fee`/`total_amount`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, GatewayError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(GatewayError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// The value the acquirer sees: two decimals, midpoints rounded away
    /// from zero.
    pub fn wire_value(&self) -> Decimal {
        round_money(self.0)
    }

    /// Two-decimal wire representation, e.g. `10.00`.
    pub fn to_wire(&self) -> String {
        format!("{:.2}", self.wire_value())
    }

    /// Whether an acquirer-reported amount equals what was sent on the wire.
    pub fn matches_wire(&self, reported: &str) -> bool {
        Decimal::from_str(reported.trim()).is_ok_and(|value| value == self.wire_value())
    }

    /// Adds a non-negative surcharge such as acquirer fees.
    pub fn with_surcharge(&self, surcharge: Decimal) -> Result<Self, GatewayError> {
        Self::new(self.0 + surcharge)
    }
}

/// Rounds to cents, midpoints away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl TryFrom<Decimal> for Amount {
    type Error = GatewayError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| GatewayError::ValidationError(format!("Invalid amount '{}': {}", s, e)))?;
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
