use super::amount::round_money;
use crate::error::GatewayError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Acquirer fee schedule, passed on to the buyer when active.
///
/// Percentages are expressed as percent (e.g. `1.2` for 1.2%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub active: bool,
    pub domestic_fixed: Decimal,
    pub domestic_var: Decimal,
    pub international_fixed: Decimal,
    pub international_var: Decimal,
}

impl FeeSchedule {
    /// Fees for `amount`, grossed up so that the merchant receives `amount`
    /// after the acquirer takes its percentage of the total.
    ///
    /// Domestic rates apply when the buyer's country matches the merchant's.
    /// The result is rounded to cents so that `amount + fees` is exactly what
    /// goes on the wire.
    pub fn compute(
        &self,
        amount: Decimal,
        merchant_country: Option<&str>,
        buyer_country: Option<&str>,
    ) -> Result<Decimal, GatewayError> {
        if !self.active {
            return Ok(Decimal::ZERO);
        }

        let domestic = matches!(
            (merchant_country, buyer_country),
            (Some(m), Some(b)) if m.eq_ignore_ascii_case(b)
        );
        let (percentage, fixed) = if domestic {
            (self.domestic_var, self.domestic_fixed)
        } else {
            (self.international_var, self.international_fixed)
        };

        let rate = percentage / Decimal::ONE_HUNDRED;
        let divisor = Decimal::ONE - rate;
        if divisor <= Decimal::ZERO {
            return Err(GatewayError::ConfigurationError(format!(
                "Fee percentage {} leaves nothing to collect",
                percentage
            )));
        }

        Ok(round_money((rate * amount + fixed) / divisor))
    }
}
