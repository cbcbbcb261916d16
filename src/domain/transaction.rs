use super::amount::Amount;
use crate::error::GatewayError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Acquirer statuses that mean the buyer has paid.
pub const SETTLED_TRADE_STATUSES: [&str; 2] = ["TRADE_FINISHED", "TRADE_SUCCESS"];

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    #[default]
    Pending,
    Done,
    Error,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Done | TransactionState::Error)
    }

    /// Terminal state for an acquirer `trade_status`.
    pub fn from_trade_status(status: Option<&str>) -> Self {
        match status {
            Some(s) if SETTLED_TRADE_STATUSES.contains(&s) => TransactionState::Done,
            _ => TransactionState::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Pending => "pending",
            TransactionState::Done => "done",
            TransactionState::Error => "error",
        }
    }
}

/// Normalized outcome extracted from a verified notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub state: TransactionState,
    /// Acquirer-assigned `trade_no`.
    pub acquirer_reference: String,
    /// Buyer account id at the acquirer.
    pub partner_reference: Option<String>,
    pub txn_type: Option<String>,
    pub validated_at: NaiveDateTime,
    pub state_message: Option<String>,
}

/// A local payment attempt.
///
/// Created `Pending` by the host before the buyer is redirected and moved
/// exactly once to `Done` or `Error` by the notification reconciler.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    /// Local identifier.
    pub id: u64,
    /// Merchant reference, sent as `out_trade_no`.
    pub reference: String,
    pub amount: Amount,
    pub currency: String,
    #[serde(default)]
    pub acquirer_reference: Option<String>,
    #[serde(default)]
    pub partner_reference: Option<String>,
    #[serde(default)]
    pub txn_type: Option<String>,
    #[serde(default)]
    pub state: TransactionState,
    #[serde(default)]
    pub state_message: Option<String>,
    #[serde(default)]
    pub validated_at: Option<NaiveDateTime>,
}

impl Transaction {
    pub fn pending(id: u64, reference: impl Into<String>, amount: Amount, currency: impl Into<String>) -> Self {
        Self {
            id,
            reference: reference.into(),
            amount,
            currency: currency.into(),
            acquirer_reference: None,
            partner_reference: None,
            txn_type: None,
            state: TransactionState::Pending,
            state_message: None,
            validated_at: None,
        }
    }

    /// Applies a settlement. Only a pending transaction can be settled.
    pub fn settle(&mut self, settlement: Settlement) -> Result<(), GatewayError> {
        if self.state.is_terminal() {
            return Err(GatewayError::ValidationError(format!(
                "Transaction {} is already {}",
                self.reference,
                self.state.as_str()
            )));
        }
        if !settlement.state.is_terminal() {
            return Err(GatewayError::ValidationError(
                "Settlement must carry a terminal state".to_string(),
            ));
        }

        self.state = settlement.state;
        self.acquirer_reference = Some(settlement.acquirer_reference);
        self.partner_reference = settlement.partner_reference;
        self.txn_type = settlement.txn_type;
        self.validated_at = Some(settlement.validated_at);
        self.state_message = settlement.state_message;
        Ok(())
    }
}
