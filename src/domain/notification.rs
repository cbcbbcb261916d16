use super::params::ParameterSet;
use super::transaction::TransactionState;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Where the buyer lands when the return URL carries no explicit target.
pub const DEFAULT_RETURN_TARGET: &str = "/my/orders";

/// Fields the reconciler reads out of a notification.
///
/// Empty values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFields {
    /// Merchant reference (`out_trade_no`).
    pub reference: Option<String>,
    /// Acquirer transaction id (`trade_no`).
    pub trade_no: Option<String>,
    pub trade_status: Option<String>,
    pub notify_id: Option<String>,
    pub buyer_id: Option<String>,
    pub payment_type: Option<String>,
    /// Payment time, `YYYY-MM-DD HH:MM:SS`.
    pub gmt_payment: Option<String>,
    /// `total_amount` (open API) or `total_fee` (legacy).
    pub total_amount: Option<String>,
}

impl NotificationFields {
    pub fn from_params(params: &ParameterSet) -> Self {
        let field = |key: &str| params.get_non_empty(key).map(str::to_string);
        Self {
            reference: field("out_trade_no"),
            trade_no: field("trade_no"),
            trade_status: field("trade_status"),
            notify_id: field("notify_id"),
            buyer_id: field("buyer_id"),
            payment_type: field("payment_type"),
            gmt_payment: field("gmt_payment"),
            total_amount: field("total_amount").or_else(|| field("total_fee")),
        }
    }
}

/// Why a notification was accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconcileReason {
    /// The transaction moved to the given terminal state.
    Applied(TransactionState),
    /// The transaction was already terminal; nothing was written.
    AlreadyProcessed,
    EmptyPayload,
    SignatureInvalid,
    ConfirmationFailed,
    /// `out_trade_no` or `trade_no` is missing.
    MissingReference,
    ReferenceNotFound,
    AmbiguousReference,
    /// The notified amount differs from the local transaction.
    AmountMismatch,
}

impl fmt::Display for ReconcileReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileReason::Applied(state) => write!(f, "applied ({})", state.as_str()),
            ReconcileReason::AlreadyProcessed => f.write_str("already processed"),
            ReconcileReason::EmptyPayload => f.write_str("empty payload"),
            ReconcileReason::SignatureInvalid => f.write_str("signature invalid"),
            ReconcileReason::ConfirmationFailed => f.write_str("confirmation failed"),
            ReconcileReason::MissingReference => f.write_str("missing reference"),
            ReconcileReason::ReferenceNotFound => f.write_str("reference not found"),
            ReconcileReason::AmbiguousReference => f.write_str("ambiguous reference"),
            ReconcileReason::AmountMismatch => f.write_str("amount mismatch"),
        }
    }
}

/// Outcome of reconciling one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    pub accepted: bool,
    pub reference: Option<String>,
    pub reason: ReconcileReason,
}

impl ReconcileResult {
    pub fn accepted(reference: Option<String>, reason: ReconcileReason) -> Self {
        Self {
            accepted: true,
            reference,
            reason,
        }
    }

    pub fn rejected(reference: Option<String>, reason: ReconcileReason) -> Self {
        Self {
            accepted: false,
            reference,
            reason,
        }
    }

    /// Body the host returns to the acquirer: `success` or `fail`.
    pub fn ack(&self) -> &'static str {
        if self.accepted { "success" } else { "fail" }
    }
}

/// Redirect target for a buyer coming back through the return URL.
///
/// Uses `return_url` when present, then the `return_url` of the `custom`
/// JSON blob, then [`DEFAULT_RETURN_TARGET`].
pub fn return_target(params: &ParameterSet) -> String {
    if let Some(url) = params.get_non_empty("return_url") {
        return url.to_string();
    }

    params
        .get_non_empty("custom")
        .and_then(|custom| serde_json::from_str::<Value>(custom).ok())
        .and_then(|custom| {
            custom
                .get("return_url")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_RETURN_TARGET.to_string())
}
