use crate::config::AcquirerConfig;
use crate::domain::canonical::canonicalize;
use crate::domain::notification::{NotificationFields, ReconcileReason, ReconcileResult};
use crate::domain::params::{ParameterSet, SIGN, SIGN_TYPE};
use crate::domain::ports::{ConfirmationClient, ConfirmationClientBox, TransactionStore, TransactionStoreBox};
use crate::domain::protocol::{Protocol, SignatureScheme};
use crate::domain::signature::{AcquirerKey, verify_with_key};
use crate::domain::transaction::{Settlement, Transaction, TransactionState};
use crate::error::{GatewayError, Result};
use chrono::{Local, NaiveDateTime};
use dashmap::DashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const GMT_PAYMENT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Reconciles acquirer notifications with local transactions.
///
/// This is the single place where a transaction leaves `pending`. Each
/// reference is guarded by its own async mutex, so two deliveries of the same
/// notification racing each other apply the transition once; the loser sees
/// `AlreadyProcessed`.
pub struct NotificationReconciler {
    config: AcquirerConfig,
    store: TransactionStoreBox,
    confirmer: Option<ConfirmationClientBox>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NotificationReconciler {
    pub fn new(config: AcquirerConfig, store: TransactionStoreBox) -> Self {
        Self {
            config,
            store,
            confirmer: None,
            locks: DashMap::new(),
        }
    }

    /// Enables server-to-server confirmation of legacy notifications.
    pub fn with_confirmer(mut self, confirmer: ConfirmationClientBox) -> Self {
        self.confirmer = Some(confirmer);
        self
    }

    pub fn store(&self) -> &dyn TransactionStore {
        self.store.as_ref()
    }

    /// Reconciles an asynchronous notification.
    ///
    /// Signature, confirmation and lookup problems come back as rejected
    /// results. Only configuration and storage failures are errors, and a
    /// configuration error (missing or unparsable acquirer key) aborts the
    /// call without touching any transaction.
    #[instrument(skip_all, fields(reference = notification.get_str("out_trade_no")))]
    pub async fn reconcile(&self, notification: &ParameterSet) -> Result<ReconcileResult> {
        self.run(notification, self.confirmer.as_deref()).await
    }

    /// Reconciles the parameters of a buyer's return redirect.
    ///
    /// Same checks as [`reconcile`](Self::reconcile) minus the remote
    /// confirmation, which the acquirer only honours for notifications.
    #[instrument(skip_all, fields(reference = params.get_str("out_trade_no")))]
    pub async fn reconcile_return(&self, params: &ParameterSet) -> Result<ReconcileResult> {
        self.run(params, None).await
    }

    async fn run(
        &self,
        notification: &ParameterSet,
        confirmer: Option<&dyn ConfirmationClient>,
    ) -> Result<ReconcileResult> {
        if notification.is_empty() {
            warn!("Rejected empty notification");
            return Ok(ReconcileResult::rejected(None, ReconcileReason::EmptyPayload));
        }

        let fields = NotificationFields::from_params(notification);

        if !self.signature_valid(notification)? {
            warn!(reference = ?fields.reference, "Rejected notification with invalid signature");
            return Ok(ReconcileResult::rejected(
                fields.reference,
                ReconcileReason::SignatureInvalid,
            ));
        }

        if self.config.protocol == Protocol::Legacy
            && let Some(confirmer) = confirmer
            && !self.confirmed(confirmer, fields.notify_id.as_deref()).await
        {
            warn!(reference = ?fields.reference, "Rejected unconfirmed notification");
            return Ok(ReconcileResult::rejected(
                fields.reference,
                ReconcileReason::ConfirmationFailed,
            ));
        }

        let (Some(reference), Some(_)) = (fields.reference.clone(), fields.trade_no.as_ref()) else {
            warn!(
                reference = ?fields.reference,
                trade_no = ?fields.trade_no,
                "Notification is missing out_trade_no or trade_no"
            );
            return Ok(ReconcileResult::rejected(
                fields.reference,
                ReconcileReason::MissingReference,
            ));
        };

        let lock = self
            .locks
            .entry(reference.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let outcome = {
            let _guard = lock.lock().await;
            self.apply(&reference, &fields).await
        };
        drop(lock);
        self.locks
            .remove_if(&reference, |_, lock| Arc::strong_count(lock) == 1);

        outcome
    }

    /// Checks `sign` against the canonical form of everything else.
    fn signature_valid(&self, notification: &ParameterSet) -> Result<bool> {
        let Some(signature) = notification.get_non_empty(SIGN) else {
            debug!("Notification carries no signature");
            return Ok(false);
        };

        if let Some(label) = notification.get_non_empty(SIGN_TYPE) {
            match SignatureScheme::from_str(label) {
                Ok(scheme) if scheme == self.config.sign_type => {}
                _ => {
                    debug!(sign_type = label, expected = %self.config.sign_type, "Unexpected sign_type");
                    return Ok(false);
                }
            }
        }

        let key = AcquirerKey::from_pem(&self.config.public_key_pem()?).map_err(|e| match e {
            GatewayError::VerificationError(msg) => GatewayError::ConfigurationError(msg),
            other => other,
        })?;
        let content = canonicalize(notification, &self.config.protocol.canonical_options());
        debug!(content_len = content.len(), "Verifying notification signature");

        Ok(verify_with_key(&content, signature, &key, self.config.sign_type))
    }

    /// Remote confirmation. Anything but a timely literal `true` fails closed.
    async fn confirmed(&self, confirmer: &dyn ConfirmationClient, notify_id: Option<&str>) -> bool {
        let Some(notify_id) = notify_id else {
            warn!("Legacy notification without notify_id cannot be confirmed");
            return false;
        };

        match tokio::time::timeout(self.config.confirm_timeout(), confirmer.confirm(notify_id)).await {
            Ok(Ok(body)) if body == "true" => true,
            Ok(Ok(body)) => {
                warn!(notify_id, body = %body, "Acquirer did not confirm notification");
                false
            }
            Ok(Err(e)) => {
                warn!(notify_id, error = %e, "Confirmation call failed");
                false
            }
            Err(_) => {
                warn!(notify_id, "Confirmation call timed out");
                false
            }
        }
    }

    /// Applies the notification to the local transaction. Caller holds the
    /// reference lock.
    async fn apply(&self, reference: &str, fields: &NotificationFields) -> Result<ReconcileResult> {
        let reference_owned = Some(reference.to_string());
        let mut matches = self.store.find_by_reference(reference).await?;

        let mut tx: Transaction = match matches.len() {
            0 => {
                warn!(reference, "No transaction found for notification");
                return Ok(ReconcileResult::rejected(
                    reference_owned,
                    ReconcileReason::ReferenceNotFound,
                ));
            }
            1 => matches.remove(0),
            n => {
                warn!(reference, matches = n, "Multiple transactions found for notification");
                return Ok(ReconcileResult::rejected(
                    reference_owned,
                    ReconcileReason::AmbiguousReference,
                ));
            }
        };

        if tx.state.is_terminal() {
            info!(
                reference,
                state = tx.state.as_str(),
                "Ignoring duplicate notification for settled transaction"
            );
            return Ok(ReconcileResult::accepted(
                reference_owned,
                ReconcileReason::AlreadyProcessed,
            ));
        }

        if let Some(notified) = fields.total_amount.as_deref()
            && !tx.amount.matches_wire(notified)
        {
            warn!(
                reference,
                notified,
                expected = %tx.amount.to_wire(),
                "Notified amount does not match transaction"
            );
            return Ok(ReconcileResult::rejected(
                reference_owned,
                ReconcileReason::AmountMismatch,
            ));
        }

        let settlement = settlement_from(fields, &tx.reference);
        let state = settlement.state;
        tx.settle(settlement)?;
        self.store.store(tx).await?;

        match state {
            TransactionState::Done => info!(reference, "Validated payment: set as done"),
            _ => warn!(
                reference,
                trade_status = ?fields.trade_status,
                "Unrecognized trade status: set as error"
            ),
        }

        Ok(ReconcileResult::accepted(
            reference_owned,
            ReconcileReason::Applied(state),
        ))
    }
}

fn settlement_from(fields: &NotificationFields, reference: &str) -> Settlement {
    let state = TransactionState::from_trade_status(fields.trade_status.as_deref());
    let state_message = match state {
        TransactionState::Done => None,
        _ => Some(format!(
            "Received unrecognized status for payment {}: {}",
            reference,
            fields.trade_status.as_deref().unwrap_or("<none>")
        )),
    };
    let validated_at = fields
        .gmt_payment
        .as_deref()
        .and_then(|raw| NaiveDateTime::parse_from_str(raw, GMT_PAYMENT_FORMAT).ok())
        .unwrap_or_else(|| Local::now().naive_local());

    Settlement {
        state,
        acquirer_reference: fields.trade_no.clone().unwrap_or_default(),
        partner_reference: fields.buyer_id.clone(),
        txn_type: fields.payment_type.clone(),
        validated_at,
        state_message,
    }
}
