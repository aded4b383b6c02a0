use serde::{Deserialize, Serialize};

use crate::db_types::{EventCapacitySnapshot, PaymentAuthorization};

/// What handling a single webhook event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum EventOutcome {
    /// A new authorization was recorded. If it carries a payment intent, the event's quorum was checked straight
    /// afterwards.
    Authorized { authorization: PaymentAuthorization, reconciliation: Option<ReconciliationOutcome> },
    Captured(PaymentAuthorization),
    Canceled(PaymentAuthorization),
    Expired(PaymentAuthorization),
    /// A quorum check ran without capturing anything.
    CapacityChecked(EventCapacitySnapshot),
    Reconciled(ReconciliationOutcome),
    /// The event was understood, but there was nothing to do (duplicate delivery, missing metadata, unknown intent).
    NoOp(String),
    /// The event type is not one the engine handles.
    Ignored(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationDecision {
    /// The quorum was reached and captures were attempted.
    Capture,
    AwaitingQuorum,
    /// No participant target has been set for the event, so nothing can be captured.
    NoTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentFailure {
    pub payment_intent_id: Option<String>,
    pub session_id: String,
    pub reason: String,
}

impl IntentFailure {
    pub fn new(authorization: &PaymentAuthorization, reason: String) -> Self {
        Self {
            payment_intent_id: authorization.payment_intent_id.clone(),
            session_id: authorization.session_id.clone(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub snapshot: EventCapacitySnapshot,
    pub decision: ReconciliationDecision,
    /// Authorizations this call moved to `Captured`.
    pub captured: Vec<PaymentAuthorization>,
    /// Extra holds of payers who had already paid for the event. They are canceled instead of captured.
    pub released: Vec<PaymentAuthorization>,
    /// Authorizations that could not be captured. They stay `Authorized` and are retried on the next reconciliation.
    pub failed: Vec<IntentFailure>,
}

impl ReconciliationOutcome {
    pub fn new(snapshot: EventCapacitySnapshot, decision: ReconciliationDecision) -> Self {
        Self { snapshot, decision, captured: Vec::new(), released: Vec::new(), failed: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub canceled: Vec<PaymentAuthorization>,
    pub failed: Vec<IntentFailure>,
}
