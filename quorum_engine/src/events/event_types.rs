use quorum_common::Cents;
use serde::{Deserialize, Serialize};

use crate::db_types::PaymentAuthorization;

/// A guest completed checkout and funds are now on hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAuthorizedEvent {
    pub authorization: PaymentAuthorization,
}

impl PaymentAuthorizedEvent {
    pub fn new(authorization: PaymentAuthorization) -> Self {
        Self { authorization }
    }
}

/// The held funds were transferred. `amount` is what the payer was actually charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCapturedEvent {
    pub authorization: PaymentAuthorization,
    pub amount: Cents,
}

impl PaymentCapturedEvent {
    pub fn new(authorization: PaymentAuthorization, amount: Cents) -> Self {
        Self { authorization, amount }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCancelledEvent {
    pub authorization: PaymentAuthorization,
}

impl PaymentCancelledEvent {
    pub fn new(authorization: PaymentAuthorization) -> Self {
        Self { authorization }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentExpiredEvent {
    pub authorization: PaymentAuthorization,
}

impl PaymentExpiredEvent {
    pub fn new(authorization: PaymentAuthorization) -> Self {
        Self { authorization }
    }
}

/// Every ledger change, in the order the engine made them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    PaymentAuthorized(PaymentAuthorizedEvent),
    PaymentCaptured(PaymentCapturedEvent),
    PaymentCancelled(PaymentCancelledEvent),
    PaymentExpired(PaymentExpiredEvent),
}

impl LedgerEvent {
    pub fn authorization(&self) -> &PaymentAuthorization {
        match self {
            Self::PaymentAuthorized(e) => &e.authorization,
            Self::PaymentCaptured(e) => &e.authorization,
            Self::PaymentCancelled(e) => &e.authorization,
            Self::PaymentExpired(e) => &e.authorization,
        }
    }

    /// The payer the event concerns. Events for the same payer are handled in the order they were published.
    pub fn recipient(&self) -> Option<String> {
        self.authorization().payer_id.clone()
    }
}

impl From<PaymentAuthorizedEvent> for LedgerEvent {
    fn from(e: PaymentAuthorizedEvent) -> Self {
        Self::PaymentAuthorized(e)
    }
}

impl From<PaymentCapturedEvent> for LedgerEvent {
    fn from(e: PaymentCapturedEvent) -> Self {
        Self::PaymentCaptured(e)
    }
}

impl From<PaymentCancelledEvent> for LedgerEvent {
    fn from(e: PaymentCancelledEvent) -> Self {
        Self::PaymentCancelled(e)
    }
}

impl From<PaymentExpiredEvent> for LedgerEvent {
    fn from(e: PaymentExpiredEvent) -> Self {
        Self::PaymentExpired(e)
    }
}
