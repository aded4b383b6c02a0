use quorum_common::Cents;
use thiserror::Error;

use crate::gateway_types::CheckoutSummary;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The payment gateway did not respond in time. {0}")]
    Timeout(String),
    #[error("Could not reach the payment gateway. {0}")]
    Network(String),
    #[error("The payment gateway rejected the request. Error {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("{0} does not exist on the payment gateway")]
    NotFound(String),
    #[error("The payment gateway sent an unexpected response. {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureResult {
    Captured { amount: Cents },
    /// The payment had been captured before this call. Not an error.
    AlreadyCaptured { amount: Cents },
}

impl CaptureResult {
    pub fn amount(&self) -> Cents {
        match self {
            Self::Captured { amount } | Self::AlreadyCaptured { amount } => *amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelResult {
    Canceled,
    /// The payment had been canceled before this call. Not an error.
    AlreadyCanceled,
}

/// The operations the engine needs from a payment provider.
///
/// Implementations must make `capture_intent` and `cancel_intent` idempotent from the caller's point of view:
/// repeating the call on an intent that is already in the requested state succeeds with the `Already*` variant.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSummary, GatewayError>;

    async fn capture_intent(&self, intent_id: &str) -> Result<CaptureResult, GatewayError>;

    async fn cancel_intent(&self, intent_id: &str) -> Result<CancelResult, GatewayError>;
}
