use thiserror::Error;

use crate::db_types::{AuthorizationStatus, EventId, NewAuthorization, PaymentAuthorization};

#[derive(Debug, Clone, Error)]
pub enum BookingStoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The authorization for checkout session {0} does not exist")]
    AuthorizationNotFound(String),
    #[error("Payment intent {0} cannot be captured. The payer already has a captured payment for this event.")]
    DuplicateCapture(String),
}

impl From<sqlx::Error> for BookingStoreError {
    fn from(e: sqlx::Error) -> Self {
        BookingStoreError::DatabaseError(e.to_string())
    }
}

/// The result of recording a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizeResult {
    /// No record existed for the session. A new `Authorized` record was created.
    Inserted(PaymentAuthorization),
    /// A `PendingCheckout` record was promoted to `Authorized`.
    Promoted(PaymentAuthorization),
    /// The session had already been processed. The record is returned unchanged.
    AlreadyProcessed(PaymentAuthorization),
}

impl AuthorizeResult {
    pub fn authorization(&self) -> &PaymentAuthorization {
        match self {
            Self::Inserted(a) | Self::Promoted(a) | Self::AlreadyProcessed(a) => a,
        }
    }

    pub fn is_new_authorization(&self) -> bool {
        !matches!(self, Self::AlreadyProcessed(_))
    }
}

/// Durable storage for payment authorizations.
///
/// Implementations must guarantee that every status change is conditional on the current status (compare-and-set),
/// and that records in a terminal status are never modified.
#[allow(async_fn_in_trait)]
pub trait BookingStore {
    /// Records a checkout session that has been created but not yet completed.
    ///
    /// This call is idempotent. Returns `false` in the second parameter if a record already existed for the session.
    async fn insert_pending_checkout(
        &self,
        authorization: NewAuthorization,
    ) -> Result<(PaymentAuthorization, bool), BookingStoreError>;

    /// Records a completed checkout in a single atomic transaction:
    /// * If no record exists for the session, a new one is inserted with status `Authorized`.
    /// * If a `PendingCheckout` record exists, it is promoted to `Authorized`, and the payment intent, amount and
    ///   customer details are filled in.
    /// * Otherwise the existing record is returned untouched.
    async fn authorize_checkout(&self, authorization: NewAuthorization) -> Result<AuthorizeResult, BookingStoreError>;

    /// Marks the checkout session as expired. A record is inserted if none exists.
    ///
    /// Returns `None` if the record was already in a terminal status.
    async fn expire_checkout(
        &self,
        authorization: NewAuthorization,
    ) -> Result<Option<PaymentAuthorization>, BookingStoreError>;

    /// Moves the authorization for `intent_id` to `to`, if and only if its current status is one of `from`.
    ///
    /// Returns the updated record, or `None` if no record matched. Callers use `None` to detect that another delivery
    /// won the race.
    async fn update_status_for_intent(
        &self,
        intent_id: &str,
        from: &[AuthorizationStatus],
        to: AuthorizationStatus,
    ) -> Result<Option<PaymentAuthorization>, BookingStoreError>;

    async fn fetch_by_session_id(&self, session_id: &str) -> Result<Option<PaymentAuthorization>, BookingStoreError>;

    async fn fetch_by_intent_id(&self, intent_id: &str) -> Result<Option<PaymentAuthorization>, BookingStoreError>;

    /// All the authorizations for the event, oldest first. Pass a status to filter on it.
    async fn fetch_authorizations_for_event(
        &self,
        event_id: &EventId,
        status: Option<AuthorizationStatus>,
    ) -> Result<Vec<PaymentAuthorization>, BookingStoreError>;

    /// Closes the store. The default implementation does nothing.
    async fn close(&mut self) -> Result<(), BookingStoreError> {
        Ok(())
    }
}
