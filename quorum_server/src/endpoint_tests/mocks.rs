use mockall::mock;
use quorum_engine::{
    db_types::{AuthorizationStatus, EventId, NewAuthorization, PaymentAuthorization},
    gateway_types::CheckoutSummary,
    AuthorizeResult,
    BookingStore,
    BookingStoreError,
    CancelResult,
    CapacityError,
    CapacityTracker,
    CaptureResult,
    GatewayError,
    PaymentGateway,
    QuotaManagement,
};

mock! {
    pub BookingStore {}
    impl BookingStore for BookingStore {
        async fn insert_pending_checkout(&self, authorization: NewAuthorization) -> Result<(PaymentAuthorization, bool), BookingStoreError>;
        async fn authorize_checkout(&self, authorization: NewAuthorization) -> Result<AuthorizeResult, BookingStoreError>;
        async fn expire_checkout(&self, authorization: NewAuthorization) -> Result<Option<PaymentAuthorization>, BookingStoreError>;
        async fn update_status_for_intent(&self, intent_id: &str, from: &[AuthorizationStatus], to: AuthorizationStatus) -> Result<Option<PaymentAuthorization>, BookingStoreError>;
        async fn fetch_by_session_id(&self, session_id: &str) -> Result<Option<PaymentAuthorization>, BookingStoreError>;
        async fn fetch_by_intent_id(&self, intent_id: &str) -> Result<Option<PaymentAuthorization>, BookingStoreError>;
        async fn fetch_authorizations_for_event(&self, event_id: &EventId, status: Option<AuthorizationStatus>) -> Result<Vec<PaymentAuthorization>, BookingStoreError>;
    }
}

mock! {
    pub Capacity {}
    impl CapacityTracker for Capacity {
        async fn authorized_count(&self, event_id: &EventId) -> Result<u64, CapacityError>;
        async fn target_count(&self, event_id: &EventId) -> Result<Option<u64>, CapacityError>;
    }
    impl QuotaManagement for Capacity {
        async fn set_target_count(&self, event_id: &EventId, target: u64) -> Result<(), CapacityError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSummary, GatewayError>;
        async fn capture_intent(&self, intent_id: &str) -> Result<CaptureResult, GatewayError>;
        async fn cancel_intent(&self, intent_id: &str) -> Result<CancelResult, GatewayError>;
    }
}
