use actix_web::{http::StatusCode, test::TestRequest, web::ServiceConfig};
use quorum_engine::{
    db_types::Cents,
    gateway_types::{BookingMetadata, CheckoutSummary},
    GatewayError,
};
use serde_json::Value;

use super::{
    helpers::{api_data, send_request},
    mocks::{MockBookingStore, MockCapacity, MockGateway},
};
use crate::server::api_scope;

fn configure(gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(api_data(MockBookingStore::new(), MockCapacity::new(), gateway))
            .service(api_scope::<MockBookingStore, MockCapacity, MockGateway>());
    }
}

#[actix_web::test]
async fn session_id_is_required() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/booking-details");
    let (status, body) = send_request(req, configure(MockGateway::new())).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid request. Session ID required"}"#);
}

#[actix_web::test]
async fn unknown_session() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway
        .expect_retrieve_checkout_session()
        .withf(|id| id == "cs_nope")
        .times(1)
        .returning(|id| Err(GatewayError::NotFound(id.to_string())));
    let req = TestRequest::get().uri("/api/booking-details?session_id=cs_nope");
    let (status, _) = send_request(req, configure(gateway)).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn gateway_outage() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway.expect_retrieve_checkout_session().returning(|_| Err(GatewayError::Timeout("10s elapsed".into())));
    let req = TestRequest::get().uri("/api/booking-details?session_id=cs_123");
    let (status, _) = send_request(req, configure(gateway)).await.unwrap();
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn booking_details_for_a_session() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway.expect_retrieve_checkout_session().withf(|id| id == "cs_123").times(1).returning(|id| {
        let mut meta = BookingMetadata::for_event("evt_1").with_payer("u_1");
        meta.event_title = Some("Jazz night".into());
        let mut session = CheckoutSummary::new(id, meta).with_payment_intent("pi_123").with_amount(Cents::from(8000), "eur");
        session.payment_status = Some("unpaid".into());
        session.customer_email = Some("guest@example.com".into());
        session.customer_name = Some("Guest".into());
        Ok(session)
    });
    let req = TestRequest::get().uri("/api/booking-details?session_id=cs_123");
    let (status, body) = send_request(req, configure(gateway)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let details: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(details["sessionId"], "cs_123");
    assert_eq!(details["amount"], 80.0);
    assert_eq!(details["currency"], "eur");
    assert_eq!(details["customerEmail"], "guest@example.com");
    assert_eq!(details["customerName"], "Guest");
    assert_eq!(details["status"], "unpaid");
    assert_eq!(details["eventTitle"], "Jazz night");
    assert_eq!(details["eventLocation"], "Villa Storica - Zona Brera");
}
