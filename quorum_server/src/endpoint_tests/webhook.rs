use std::net::SocketAddr;

use actix_web::{http::StatusCode, test::TestRequest, web::ServiceConfig};
use chrono::Utc;
use quorum_engine::{test_utils::sample_authorization, AuthorizeResult, BookingStoreError};
use serde_json::json;
use stripe_tools::webhook::signature_header;

use super::{
    helpers::{api_data, send_request, test_config, WEBHOOK_SECRET},
    mocks::{MockBookingStore, MockCapacity, MockGateway},
};
use crate::{config::ServerConfig, server::webhook_scope};

fn configure(config: ServerConfig, store: MockBookingStore) -> impl FnOnce(&mut ServiceConfig) {
    configure_with_capacity(config, store, MockCapacity::new())
}

fn configure_with_capacity(
    config: ServerConfig,
    store: MockBookingStore,
    capacity: MockCapacity,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(api_data(store, capacity, MockGateway::new()))
            .service(webhook_scope::<MockBookingStore, MockCapacity, MockGateway>(&config));
    }
}

fn signed_request(body: &str) -> TestRequest {
    let header = signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), body.as_bytes()).unwrap();
    TestRequest::post()
        .uri("/webhook")
        .insert_header(("Stripe-Signature", header))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
}

fn checkout_completed() -> String {
    json!({
        "id": "evt_stripe_1",
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_123",
            "amount_total": 8000,
            "currency": "eur",
            "payment_intent": "pi_123",
            "payment_status": "unpaid",
            "metadata": {"event_id": "evt_1", "user_telegram_id": "u_1"}
        }}
    })
    .to_string()
}

#[actix_web::test]
async fn missing_signature() {
    let _ = env_logger::try_init().ok();
    // The mock store has no expectations, so any call to it fails the test
    let req = TestRequest::post().uri("/webhook").set_payload(checkout_completed());
    let (status, body) = send_request(req, configure(test_config(), MockBookingStore::new())).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid signature"}"#);
}

#[actix_web::test]
async fn invalid_signature() {
    let _ = env_logger::try_init().ok();
    let body = checkout_completed();
    let header = signature_header("whsec_someone_else", Utc::now().timestamp(), body.as_bytes()).unwrap();
    let req = TestRequest::post().uri("/webhook").insert_header(("Stripe-Signature", header)).set_payload(body);
    let (status, body) = send_request(req, configure(test_config(), MockBookingStore::new())).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid signature"}"#);
}

#[actix_web::test]
async fn tampered_body() {
    let _ = env_logger::try_init().ok();
    let body = checkout_completed();
    let header = signature_header(WEBHOOK_SECRET, Utc::now().timestamp(), body.as_bytes()).unwrap();
    let tampered = body.replace("8000", "1");
    let req = TestRequest::post().uri("/webhook").insert_header(("Stripe-Signature", header)).set_payload(tampered);
    let (status, _) = send_request(req, configure(test_config(), MockBookingStore::new())).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_events_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = json!({"id": "evt_stripe_2", "type": "customer.created", "data": {"object": {"id": "cus_1"}}});
    let req = signed_request(&body.to_string());
    let (status, body) = send_request(req, configure(test_config(), MockBookingStore::new())).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn checkout_completed_is_recorded() {
    let _ = env_logger::try_init().ok();
    let mut store = MockBookingStore::new();
    store
        .expect_authorize_checkout()
        .withf(|auth| {
            auth.session_id == "cs_123" &&
                auth.payment_intent_id.as_deref() == Some("pi_123") &&
                auth.event_id.as_str() == "evt_1" &&
                auth.payer_id.as_deref() == Some("u_1")
        })
        .times(1)
        .returning(|_| Ok(AuthorizeResult::Inserted(sample_authorization("cs_123", "evt_1", Some("u_1"), 8000))));
    // the new authorization triggers a quorum check. Without a target nothing is captured.
    let mut capacity = MockCapacity::new();
    capacity.expect_authorized_count().withf(|id| id.as_str() == "evt_1").times(1).returning(|_| Ok(1));
    capacity.expect_target_count().withf(|id| id.as_str() == "evt_1").times(1).returning(|_| Ok(None));
    let req = signed_request(&checkout_completed());
    let (status, body) = send_request(req, configure_with_capacity(test_config(), store, capacity)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn processing_errors_are_still_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut store = MockBookingStore::new();
    store
        .expect_authorize_checkout()
        .times(1)
        .returning(|_| Err(BookingStoreError::DatabaseError("database is locked".into())));
    let req = signed_request(&checkout_completed());
    let (status, body) = send_request(req, configure(test_config(), store)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn undecodable_objects_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = json!({"id": "evt_stripe_3", "type": "payment_intent.succeeded", "data": {"object": {"id": "pi_1"}}});
    let req = signed_request(&body.to_string());
    let (status, body) = send_request(req, configure(test_config(), MockBookingStore::new())).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn whitelist_rejects_unknown_peers() {
    let _ = env_logger::try_init().ok();
    let mut config = test_config();
    config.webhook.whitelist = Some(vec!["3.18.12.63".parse().unwrap()]);
    let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
    let req = signed_request(&checkout_completed()).peer_addr(peer);
    let (status, _) = send_request(req, configure(config, MockBookingStore::new())).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn whitelist_admits_stripe() {
    let _ = env_logger::try_init().ok();
    let mut config = test_config();
    config.webhook.whitelist = Some(vec!["3.18.12.63".parse().unwrap()]);
    let peer: SocketAddr = "3.18.12.63:443".parse().unwrap();
    let body = json!({"id": "evt_stripe_4", "type": "charge.refunded", "data": {"object": {"id": "ch_1"}}});
    let req = signed_request(&body.to_string()).peer_addr(peer);
    let (status, body) = send_request(req, configure(config, MockBookingStore::new())).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"received":true}"#);
}

#[actix_web::test]
async fn whitelist_ignores_a_spoofed_forwarding_header() {
    let _ = env_logger::try_init().ok();
    let mut config = test_config();
    config.use_x_forwarded_for = true;
    config.webhook.whitelist = Some(vec!["3.18.12.63".parse().unwrap()]);
    let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
    // the sender claims a Stripe address. The proxy appended the address it actually saw.
    let req = signed_request(&checkout_completed())
        .peer_addr(peer)
        .insert_header(("X-Forwarded-For", "3.18.12.63, 198.51.100.7"));
    let (status, _) = send_request(req, configure(config, MockBookingStore::new())).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}
