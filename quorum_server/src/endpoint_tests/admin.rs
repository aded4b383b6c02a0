use actix_web::{http::StatusCode, test::TestRequest, web::ServiceConfig};
use mockall::predicate::eq;
use quorum_common::Secret;
use quorum_engine::{
    db_types::{AuthorizationStatus, EventId},
    test_utils::sample_authorization,
    CancelResult,
    CapacityError,
};
use serde_json::{json, Value};

use super::{
    helpers::{api_data, send_request, test_config, ADMIN_TOKEN},
    mocks::{MockBookingStore, MockCapacity, MockGateway},
};
use crate::{config::ServerConfig, server::admin_scope};

fn configure(
    config: ServerConfig,
    store: MockBookingStore,
    capacity: MockCapacity,
    gateway: MockGateway,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(api_data(store, capacity, gateway))
            .service(admin_scope::<MockBookingStore, MockCapacity, MockGateway>(&config));
    }
}

fn no_mocks() -> impl FnOnce(&mut ServiceConfig) {
    configure(test_config(), MockBookingStore::new(), MockCapacity::new(), MockGateway::new())
}

fn bearer() -> (&'static str, String) {
    ("Authorization", format!("Bearer {ADMIN_TOKEN}"))
}

#[actix_web::test]
async fn missing_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/events/evt_1/capacity");
    let (status, body) = send_request(req, no_mocks()).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Missing or invalid access token"}"#);
}

#[actix_web::test]
async fn wrong_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/api/events/evt_1/capacity").insert_header(("Authorization", "Bearer nope"));
    let (status, _) = send_request(req, no_mocks()).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn operator_api_disabled_without_a_token() {
    let _ = env_logger::try_init().ok();
    let mut config = test_config();
    config.admin_token = Secret::default();
    let req = TestRequest::get().uri("/api/events/evt_1/capacity").insert_header(bearer());
    let (status, _) =
        send_request(req, configure(config, MockBookingStore::new(), MockCapacity::new(), MockGateway::new()))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn capacity_snapshot() {
    let _ = env_logger::try_init().ok();
    let mut capacity = MockCapacity::new();
    capacity.expect_authorized_count().with(eq(EventId::from("evt_1"))).times(1).returning(|_| Ok(3));
    capacity.expect_target_count().with(eq(EventId::from("evt_1"))).times(1).returning(|_| Ok(Some(5)));
    let req = TestRequest::get().uri("/api/events/evt_1/capacity").insert_header(bearer());
    let (status, body) =
        send_request(req, configure(test_config(), MockBookingStore::new(), capacity, MockGateway::new()))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::OK);
    let snapshot: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(snapshot, json!({"event_id": "evt_1", "authorized_count": 3, "target_count": 5}));
}

#[actix_web::test]
async fn authorizations_filtered_by_status() {
    let _ = env_logger::try_init().ok();
    let mut store = MockBookingStore::new();
    store
        .expect_fetch_authorizations_for_event()
        .with(eq(EventId::from("evt_1")), eq(Some(AuthorizationStatus::Authorized)))
        .times(1)
        .returning(|_, _| Ok(vec![sample_authorization("cs_1", "evt_1", Some("u_1"), 8000)]));
    let req = TestRequest::get().uri("/api/events/evt_1/authorizations?status=Authorized").insert_header(bearer());
    let (status, body) =
        send_request(req, configure(test_config(), store, MockCapacity::new(), MockGateway::new())).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let list: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["session_id"], "cs_1");
    assert_eq!(list[0]["payment_intent_id"], "pi_1");
}

#[actix_web::test]
async fn set_quota() {
    let _ = env_logger::try_init().ok();
    let mut capacity = MockCapacity::new();
    capacity.expect_set_target_count().with(eq(EventId::from("evt_1")), eq(8)).times(1).returning(|_, _| Ok(()));
    let req = TestRequest::put()
        .uri("/api/events/evt_1/quota")
        .insert_header(bearer())
        .set_json(json!({"target_count": 8}));
    let (status, body) =
        send_request(req, configure(test_config(), MockBookingStore::new(), capacity, MockGateway::new()))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"Event evt_1 now needs 8 participants"}"#);
}

#[actix_web::test]
async fn invalid_quota() {
    let _ = env_logger::try_init().ok();
    let mut capacity = MockCapacity::new();
    capacity
        .expect_set_target_count()
        .returning(|_, _| Err(CapacityError::InvalidQuota("The target must be at least 1".into())));
    let req = TestRequest::put()
        .uri("/api/events/evt_1/quota")
        .insert_header(bearer())
        .set_json(json!({"target_count": 0}));
    let (status, _) = send_request(req, configure(test_config(), MockBookingStore::new(), capacity, MockGateway::new()))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn release_cancels_held_payments() {
    let _ = env_logger::try_init().ok();
    let mut store = MockBookingStore::new();
    let mut gateway = MockGateway::new();
    store
        .expect_fetch_authorizations_for_event()
        .with(eq(EventId::from("evt_1")), eq(Some(AuthorizationStatus::Authorized)))
        .returning(|_, _| Ok(vec![sample_authorization("cs_1", "evt_1", Some("u_1"), 8000)]));
    gateway.expect_cancel_intent().withf(|id| id == "pi_1").times(1).returning(|_| Ok(CancelResult::Canceled));
    store
        .expect_update_status_for_intent()
        .withf(|id, _, to| id == "pi_1" && *to == AuthorizationStatus::Canceled)
        .times(1)
        .returning(|_, _, _| {
            let mut auth = sample_authorization("cs_1", "evt_1", Some("u_1"), 8000);
            auth.status = AuthorizationStatus::Canceled;
            Ok(Some(auth))
        });
    let req = TestRequest::post().uri("/api/events/evt_1/release").insert_header(bearer());
    let (status, body) = send_request(req, configure(test_config(), store, MockCapacity::new(), gateway)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let outcome: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(outcome["canceled"][0]["status"], "Canceled");
    assert_eq!(outcome["failed"], json!([]));
}
