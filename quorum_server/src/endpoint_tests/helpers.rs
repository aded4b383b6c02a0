use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web::{self, ServiceConfig},
    App,
};
use log::debug;
use quorum_common::Secret;
use quorum_engine::{events::EventProducers, ReconciliationApi};

use super::mocks::{MockBookingStore, MockCapacity, MockGateway};
use crate::config::ServerConfig;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const ADMIN_TOKEN: &str = "letmein";

pub type MockApi = ReconciliationApi<MockBookingStore, MockCapacity, MockGateway>;

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::new("127.0.0.1", 8470);
    config.webhook.signing_secret = Secret::new(WEBHOOK_SECRET.to_string());
    config.admin_token = Secret::new(ADMIN_TOKEN.to_string());
    config
}

pub fn api_data(store: MockBookingStore, capacity: MockCapacity, gateway: MockGateway) -> web::Data<MockApi> {
    web::Data::new(ReconciliationApi::new(store, capacity, gateway, EventProducers::default()))
}

pub async fn send_request<F>(req: TestRequest, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?;
    let status = res.status();
    let body = String::from_utf8_lossy(&test::read_body(res).await).into_owned();
    Ok((status, body))
}
