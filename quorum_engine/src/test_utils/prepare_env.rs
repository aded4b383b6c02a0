use chrono::Utc;
use log::*;
use quorum_common::Cents;
use sqlx::sqlite::SqlitePoolOptions;

use crate::{
    db_types::{AuthorizationStatus, EventId, PaymentAuthorization, DEFAULT_BOOKING_TYPE},
    SqliteDatabase,
};

const MEMORY_DB_URL: &str = "sqlite::memory:";

/// A fresh, fully migrated in-memory database.
///
/// An in-memory SQLite database lives and dies with its connection, so the pool holds exactly one connection that is
/// never recycled.
pub async fn memory_database() -> SqliteDatabase {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(MEMORY_DB_URL)
        .await
        .expect("Error creating in-memory database");
    let db = SqliteDatabase::from_pool(MEMORY_DB_URL, pool);
    db.migrate().await.expect("Error running DB migrations");
    debug!("🚀️ In-memory database ready");
    db
}

/// An `Authorized` record that was never stored. The payment intent id is derived from the session id (`cs_1` gives
/// `pi_1`).
pub fn sample_authorization(session_id: &str, event_id: &str, payer_id: Option<&str>, amount: i64) -> PaymentAuthorization {
    let now = Utc::now();
    PaymentAuthorization {
        id: 1,
        session_id: session_id.to_string(),
        payment_intent_id: Some(format!("pi_{}", session_id.trim_start_matches("cs_"))),
        event_id: EventId::from(event_id),
        payer_id: payer_id.map(String::from),
        amount: Cents::from(amount),
        currency: "eur".to_string(),
        booking_type: DEFAULT_BOOKING_TYPE.to_string(),
        customer_email: None,
        customer_name: None,
        status: AuthorizationStatus::Authorized,
        created_at: now,
        updated_at: now,
    }
}
