//! `SqliteDatabase` is a concrete implementation of a reconciliation engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the storage traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{authorizations, db_url, new_pool, quotas};
use crate::{
    db_types::{AuthorizationStatus, EventId, NewAuthorization, PaymentAuthorization},
    traits::{AuthorizeResult, BookingStore, BookingStoreError, CapacityError, CapacityTracker, QuotaManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the `QPS_DATABASE_URL` environment variable (or the default).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Wraps an existing pool. Used for in-memory databases, where the pool has to be configured to keep its single
    /// connection alive.
    pub fn from_pool(url: &str, pool: SqlitePool) -> Self {
        Self { url: url.to_string(), pool }
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// The partial unique index on (event_id, payer_id) for captured records is the last line of defence against charging
/// a payer twice.
fn map_status_update_error(intent_id: &str, e: sqlx::Error) -> BookingStoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            BookingStoreError::DuplicateCapture(intent_id.to_string())
        },
        _ => BookingStoreError::from(e),
    }
}

impl BookingStore for SqliteDatabase {
    async fn insert_pending_checkout(
        &self,
        authorization: NewAuthorization,
    ) -> Result<(PaymentAuthorization, bool), BookingStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result =
            authorizations::idempotent_insert(authorization, AuthorizationStatus::PendingCheckout, &mut conn).await?;
        Ok(result)
    }

    async fn authorize_checkout(&self, authorization: NewAuthorization) -> Result<AuthorizeResult, BookingStoreError> {
        let mut tx = self.pool.begin().await?;
        let session_id = authorization.session_id.clone();
        let result = match authorizations::fetch_by_session_id(&session_id, &mut tx).await? {
            None => {
                let auth =
                    authorizations::insert_authorization(authorization, AuthorizationStatus::Authorized, &mut tx)
                        .await?;
                AuthorizeResult::Inserted(auth)
            },
            Some(existing) if existing.status == AuthorizationStatus::PendingCheckout => {
                let auth = authorizations::promote_pending_checkout(authorization, &mut tx)
                    .await?
                    .ok_or_else(|| BookingStoreError::AuthorizationNotFound(session_id.clone()))?;
                AuthorizeResult::Promoted(auth)
            },
            Some(existing) => AuthorizeResult::AlreadyProcessed(existing),
        };
        tx.commit().await?;
        debug!("🗃️ Checkout session {session_id} authorization result: {result:?}");
        Ok(result)
    }

    async fn expire_checkout(
        &self,
        authorization: NewAuthorization,
    ) -> Result<Option<PaymentAuthorization>, BookingStoreError> {
        use AuthorizationStatus::*;
        let mut tx = self.pool.begin().await?;
        let session_id = authorization.session_id.clone();
        let (existing, inserted) = authorizations::idempotent_insert(authorization, Expired, &mut tx).await?;
        let result = if inserted {
            Some(existing)
        } else {
            authorizations::update_status_for_session(&session_id, &[PendingCheckout, Authorized], Expired, &mut tx)
                .await?
        };
        tx.commit().await?;
        Ok(result)
    }

    async fn update_status_for_intent(
        &self,
        intent_id: &str,
        from: &[AuthorizationStatus],
        to: AuthorizationStatus,
    ) -> Result<Option<PaymentAuthorization>, BookingStoreError> {
        let mut conn = self.pool.acquire().await?;
        authorizations::update_status_for_intent(intent_id, from, to, &mut conn)
            .await
            .map_err(|e| map_status_update_error(intent_id, e))
    }

    async fn fetch_by_session_id(&self, session_id: &str) -> Result<Option<PaymentAuthorization>, BookingStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auth = authorizations::fetch_by_session_id(session_id, &mut conn).await?;
        Ok(auth)
    }

    async fn fetch_by_intent_id(&self, intent_id: &str) -> Result<Option<PaymentAuthorization>, BookingStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auth = authorizations::fetch_by_intent_id(intent_id, &mut conn).await?;
        Ok(auth)
    }

    async fn fetch_authorizations_for_event(
        &self,
        event_id: &EventId,
        status: Option<AuthorizationStatus>,
    ) -> Result<Vec<PaymentAuthorization>, BookingStoreError> {
        let mut conn = self.pool.acquire().await?;
        let auths = authorizations::fetch_for_event(event_id, status, &mut conn).await?;
        Ok(auths)
    }

    async fn close(&mut self) -> Result<(), BookingStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CapacityTracker for SqliteDatabase {
    async fn authorized_count(&self, event_id: &EventId) -> Result<u64, CapacityError> {
        let mut conn = self.pool.acquire().await?;
        let count = authorizations::count_committed(event_id, &mut conn).await?;
        u64::try_from(count).map_err(|e| CapacityError::DatabaseError(format!("Invalid count {count}. {e}")))
    }

    async fn target_count(&self, event_id: &EventId) -> Result<Option<u64>, CapacityError> {
        let mut conn = self.pool.acquire().await?;
        let target = quotas::fetch_target_count(event_id, &mut conn).await?;
        target
            .map(|t| u64::try_from(t).map_err(|e| CapacityError::InvalidQuota(format!("Stored target {t}. {e}"))))
            .transpose()
    }
}

impl QuotaManagement for SqliteDatabase {
    async fn set_target_count(&self, event_id: &EventId, target: u64) -> Result<(), CapacityError> {
        let target =
            i64::try_from(target).map_err(|_| CapacityError::InvalidQuota(format!("{target} is too large")))?;
        let mut conn = self.pool.acquire().await?;
        quotas::upsert_target_count(event_id, target, &mut conn).await?;
        Ok(())
    }
}
