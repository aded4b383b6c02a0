use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{AuthorizationStatus, EventId, NewAuthorization, PaymentAuthorization};

/// Inserts the checkout session into the database with the given status, returning `false` in the second parameter
/// if a record for the session already exists. An existing record is returned unchanged.
pub async fn idempotent_insert(
    authorization: NewAuthorization,
    status: AuthorizationStatus,
    conn: &mut SqliteConnection,
) -> Result<(PaymentAuthorization, bool), sqlx::Error> {
    let inserted = match fetch_by_session_id(&authorization.session_id, &mut *conn).await? {
        Some(existing) => (existing, false),
        None => {
            let auth = insert_authorization(authorization, status, conn).await?;
            debug!("📝️ Authorization for session [{}] inserted with id {}", auth.session_id, auth.id);
            (auth, true)
        },
    };
    Ok(inserted)
}

/// Inserts a new authorization into the database using the given connection. This is not atomic. You can embed this
/// call inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_authorization(
    authorization: NewAuthorization,
    status: AuthorizationStatus,
    conn: &mut SqliteConnection,
) -> Result<PaymentAuthorization, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO payment_authorizations (
                session_id,
                payment_intent_id,
                event_id,
                payer_id,
                amount,
                currency,
                booking_type,
                customer_email,
                customer_name,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(authorization.session_id)
    .bind(authorization.payment_intent_id)
    .bind(authorization.event_id)
    .bind(authorization.payer_id)
    .bind(authorization.amount)
    .bind(authorization.currency)
    .bind(authorization.booking_type)
    .bind(authorization.customer_email)
    .bind(authorization.customer_name)
    .bind(status)
    .fetch_one(conn)
    .await
}

/// Moves a `PendingCheckout` record to `Authorized`, filling in the details that are only known once checkout has
/// completed. Returns `None` if the session has no record in `PendingCheckout`.
pub async fn promote_pending_checkout(
    authorization: NewAuthorization,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAuthorization>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE payment_authorizations SET
                status = 'Authorized',
                payment_intent_id = COALESCE($2, payment_intent_id),
                payer_id = COALESCE($3, payer_id),
                amount = $4,
                currency = $5,
                customer_email = COALESCE($6, customer_email),
                customer_name = COALESCE($7, customer_name),
                updated_at = CURRENT_TIMESTAMP
            WHERE session_id = $1 AND status = 'PendingCheckout'
            RETURNING *;
        "#,
    )
    .bind(authorization.session_id)
    .bind(authorization.payment_intent_id)
    .bind(authorization.payer_id)
    .bind(authorization.amount)
    .bind(authorization.currency)
    .bind(authorization.customer_email)
    .bind(authorization.customer_name)
    .fetch_optional(conn)
    .await
}

/// Conditionally updates the status of the record matching `key_column = key`. The update only happens if the current
/// status is one of `from`.
async fn compare_and_set_status(
    key_column: &str,
    key: &str,
    from: &[AuthorizationStatus],
    to: AuthorizationStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAuthorization>, sqlx::Error> {
    if from.is_empty() {
        return Ok(None);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE payment_authorizations SET status = ");
    builder.push_bind(to);
    builder.push(", updated_at = CURRENT_TIMESTAMP WHERE ");
    builder.push(key_column);
    builder.push(" = ");
    builder.push_bind(key);
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in from {
        statuses.push_bind(*status);
    }
    statuses.push_unseparated(") RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let updated = builder.build_query_as::<PaymentAuthorization>().fetch_optional(conn).await?;
    match &updated {
        Some(auth) => debug!("📝️ Authorization #{} ({key}) is now {to}", auth.id),
        None => debug!("📝️ No authorization for {key} in {from:?}. Status not changed to {to}"),
    }
    Ok(updated)
}

pub async fn update_status_for_intent(
    intent_id: &str,
    from: &[AuthorizationStatus],
    to: AuthorizationStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAuthorization>, sqlx::Error> {
    compare_and_set_status("payment_intent_id", intent_id, from, to, conn).await
}

pub async fn update_status_for_session(
    session_id: &str,
    from: &[AuthorizationStatus],
    to: AuthorizationStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAuthorization>, sqlx::Error> {
    compare_and_set_status("session_id", session_id, from, to, conn).await
}

pub async fn fetch_by_session_id(
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAuthorization>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_authorizations WHERE session_id = $1")
        .bind(session_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_by_intent_id(
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentAuthorization>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_authorizations WHERE payment_intent_id = $1")
        .bind(intent_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_for_event(
    event_id: &EventId,
    status: Option<AuthorizationStatus>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentAuthorization>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM payment_authorizations WHERE event_id = ");
    builder.push_bind(event_id.as_str());
    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    builder.build_query_as::<PaymentAuthorization>().fetch_all(conn).await
}

/// Counts the event's authorizations that have committed funds, i.e. those that are `Authorized` or `Captured`.
pub async fn count_committed(event_id: &EventId, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM payment_authorizations WHERE event_id = $1 AND status IN ('Authorized', 'Captured')",
    )
    .bind(event_id.as_str())
    .fetch_one(conn)
    .await
}
