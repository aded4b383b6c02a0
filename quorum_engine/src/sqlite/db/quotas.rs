use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::EventId;

pub async fn fetch_target_count(event_id: &EventId, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT target_count FROM event_quotas WHERE event_id = $1")
        .bind(event_id.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn upsert_target_count(event_id: &EventId, target: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO event_quotas (event_id, target_count) VALUES ($1, $2)
            ON CONFLICT(event_id) DO UPDATE SET target_count = excluded.target_count, updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(event_id.as_str())
    .bind(target)
    .execute(conn)
    .await?;
    debug!("📝️ Participant target for event {event_id} set to {target}");
    Ok(())
}
