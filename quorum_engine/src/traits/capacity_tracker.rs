use thiserror::Error;

use crate::db_types::{EventCapacitySnapshot, EventId};

#[derive(Debug, Clone, Error)]
pub enum CapacityError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Invalid participant target. {0}")]
    InvalidQuota(String),
}

impl From<sqlx::Error> for CapacityError {
    fn from(e: sqlx::Error) -> Self {
        CapacityError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait CapacityTracker {
    /// The number of participants committed to the event: authorizations that hold funds (`Authorized`) or have
    /// already been collected (`Captured`). Pending, canceled and expired checkouts are not counted.
    ///
    /// Captured records keep counting so that an event stays at quorum while its payments are being captured. A
    /// capture that failed, or a booking that arrives after the event was confirmed, is then captured by the next
    /// reconciliation.
    async fn authorized_count(&self, event_id: &EventId) -> Result<u64, CapacityError>;

    /// The number of authorizations needed before the event's payments are captured, if one has been set.
    async fn target_count(&self, event_id: &EventId) -> Result<Option<u64>, CapacityError>;

    async fn capacity_snapshot(&self, event_id: &EventId) -> Result<EventCapacitySnapshot, CapacityError> {
        let authorized_count = self.authorized_count(event_id).await?;
        let target_count = self.target_count(event_id).await?;
        Ok(EventCapacitySnapshot { event_id: event_id.clone(), authorized_count, target_count })
    }
}

/// Operator control over event participant targets.
#[allow(async_fn_in_trait)]
pub trait QuotaManagement: CapacityTracker {
    /// Sets (or replaces) the participant target for the event.
    async fn set_target_count(&self, event_id: &EventId, target: u64) -> Result<(), CapacityError>;
}
