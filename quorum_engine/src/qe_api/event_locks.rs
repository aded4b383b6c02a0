use std::{collections::HashMap, sync::Arc};

use log::trace;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db_types::EventId;

/// One async mutex per event id.
///
/// Quorum checks and the captures that follow them are serialised per event, so two webhook deliveries for the same
/// event can never both decide to capture. Different events proceed in parallel.
#[derive(Clone, Default)]
pub struct EventLocks {
    locks: Arc<Mutex<HashMap<EventId, Arc<Mutex<()>>>>>,
}

impl EventLocks {
    /// Waits for exclusive access to the event. Access is released when the guard is dropped.
    pub async fn lock_event(&self, event_id: &EventId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // locks nobody is holding or waiting on can go
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(event_id.clone()).or_default())
        };
        trace!("🔄️ Waiting for lock on event {event_id}");
        lock.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
