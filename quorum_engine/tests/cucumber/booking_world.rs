use std::time::Duration;

use cucumber::World;
use log::*;
use quorum_engine::{
    events::EventHandlers,
    notifications::{create_notification_hooks, NotificationDispatcher},
    test_utils::{memory_database, RecordingNotifier, ScriptedGateway},
    ReconciliationApi,
    SqliteDatabase,
};
use tokio::time::sleep;

pub type BookingApi = ReconciliationApi<SqliteDatabase, SqliteDatabase, ScriptedGateway>;

#[derive(Default, Debug, World)]
pub struct BookingWorld {
    pub system: Option<BookingSystem>,
}

pub struct BookingSystem {
    pub api: BookingApi,
    pub db: SqliteDatabase,
    pub gateway: ScriptedGateway,
    pub notifier: RecordingNotifier,
}

impl std::fmt::Debug for BookingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BookingSystem({:?})", self.db)
    }
}

impl BookingWorld {
    pub fn system(&self) -> &BookingSystem {
        self.system.as_ref().expect("Booking system not initialised")
    }

    pub fn api(&self) -> &BookingApi {
        &self.system().api
    }
}

impl BookingSystem {
    pub async fn new() -> Self {
        let db = memory_database().await;
        let gateway = ScriptedGateway::default();
        let notifier = RecordingNotifier::default();
        let hooks = create_notification_hooks(NotificationDispatcher::new(notifier.clone()));
        let handlers = EventHandlers::new(32, hooks);
        let producers = handlers.producers();
        // the handlers shut down by themselves once the api (and its producers) is dropped at the end of the scenario
        let _handles = handlers.start_handlers();
        let api = ReconciliationApi::new(db.clone(), db.clone(), gateway.clone(), producers);
        debug!("🚀️ Booking system ready");
        Self { api, db, gateway, notifier }
    }

    /// Notifications are delivered in the background. Gives them up to a second to arrive.
    pub async fn messages_for(&self, payer: &str, expected: usize) -> Vec<String> {
        for _ in 0..20 {
            let messages = self.notifier.messages_for(payer).await;
            if messages.len() >= expected {
                return messages;
            }
            sleep(Duration::from_millis(50)).await;
        }
        self.notifier.messages_for(payer).await
    }
}
