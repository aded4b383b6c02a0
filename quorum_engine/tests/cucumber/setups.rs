use cucumber::given;
use quorum_engine::db_types::EventId;

use crate::cucumber::{booking_world::BookingSystem, BookingWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut BookingWorld) {
    let system = BookingSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "event {word} needs {int} participants")]
async fn set_target(world: &mut BookingWorld, event_id: String, target: u64) {
    world.api().set_target_count(&EventId::from(event_id), target).await.expect("Error setting participant target");
}
