//! Fixtures shared by the engine's unit tests, its integration tests and the server's endpoint tests.
mod prepare_env;
mod recording_notifier;
mod scripted_gateway;

pub use prepare_env::{memory_database, sample_authorization};
pub use recording_notifier::RecordingNotifier;
pub use scripted_gateway::ScriptedGateway;
