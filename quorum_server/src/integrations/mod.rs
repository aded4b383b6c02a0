//! Adapters between the reconciliation engine's seams and the outside world.
pub mod stripe;
pub mod telegram;
