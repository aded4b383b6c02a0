//! The public face of the reconciliation engine.
//!
//! [`ReconciliationApi`] receives provider-agnostic webhook events, applies the matching state transition to the
//! authorization ledger and, once an event has enough authorized participants, captures every held payment.
pub mod errors;
pub mod event_locks;
pub mod reconciliation_api;
pub mod reconciliation_objects;
