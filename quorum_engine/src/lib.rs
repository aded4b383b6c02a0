//! Quorum Reconciliation Engine
//!
//! The Quorum engine keeps a ledger of payment authorizations for events that only go ahead once enough guests have
//! committed. Guests authorize a payment at checkout, the funds are held, and the held payments are only captured once
//! the event reaches its participant target. Events that never reach the target are released without charging anyone.
//!
//! This library contains the core logic and is provider-agnostic. It is divided into the following sections:
//! 1. Storage ([`mod@sqlite`]). SQLite is the supported backend. The data types used in the database are defined in
//!    [`mod@db_types`] and are public.
//! 2. The engine seams ([`mod@traits`]). Backends, payment gateways and messaging channels implement these traits in
//!    order to plug into the engine.
//! 3. The public API ([`ReconciliationApi`]). Webhook events from the payment gateway, converted into
//!    [`gateway_types::GatewayEvent`]s, are handed to the API, which drives every authorization through its lifecycle.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted whenever an
//! authorization changes state. A simple Actor framework is used so that you can easily hook into these events and
//! perform custom actions. The [`mod@notifications`] module uses this to message payers.
pub mod db_types;
pub mod events;
pub mod gateway_types;
pub mod notifications;
mod qe_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod test_utils;

pub use qe_api::{
    errors::ReconciliationError,
    event_locks::EventLocks,
    reconciliation_api::ReconciliationApi,
    reconciliation_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AuthorizeResult,
    BookingStore,
    BookingStoreError,
    CancelResult,
    CapacityError,
    CapacityTracker,
    CaptureResult,
    GatewayError,
    Notifier,
    NotifierError,
    PaymentGateway,
    QuotaManagement,
};
