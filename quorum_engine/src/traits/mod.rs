//! # Engine seams
//!
//! This module defines the interface contracts the reconciliation engine relies on. The engine itself is
//! provider-agnostic: anything that implements these traits can act as its storage, its payment gateway or its
//! messaging channel.
//!
//! * [`BookingStore`] persists [`crate::db_types::PaymentAuthorization`] records. Every status change is a
//!   conditional update, so duplicate or concurrent webhook deliveries can never move a record out of a terminal state.
//! * [`CapacityTracker`] answers "how many guests hold a place, and how many do we need?". [`QuotaManagement`] lets
//!   operators set the target.
//! * [`PaymentGateway`] captures, cancels and looks up payments at the provider.
//! * [`Notifier`] delivers a text message to a payer.
mod booking_store;
mod capacity_tracker;
mod notifier;
mod payment_gateway;

pub use booking_store::{AuthorizeResult, BookingStore, BookingStoreError};
pub use capacity_tracker::{CapacityError, CapacityTracker, QuotaManagement};
pub use notifier::{Notifier, NotifierError};
pub use payment_gateway::{CancelResult, CaptureResult, GatewayError, PaymentGateway};
