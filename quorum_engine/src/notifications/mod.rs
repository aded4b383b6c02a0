//! Payer notifications.
//!
//! Every state change the engine makes to an authorization is published as an event (see [`crate::events`]). The
//! hooks built by [`create_notification_hooks`] turn those events into chat messages for the payer and hand them to a
//! [`crate::traits::Notifier`]. Delivery is best-effort: a failed message is logged and never affects the payment
//! flow.
mod dispatcher;
mod templates;

use std::fmt::Display;

pub use dispatcher::{create_notification_hooks, NotificationDispatcher};
use quorum_common::Cents;
use serde::{Deserialize, Serialize};
pub use templates::render_message;

use crate::db_types::{EventId, PaymentAuthorization};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PaymentAuthorized,
    PaymentCaptured,
    PaymentCancelled,
    PaymentExpired,
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PaymentAuthorized => "payment_authorized",
            Self::PaymentCaptured => "payment_captured",
            Self::PaymentCancelled => "payment_cancelled",
            Self::PaymentExpired => "payment_expired",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub event_id: Option<EventId>,
    pub amount: Option<Cents>,
    pub currency: String,
}

impl NotificationPayload {
    pub fn for_authorization(authorization: &PaymentAuthorization, amount: Option<Cents>) -> Self {
        Self {
            event_id: Some(authorization.event_id.clone()),
            amount: amount.or(Some(authorization.amount)),
            currency: authorization.currency.clone(),
        }
    }
}
