use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use quorum_common::Cents;
use quorum_common::DEFAULT_CURRENCY;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub const DEFAULT_BOOKING_TYPE: &str = "telegram_bot";

#[derive(Debug, Clone, Error)]
#[error("Type conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------       EventId       ---------------------------------------------------------
/// The identifier of a bookable event, as carried in the checkout metadata (`metadata.event_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

//--------------------------------------  AuthorizationStatus  -------------------------------------------------------
/// The lifecycle of a payment authorization.
///
/// ```text
/// PendingCheckout ──► Authorized ──┬──► Captured
///        │                         ├──► Canceled
///        └─────────────────────────┴──► Expired
/// ```
///
/// `Captured`, `Canceled` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    /// A checkout session has been created, but the guest has not completed it yet.
    PendingCheckout,
    /// The guest completed checkout. Funds are on hold, and count towards the event quota.
    Authorized,
    /// The held funds have been transferred.
    Captured,
    /// The hold was released without charging the guest.
    Canceled,
    /// The checkout session expired before a hold was placed, or the hold lapsed.
    Expired,
}

impl AuthorizationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Captured | Self::Canceled | Self::Expired)
    }
}

impl Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PendingCheckout => "PendingCheckout",
            Self::Authorized => "Authorized",
            Self::Captured => "Captured",
            Self::Canceled => "Canceled",
            Self::Expired => "Expired",
        };
        f.write_str(s)
    }
}

impl FromStr for AuthorizationStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingCheckout" => Ok(Self::PendingCheckout),
            "Authorized" => Ok(Self::Authorized),
            "Captured" => Ok(Self::Captured),
            "Canceled" => Ok(Self::Canceled),
            "Expired" => Ok(Self::Expired),
            s => Err(ConversionError(format!("Invalid authorization status: {s}"))),
        }
    }
}

//--------------------------------------  PaymentAuthorization  ------------------------------------------------------
/// One guest's conditional commitment to pay for one event.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentAuthorization {
    pub id: i64,
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub event_id: EventId,
    /// The recipient id on the channel the booking came from, e.g. a Telegram chat id.
    pub payer_id: Option<String>,
    pub amount: Cents,
    pub currency: String,
    pub booking_type: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub status: AuthorizationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    NewAuthorization   -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuthorization {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub event_id: EventId,
    pub payer_id: Option<String>,
    pub amount: Cents,
    pub currency: String,
    pub booking_type: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
}

impl NewAuthorization {
    pub fn new<S: Into<String>>(session_id: S, event_id: EventId, amount: Cents) -> Self {
        Self {
            session_id: session_id.into(),
            payment_intent_id: None,
            event_id,
            payer_id: None,
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            booking_type: DEFAULT_BOOKING_TYPE.to_string(),
            customer_email: None,
            customer_name: None,
        }
    }

    pub fn with_payment_intent<S: Into<String>>(mut self, intent_id: S) -> Self {
        self.payment_intent_id = Some(intent_id.into());
        self
    }

    pub fn with_payer<S: Into<String>>(mut self, payer_id: S) -> Self {
        self.payer_id = Some(payer_id.into());
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into().to_ascii_lowercase();
        self
    }

    pub fn with_booking_type<S: Into<String>>(mut self, booking_type: S) -> Self {
        self.booking_type = booking_type.into();
        self
    }

    pub fn with_customer(mut self, email: Option<String>, name: Option<String>) -> Self {
        self.customer_email = email;
        self.customer_name = name;
        self
    }
}

//--------------------------------------  EventCapacitySnapshot  -----------------------------------------------------
/// A point-in-time view of how close an event is to its participant quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCapacitySnapshot {
    pub event_id: EventId,
    /// Participants committed to the event (status `Authorized` or `Captured`)
    pub authorized_count: u64,
    /// The number of authorizations needed before payments are captured. `None` if no quota has been set.
    pub target_count: Option<u64>,
}

impl EventCapacitySnapshot {
    pub fn quorum_reached(&self) -> bool {
        matches!(self.target_count, Some(target) if self.authorized_count >= target)
    }
}

impl Display for EventCapacitySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target_count {
            Some(target) => write!(f, "{}: {}/{target} authorized", self.event_id, self.authorized_count),
            None => write!(f, "{}: {} authorized, no target set", self.event_id, self.authorized_count),
        }
    }
}
