//! Provider-agnostic views of the payment gateway's webhook events and objects.
//!
//! Integrations (see the server's Stripe integration) convert the gateway's wire format into these types before
//! handing them to [`crate::ReconciliationApi`].
use std::{collections::HashMap, fmt::Display};

use quorum_common::{Cents, DEFAULT_CURRENCY};
use serde::{Deserialize, Serialize};

use crate::db_types::{EventId, NewAuthorization, DEFAULT_BOOKING_TYPE};

pub const META_EVENT_ID: &str = "event_id";
pub const META_PAYER_ID: &str = "user_telegram_id";
pub const META_BOOKING_TYPE: &str = "booking_type";
pub const META_EVENT_TITLE: &str = "event_title";
pub const META_EVENT_DATE: &str = "event_date";
pub const META_EVENT_LOCATION: &str = "event_location";

/// The metadata attached to every checkout session and payment intent by the checkout-creation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingMetadata {
    pub event_id: Option<EventId>,
    pub payer_id: Option<String>,
    pub booking_type: Option<String>,
    pub event_title: Option<String>,
    pub event_date: Option<String>,
    pub event_location: Option<String>,
}

impl BookingMetadata {
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            event_id: get(META_EVENT_ID).map(EventId::from),
            payer_id: get(META_PAYER_ID),
            booking_type: get(META_BOOKING_TYPE),
            event_title: get(META_EVENT_TITLE),
            event_date: get(META_EVENT_DATE),
            event_location: get(META_EVENT_LOCATION),
        }
    }

    pub fn for_event<S: Into<String>>(event_id: S) -> Self {
        Self { event_id: Some(EventId::new(event_id)), ..Default::default() }
    }

    pub fn with_payer<S: Into<String>>(mut self, payer_id: S) -> Self {
        self.payer_id = Some(payer_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    pub amount_total: Option<Cents>,
    pub currency: Option<String>,
    pub payment_status: Option<String>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub metadata: BookingMetadata,
}

impl CheckoutSummary {
    pub fn new<S: Into<String>>(session_id: S, metadata: BookingMetadata) -> Self {
        Self {
            session_id: session_id.into(),
            payment_intent_id: None,
            amount_total: None,
            currency: None,
            payment_status: None,
            customer_email: None,
            customer_name: None,
            metadata,
        }
    }

    pub fn with_payment_intent<S: Into<String>>(mut self, intent_id: S) -> Self {
        self.payment_intent_id = Some(intent_id.into());
        self
    }

    pub fn with_amount<S: Into<String>>(mut self, amount: Cents, currency: S) -> Self {
        self.amount_total = Some(amount);
        self.currency = Some(currency.into());
        self
    }

    /// The authorization record this session describes. `None` if the session carries no `event_id`.
    pub fn to_new_authorization(&self) -> Option<NewAuthorization> {
        let event_id = self.metadata.event_id.clone()?;
        let mut auth = NewAuthorization::new(&self.session_id, event_id, self.amount_total.unwrap_or_default())
            .with_currency(self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))
            .with_booking_type(self.metadata.booking_type.as_deref().unwrap_or(DEFAULT_BOOKING_TYPE))
            .with_customer(self.customer_email.clone(), self.customer_name.clone());
        auth.payment_intent_id = self.payment_intent_id.clone();
        auth.payer_id = self.metadata.payer_id.clone();
        Some(auth)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSummary {
    pub intent_id: String,
    pub amount: Cents,
    pub amount_capturable: Cents,
    pub amount_received: Cents,
    pub currency: String,
    pub metadata: BookingMetadata,
}

impl IntentSummary {
    pub fn new<S: Into<String>>(intent_id: S, amount: Cents, metadata: BookingMetadata) -> Self {
        Self {
            intent_id: intent_id.into(),
            amount,
            amount_capturable: Cents::default(),
            amount_received: Cents::default(),
            currency: DEFAULT_CURRENCY.to_string(),
            metadata,
        }
    }

    pub fn with_capturable(mut self, amount: Cents) -> Self {
        self.amount_capturable = amount;
        self
    }

    pub fn with_received(mut self, amount: Cents) -> Self {
        self.amount_received = amount;
        self
    }

    /// What the payer was actually charged. Falls back to the intent amount for payloads that don't report
    /// `amount_received`.
    pub fn charged_amount(&self) -> Cents {
        if self.amount_received.is_positive() {
            self.amount_received
        } else {
            self.amount
        }
    }
}

/// The webhook events the reconciliation engine understands. Anything else arrives as `Unhandled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    CheckoutCompleted(CheckoutSummary),
    CheckoutExpired(CheckoutSummary),
    IntentRequiresCapture(IntentSummary),
    IntentAmountCapturableUpdated(IntentSummary),
    IntentSucceeded(IntentSummary),
    IntentCanceled(IntentSummary),
    Unhandled(String),
}

impl Display for GatewayEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CheckoutCompleted(s) => write!(f, "CheckoutCompleted({})", s.session_id),
            Self::CheckoutExpired(s) => write!(f, "CheckoutExpired({})", s.session_id),
            Self::IntentRequiresCapture(i) => write!(f, "IntentRequiresCapture({})", i.intent_id),
            Self::IntentAmountCapturableUpdated(i) => write!(f, "IntentAmountCapturableUpdated({})", i.intent_id),
            Self::IntentSucceeded(i) => write!(f, "IntentSucceeded({})", i.intent_id),
            Self::IntentCanceled(i) => write!(f, "IntentCanceled({})", i.intent_id),
            Self::Unhandled(t) => write!(f, "Unhandled({t})"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn metadata_from_map() {
        let map = HashMap::from([
            ("event_id".to_string(), "evt_1".to_string()),
            ("user_telegram_id".to_string(), "u_1".to_string()),
            ("booking_type".to_string(), " ".to_string()),
            ("unrelated".to_string(), "x".to_string()),
        ]);
        let meta = BookingMetadata::from_map(&map);
        assert_eq!(meta.event_id, Some(EventId::from("evt_1")));
        assert_eq!(meta.payer_id.as_deref(), Some("u_1"));
        assert_eq!(meta.booking_type, None);
        assert_eq!(BookingMetadata::from_map(&HashMap::new()), BookingMetadata::default());
    }

    #[test]
    fn session_without_event_has_no_authorization() {
        let session = CheckoutSummary::new("cs_1", BookingMetadata::default());
        assert!(session.to_new_authorization().is_none());
    }

    #[test]
    fn session_to_authorization() {
        let meta = BookingMetadata::for_event("evt_1").with_payer("u_1");
        let session = CheckoutSummary::new("cs_123", meta).with_payment_intent("pi_123").with_amount(8000.into(), "EUR");
        let auth = session.to_new_authorization().unwrap();
        assert_eq!(auth.session_id, "cs_123");
        assert_eq!(auth.payment_intent_id.as_deref(), Some("pi_123"));
        assert_eq!(auth.payer_id.as_deref(), Some("u_1"));
        assert_eq!(auth.amount, Cents::from(8000));
        assert_eq!(auth.currency, "eur");
        assert_eq!(auth.booking_type, DEFAULT_BOOKING_TYPE);
    }

    #[test]
    fn charged_amount_prefers_amount_received() {
        let intent = IntentSummary::new("pi_1", 8000.into(), BookingMetadata::default());
        assert_eq!(intent.charged_amount(), Cents::from(8000));
        assert_eq!(intent.with_received(7000.into()).charged_amount(), Cents::from(7000));
    }
}
