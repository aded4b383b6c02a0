use std::fmt::Display;

use quorum_engine::{db_types::AuthorizationStatus, gateway_types::CheckoutSummary};
use serde::{Deserialize, Serialize};

const DEFAULT_EVENT_TITLE: &str = "Notti di Velluto";
const DEFAULT_EVENT_DATE: &str = "15 Febbraio 2025, ore 21:00";
const DEFAULT_EVENT_LOCATION: &str = "Villa Storica - Zona Brera";

/// The acknowledgement sent for every authenticated webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingDetailsQuery {
    pub session_id: Option<String>,
}

/// What the booking confirmation page shows after checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub session_id: String,
    /// In major currency units, e.g. `80.0` for €80.00
    pub amount: f64,
    pub currency: String,
    pub customer_email: String,
    pub customer_name: String,
    pub status: Option<String>,
    pub event_title: String,
    pub event_date: String,
    pub event_location: String,
}

impl From<CheckoutSummary> for BookingDetails {
    fn from(session: CheckoutSummary) -> Self {
        let meta = session.metadata;
        Self {
            session_id: session.session_id,
            amount: session.amount_total.map(|a| a.as_major_units()).unwrap_or_default(),
            currency: session.currency.unwrap_or_else(|| quorum_common::DEFAULT_CURRENCY.to_string()),
            customer_email: session.customer_email.unwrap_or_default(),
            customer_name: session.customer_name.unwrap_or_default(),
            status: session.payment_status,
            event_title: meta.event_title.unwrap_or_else(|| DEFAULT_EVENT_TITLE.to_string()),
            event_date: meta.event_date.unwrap_or_else(|| DEFAULT_EVENT_DATE.to_string()),
            event_location: meta.event_location.unwrap_or_else(|| DEFAULT_EVENT_LOCATION.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationQuery {
    pub status: Option<AuthorizationStatus>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaUpdate {
    pub target_count: u64,
}

#[cfg(test)]
mod test {
    use quorum_engine::{
        db_types::Cents,
        gateway_types::{BookingMetadata, CheckoutSummary},
    };

    use super::*;

    #[test]
    fn booking_details_from_session() {
        let mut meta = BookingMetadata::for_event("evt_1");
        meta.event_title = Some("Jazz night".into());
        let mut session = CheckoutSummary::new("cs_123", meta).with_amount(Cents::from(8000), "eur");
        session.payment_status = Some("unpaid".into());
        session.customer_email = Some("guest@example.com".into());
        let details = BookingDetails::from(session);
        assert_eq!(details.amount, 80.0);
        assert_eq!(details.event_title, "Jazz night");
        assert_eq!(details.event_location, DEFAULT_EVENT_LOCATION);
        assert_eq!(details.customer_name, "");
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["sessionId"], "cs_123");
        assert_eq!(json["customerEmail"], "guest@example.com");
        assert_eq!(json["status"], "unpaid");
    }

    #[test]
    fn missing_amount_and_currency() {
        let details = BookingDetails::from(CheckoutSummary::new("cs_1", BookingMetadata::default()));
        assert_eq!(details.amount, 0.0);
        assert_eq!(details.currency, "eur");
        assert_eq!(details.status, None);
    }
}
