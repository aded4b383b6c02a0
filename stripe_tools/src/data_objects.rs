//! Subsets of the Stripe API objects that the payment server reads.
//!
//! Only the fields we need are modelled. Everything else in the Stripe payloads is ignored during deserialization.
use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::StripeApiError;

/// The webhook envelope, `{ "id": "evt_...", "type": "...", "data": { "object": {...} } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

impl StripeEvent {
    /// Deserializes `data.object` into the Stripe object type implied by the event type.
    pub fn object<T: DeserializeOwned>(&self) -> Result<T, StripeApiError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| StripeApiError::JsonError(e.to_string()))
    }
}

/// A field that Stripe returns as an id by default, or as the full object when expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

impl Expandable<PaymentIntent> {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id.as_str(),
            Self::Object(intent) => intent.id.as_str(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub payment_intent: Option<Expandable<PaymentIntent>>,
    /// `paid`, `unpaid` or `no_payment_required`. A session with a manual-capture intent reports `unpaid` until
    /// capture.
    pub payment_status: Option<String>,
    /// `open`, `complete` or `expired`
    pub status: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent.as_ref().map(|p| p.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_capturable: i64,
    #[serde(default)]
    pub amount_received: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    pub capture_method: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Body of a non-2xx Stripe response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StripeErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}
