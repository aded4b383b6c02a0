//! Stripe tools for the Quorum Payment Server
//!
//! * [`webhook`] verifies the `Stripe-Signature` header on inbound webhook deliveries.
//! * [`StripeApi`] is a small REST client for the handful of calls the payment server makes: fetching checkout
//!   sessions, and capturing or cancelling manual-capture payment intents.
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod webhook;

pub use api::{CancelOutcome, CaptureOutcome, StripeApi};
pub use config::{StripeConfig, DEFAULT_STRIPE_API_URL, DEFAULT_STRIPE_TIMEOUT};
pub use data_objects::{CheckoutSession, CustomerDetails, PaymentIntent, PaymentIntentStatus, StripeEvent};
pub use error::StripeApiError;
pub use webhook::{verify_signature, SignatureError};
