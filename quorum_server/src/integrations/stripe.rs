//! Plugs the Stripe REST client into the engine as a [`PaymentGateway`], and converts Stripe webhook events into the
//! engine's [`GatewayEvent`]s.
use log::*;
use quorum_engine::{
    db_types::Cents,
    gateway_types::{BookingMetadata, CheckoutSummary, GatewayEvent, IntentSummary},
    CancelResult,
    CaptureResult,
    GatewayError,
    PaymentGateway,
};
use stripe_tools::{
    CancelOutcome,
    CaptureOutcome,
    CheckoutSession,
    PaymentIntent,
    StripeApi,
    StripeApiError,
    StripeConfig,
    StripeEvent,
};

#[derive(Clone)]
pub struct StripeGateway {
    api: StripeApi,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let api = StripeApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentGateway for StripeGateway {
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSummary, GatewayError> {
        let session = self.api.retrieve_checkout_session(session_id).await.map_err(|e| to_gateway_error(session_id, e))?;
        Ok(checkout_summary(&session))
    }

    async fn capture_intent(&self, intent_id: &str) -> Result<CaptureResult, GatewayError> {
        let outcome = self.api.capture_payment_intent(intent_id).await.map_err(|e| to_gateway_error(intent_id, e))?;
        let amount = charged_amount(outcome.intent());
        let result = match outcome {
            CaptureOutcome::Captured(_) => CaptureResult::Captured { amount },
            CaptureOutcome::AlreadyCaptured(_) => CaptureResult::AlreadyCaptured { amount },
        };
        Ok(result)
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<CancelResult, GatewayError> {
        let outcome = self.api.cancel_payment_intent(intent_id).await.map_err(|e| to_gateway_error(intent_id, e))?;
        let result = match outcome {
            CancelOutcome::Canceled(_) => CancelResult::Canceled,
            CancelOutcome::AlreadyCanceled(_) => CancelResult::AlreadyCanceled,
        };
        Ok(result)
    }
}

fn to_gateway_error(object_id: &str, e: StripeApiError) -> GatewayError {
    if e.is_not_found() {
        return GatewayError::NotFound(object_id.to_string());
    }
    match e {
        StripeApiError::Timeout(s) => GatewayError::Timeout(s),
        StripeApiError::Network(s) | StripeApiError::Initialization(s) => GatewayError::Network(s),
        StripeApiError::QueryError { status, message, .. } => GatewayError::Rejected { status, message },
        StripeApiError::JsonError(s) => GatewayError::InvalidResponse(s),
    }
}

fn charged_amount(intent: &PaymentIntent) -> Cents {
    if intent.amount_received > 0 {
        Cents::from(intent.amount_received)
    } else {
        Cents::from(intent.amount)
    }
}

pub fn checkout_summary(session: &CheckoutSession) -> CheckoutSummary {
    let customer = session.customer_details.clone().unwrap_or_default();
    CheckoutSummary {
        session_id: session.id.clone(),
        payment_intent_id: session.payment_intent_id().map(String::from),
        amount_total: session.amount_total.map(Cents::from),
        currency: session.currency.clone(),
        payment_status: session.payment_status.clone(),
        customer_email: customer.email,
        customer_name: customer.name,
        metadata: BookingMetadata::from_map(&session.metadata),
    }
}

pub fn intent_summary(intent: &PaymentIntent) -> IntentSummary {
    let mut summary = IntentSummary::new(&intent.id, Cents::from(intent.amount), BookingMetadata::from_map(&intent.metadata))
        .with_capturable(Cents::from(intent.amount_capturable))
        .with_received(Cents::from(intent.amount_received));
    summary.currency = intent.currency.to_lowercase();
    summary
}

/// Converts a verified Stripe event into the engine's view of it. Event types the engine does not handle become
/// [`GatewayEvent::Unhandled`]. An error means the event's object could not be decoded.
pub fn gateway_event_from_stripe(event: &StripeEvent) -> Result<GatewayEvent, StripeApiError> {
    trace!("💳️ Converting Stripe event {} ({})", event.id, event.event_type);
    let session = || event.object::<CheckoutSession>().map(|s| checkout_summary(&s));
    let intent = || event.object::<PaymentIntent>().map(|i| intent_summary(&i));
    let result = match event.event_type.as_str() {
        "checkout.session.completed" => GatewayEvent::CheckoutCompleted(session()?),
        "checkout.session.expired" => GatewayEvent::CheckoutExpired(session()?),
        "payment_intent.requires_capture" => GatewayEvent::IntentRequiresCapture(intent()?),
        "payment_intent.amount_capturable_updated" => GatewayEvent::IntentAmountCapturableUpdated(intent()?),
        "payment_intent.succeeded" => GatewayEvent::IntentSucceeded(intent()?),
        "payment_intent.canceled" => GatewayEvent::IntentCanceled(intent()?),
        other => GatewayEvent::Unhandled(other.to_string()),
    };
    Ok(result)
}
