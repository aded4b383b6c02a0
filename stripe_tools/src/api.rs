use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::{CheckoutSession, PaymentIntent, PaymentIntentStatus, StripeErrorBody},
    StripeApiError,
};

/// Stripe reports capture/cancel calls on an intent that has already left `requires_capture` with this code.
const UNEXPECTED_STATE: &str = "payment_intent_unexpected_state";

#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Captured(PaymentIntent),
    /// The intent had already been captured before this call. Not an error.
    AlreadyCaptured(PaymentIntent),
}

impl CaptureOutcome {
    pub fn intent(&self) -> &PaymentIntent {
        match self {
            Self::Captured(pi) | Self::AlreadyCaptured(pi) => pi,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CancelOutcome {
    Canceled(PaymentIntent),
    /// The intent had already been canceled before this call. Not an error.
    AlreadyCanceled(PaymentIntent),
}

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Sends a request to the Stripe API. Stripe takes form-encoded request bodies and always replies with JSON.
    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            trace!("💳️ REST query successful. {status}");
            return response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()));
        }
        let text = response.text().await?;
        let (code, message) = match serde_json::from_str::<StripeErrorBody>(&text) {
            Ok(body) => (body.error.code, body.error.message.unwrap_or(text)),
            Err(_) => (None, text),
        };
        Err(StripeApiError::QueryError { status: status.as_u16(), code, message })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url)
    }

    pub async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession, StripeApiError> {
        debug!("💳️ Fetching checkout session {session_id}");
        let path = format!("/checkout/sessions/{session_id}");
        self.rest_query(Method::GET, &path, &[]).await
    }

    pub async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, StripeApiError> {
        debug!("💳️ Fetching payment intent {intent_id}");
        let path = format!("/payment_intents/{intent_id}");
        self.rest_query(Method::GET, &path, &[]).await
    }

    /// Captures the full authorized amount of the intent.
    ///
    /// If Stripe rejects the call because the intent was already captured, the intent is re-fetched and
    /// [`CaptureOutcome::AlreadyCaptured`] is returned. Any other rejection is an error.
    pub async fn capture_payment_intent(&self, intent_id: &str) -> Result<CaptureOutcome, StripeApiError> {
        debug!("💳️ Capturing payment intent {intent_id}");
        let path = format!("/payment_intents/{intent_id}/capture");
        match self.rest_query::<PaymentIntent>(Method::POST, &path, &[]).await {
            Ok(intent) => {
                info!("💳️ Payment intent {intent_id} captured. Amount received: {}", intent.amount_received);
                Ok(CaptureOutcome::Captured(intent))
            },
            Err(e) if e.code() == Some(UNEXPECTED_STATE) => {
                let intent = self.retrieve_payment_intent(intent_id).await?;
                if intent.status == PaymentIntentStatus::Succeeded {
                    info!("💳️ Payment intent {intent_id} had already been captured");
                    Ok(CaptureOutcome::AlreadyCaptured(intent))
                } else {
                    warn!("💳️ Payment intent {intent_id} cannot be captured in state {:?}", intent.status);
                    Err(e)
                }
            },
            Err(e) => Err(e),
        }
    }

    /// Cancels the intent, releasing the hold on the payer's card.
    ///
    /// Cancelling an intent that is already canceled returns [`CancelOutcome::AlreadyCanceled`].
    pub async fn cancel_payment_intent(&self, intent_id: &str) -> Result<CancelOutcome, StripeApiError> {
        debug!("💳️ Cancelling payment intent {intent_id}");
        let path = format!("/payment_intents/{intent_id}/cancel");
        match self.rest_query::<PaymentIntent>(Method::POST, &path, &[]).await {
            Ok(intent) => {
                info!("💳️ Payment intent {intent_id} canceled");
                Ok(CancelOutcome::Canceled(intent))
            },
            Err(e) if e.code() == Some(UNEXPECTED_STATE) => {
                let intent = self.retrieve_payment_intent(intent_id).await?;
                if intent.status == PaymentIntentStatus::Canceled {
                    info!("💳️ Payment intent {intent_id} had already been canceled");
                    Ok(CancelOutcome::AlreadyCanceled(intent))
                } else {
                    warn!("💳️ Payment intent {intent_id} cannot be canceled in state {:?}", intent.status);
                    Err(e)
                }
            },
            Err(e) => Err(e),
        }
    }
}
