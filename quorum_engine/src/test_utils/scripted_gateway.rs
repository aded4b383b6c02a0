use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::*;
use quorum_common::Cents;
use tokio::sync::Mutex;

use crate::{
    gateway_types::CheckoutSummary,
    traits::{CancelResult, CaptureResult, GatewayError, PaymentGateway},
};

#[derive(Default)]
struct GatewayState {
    sessions: HashMap<String, CheckoutSummary>,
    amounts: HashMap<String, Cents>,
    captured: HashSet<String>,
    canceled: HashSet<String>,
    failures: HashMap<String, GatewayError>,
    capture_calls: Vec<String>,
    cancel_calls: Vec<String>,
}

/// An in-memory payment gateway that behaves like the real thing for the calls the engine makes: captures and
/// cancellations are idempotent, and a canceled intent cannot be captured.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl ScriptedGateway {
    /// Makes the session retrievable, and registers its payment intent's amount.
    pub async fn add_session(&self, session: CheckoutSummary) {
        let mut state = self.state.lock().await;
        if let (Some(intent), Some(amount)) = (&session.payment_intent_id, session.amount_total) {
            state.amounts.insert(intent.clone(), amount);
        }
        state.sessions.insert(session.session_id.clone(), session);
    }

    pub async fn set_intent_amount(&self, intent_id: &str, amount: Cents) {
        self.state.lock().await.amounts.insert(intent_id.to_string(), amount);
    }

    /// Every capture or cancel call for the intent fails with `error` until [`Self::clear_failure`] is called.
    pub async fn fail_intent(&self, intent_id: &str, error: GatewayError) {
        self.state.lock().await.failures.insert(intent_id.to_string(), error);
    }

    pub async fn clear_failure(&self, intent_id: &str) {
        self.state.lock().await.failures.remove(intent_id);
    }

    pub async fn capture_calls(&self) -> Vec<String> {
        self.state.lock().await.capture_calls.clone()
    }

    pub async fn cancel_calls(&self) -> Vec<String> {
        self.state.lock().await.cancel_calls.clone()
    }

    pub async fn is_captured(&self, intent_id: &str) -> bool {
        self.state.lock().await.captured.contains(intent_id)
    }

    pub async fn is_canceled(&self, intent_id: &str) -> bool {
        self.state.lock().await.canceled.contains(intent_id)
    }
}

impl PaymentGateway for ScriptedGateway {
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSummary, GatewayError> {
        let state = self.state.lock().await;
        state.sessions.get(session_id).cloned().ok_or_else(|| GatewayError::NotFound(session_id.to_string()))
    }

    async fn capture_intent(&self, intent_id: &str) -> Result<CaptureResult, GatewayError> {
        let mut state = self.state.lock().await;
        state.capture_calls.push(intent_id.to_string());
        if let Some(e) = state.failures.get(intent_id) {
            debug!("💳️ Scripted capture failure for {intent_id}");
            return Err(e.clone());
        }
        if state.canceled.contains(intent_id) {
            return Err(GatewayError::Rejected { status: 400, message: format!("{intent_id} has been canceled") });
        }
        let amount = state.amounts.get(intent_id).copied().unwrap_or_default();
        if state.captured.insert(intent_id.to_string()) {
            Ok(CaptureResult::Captured { amount })
        } else {
            Ok(CaptureResult::AlreadyCaptured { amount })
        }
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<CancelResult, GatewayError> {
        let mut state = self.state.lock().await;
        state.cancel_calls.push(intent_id.to_string());
        if let Some(e) = state.failures.get(intent_id) {
            return Err(e.clone());
        }
        if state.captured.contains(intent_id) {
            return Err(GatewayError::Rejected { status: 400, message: format!("{intent_id} has been captured") });
        }
        if state.canceled.insert(intent_id.to_string()) {
            Ok(CancelResult::Canceled)
        } else {
            Ok(CancelResult::AlreadyCanceled)
        }
    }
}
