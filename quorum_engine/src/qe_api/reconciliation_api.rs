use std::{collections::HashSet, fmt::Debug};

use log::*;
use quorum_common::Cents;

use crate::{
    db_types::{AuthorizationStatus, EventCapacitySnapshot, EventId, PaymentAuthorization},
    events::{EventProducers, PaymentAuthorizedEvent, PaymentCancelledEvent, PaymentCapturedEvent, PaymentExpiredEvent},
    gateway_types::{CheckoutSummary, GatewayEvent, IntentSummary},
    qe_api::{
        errors::ReconciliationError,
        event_locks::EventLocks,
        reconciliation_objects::{
            EventOutcome,
            IntentFailure,
            ReconciliationDecision,
            ReconciliationOutcome,
            ReleaseOutcome,
        },
    },
    traits::{AuthorizeResult, BookingStore, CapacityTracker, PaymentGateway, QuotaManagement},
};

/// `ReconciliationApi` is the primary API for keeping the authorization ledger in step with the payment gateway.
///
/// Every webhook delivery is handed to [`Self::handle_event`]. Deliveries may be duplicated, reordered or concurrent:
/// all status changes are compare-and-set updates in the [`BookingStore`], and quorum checks are serialised per event
/// by [`EventLocks`], so the ledger converges to the same state whatever order the deliveries arrive in. Payer
/// notifications are published only by the call that actually changed a record, so each payer hears about each change
/// exactly once.
///
/// Construct one instance per process and share it. The per-event locks live inside the instance.
pub struct ReconciliationApi<B, C, G> {
    store: B,
    capacity: C,
    gateway: G,
    producers: EventProducers,
    locks: EventLocks,
}

impl<B, C, G> Debug for ReconciliationApi<B, C, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B, C, G> ReconciliationApi<B, C, G> {
    pub fn new(store: B, capacity: C, gateway: G, producers: EventProducers) -> Self {
        Self { store, capacity, gateway, producers, locks: EventLocks::default() }
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut B {
        &mut self.store
    }

    pub fn capacity(&self) -> &C {
        &self.capacity
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, C, G> ReconciliationApi<B, C, G>
where
    B: BookingStore,
    C: CapacityTracker,
    G: PaymentGateway,
{
    /// Applies a single webhook event to the ledger.
    ///
    /// Errors are only returned when the event could not be processed at all (e.g. the database is down). The
    /// gateway will not redeliver the event, so the caller should log them loudly. The ledger catches up on the next
    /// delivery for the same event, or when an operator reconciles it. Partial failures during a reconciliation (a
    /// single capture that fails) are reported inside the [`EventOutcome`] instead.
    pub async fn handle_event(&self, event: GatewayEvent) -> Result<EventOutcome, ReconciliationError> {
        debug!("🔄️ Handling gateway event {event}");
        match event {
            GatewayEvent::CheckoutCompleted(session) => self.on_checkout_completed(session).await,
            GatewayEvent::CheckoutExpired(session) => self.on_checkout_expired(session).await,
            GatewayEvent::IntentRequiresCapture(intent) => self.on_intent_requires_capture(intent).await,
            GatewayEvent::IntentAmountCapturableUpdated(intent) => self.on_amount_capturable_updated(intent).await,
            GatewayEvent::IntentSucceeded(intent) => self.on_intent_succeeded(intent).await,
            GatewayEvent::IntentCanceled(intent) => self.on_intent_canceled(intent).await,
            GatewayEvent::Unhandled(event_type) => {
                info!("🔄️ Ignoring unhandled event type {event_type}");
                Ok(EventOutcome::Ignored(event_type))
            },
        }
    }

    async fn on_checkout_completed(&self, session: CheckoutSummary) -> Result<EventOutcome, ReconciliationError> {
        let Some(authorization) = session.to_new_authorization() else {
            warn!("🔄️ Checkout session {} has no event_id in its metadata. Nothing to record.", session.session_id);
            return Ok(EventOutcome::NoOp(format!("Session {} has no event_id", session.session_id)));
        };
        if authorization.payment_intent_id.is_none() {
            warn!("🔄️ Checkout session {} completed without a payment intent", session.session_id);
        }
        match self.store.authorize_checkout(authorization).await? {
            AuthorizeResult::Inserted(auth) | AuthorizeResult::Promoted(auth) => {
                info!(
                    "🔄️ Payment authorized for event {}. Session {}, payer {}, {}",
                    auth.event_id,
                    auth.session_id,
                    auth.payer_id.as_deref().unwrap_or("unknown"),
                    auth.amount.format_with_currency(&auth.currency)
                );
                self.call_payment_authorized_hook(&auth).await;
                // the capturable-funds notice for this intent may have arrived first and found the quorum one short
                let reconciliation = if auth.payment_intent_id.is_some() {
                    Some(self.reconcile_event(&auth.event_id).await?)
                } else {
                    None
                };
                Ok(EventOutcome::Authorized { authorization: auth, reconciliation })
            },
            AuthorizeResult::AlreadyProcessed(auth) => {
                debug!("🔄️ Checkout session {} has already been processed ({})", auth.session_id, auth.status);
                Ok(EventOutcome::NoOp(format!("Session {} is already {}", auth.session_id, auth.status)))
            },
        }
    }

    async fn on_checkout_expired(&self, session: CheckoutSummary) -> Result<EventOutcome, ReconciliationError> {
        let Some(authorization) = session.to_new_authorization() else {
            warn!("🔄️ Expired checkout session {} has no event_id in its metadata", session.session_id);
            return Ok(EventOutcome::NoOp(format!("Session {} has no event_id", session.session_id)));
        };
        match self.store.expire_checkout(authorization).await? {
            Some(auth) => {
                info!("🔄️ Checkout session {} for event {} has expired", auth.session_id, auth.event_id);
                self.call_payment_expired_hook(&auth).await;
                Ok(EventOutcome::Expired(auth))
            },
            None => {
                debug!("🔄️ Checkout session {} was already closed. Expiry ignored.", session.session_id);
                Ok(EventOutcome::NoOp(format!("Session {} was already closed", session.session_id)))
            },
        }
    }

    async fn on_intent_requires_capture(&self, intent: IntentSummary) -> Result<EventOutcome, ReconciliationError> {
        let Some(event_id) = intent.metadata.event_id.as_ref() else {
            return Ok(no_event_id(&intent));
        };
        info!(
            "🔄️ Participant authorized for event {event_id} (intent {}, payer {})",
            intent.intent_id,
            intent.metadata.payer_id.as_deref().unwrap_or("unknown")
        );
        let snapshot = self.capacity.capacity_snapshot(event_id).await?;
        info!("🔄️ Capacity for {snapshot}. Quorum reached: {}", snapshot.quorum_reached());
        Ok(EventOutcome::CapacityChecked(snapshot))
    }

    async fn on_amount_capturable_updated(&self, intent: IntentSummary) -> Result<EventOutcome, ReconciliationError> {
        let Some(event_id) = intent.metadata.event_id.as_ref() else {
            return Ok(no_event_id(&intent));
        };
        if !intent.amount_capturable.is_positive() {
            debug!("🔄️ Intent {} has nothing to capture", intent.intent_id);
            return Ok(EventOutcome::NoOp(format!("Intent {} has no capturable amount", intent.intent_id)));
        }
        let outcome = self.reconcile_event(event_id).await?;
        Ok(EventOutcome::Reconciled(outcome))
    }

    async fn on_intent_succeeded(&self, intent: IntentSummary) -> Result<EventOutcome, ReconciliationError> {
        use AuthorizationStatus::{Authorized, Captured};
        if intent.metadata.event_id.is_none() {
            return Ok(no_event_id(&intent));
        }
        let amount = intent.charged_amount();
        let updated = self.store.update_status_for_intent(&intent.intent_id, &[Authorized], Captured).await?;
        match updated {
            Some(auth) => {
                if auth.amount != amount {
                    error!(
                        "🔄️ Intent {} was authorized for {} but {} was received",
                        intent.intent_id,
                        auth.amount.format_with_currency(&auth.currency),
                        amount.format_with_currency(&intent.currency)
                    );
                }
                info!("🔄️ Payment {} for event {} has been captured", intent.intent_id, auth.event_id);
                self.call_payment_captured_hook(&auth, amount).await;
                Ok(EventOutcome::Captured(auth))
            },
            None => self.unchanged(&intent.intent_id, Captured).await,
        }
    }

    async fn on_intent_canceled(&self, intent: IntentSummary) -> Result<EventOutcome, ReconciliationError> {
        use AuthorizationStatus::{Authorized, Canceled};
        if intent.metadata.event_id.is_none() {
            return Ok(no_event_id(&intent));
        }
        let updated = self.store.update_status_for_intent(&intent.intent_id, &[Authorized], Canceled).await?;
        match updated {
            Some(auth) => {
                info!("🔄️ Payment {} for event {} has been canceled", intent.intent_id, auth.event_id);
                self.call_payment_cancelled_hook(&auth).await;
                Ok(EventOutcome::Canceled(auth))
            },
            None => self.unchanged(&intent.intent_id, Canceled).await,
        }
    }

    /// Describes why a status update for the intent matched nothing.
    async fn unchanged(&self, intent_id: &str, target: AuthorizationStatus) -> Result<EventOutcome, ReconciliationError> {
        let reason = match self.store.fetch_by_intent_id(intent_id).await? {
            Some(auth) if auth.status == target => format!("Intent {intent_id} is already {target}"),
            Some(auth) => format!("Intent {intent_id} is {} and cannot become {target}", auth.status),
            None => format!("Intent {intent_id} is not in the ledger"),
        };
        debug!("🔄️ {reason}");
        Ok(EventOutcome::NoOp(reason))
    }

    /// Checks the event's quorum and, if it has been reached, captures every `Authorized` payment for the event.
    ///
    /// Runs under the event's lock. Captures are attempted one at a time. A capture that fails is logged and reported
    /// in the outcome, and its authorization stays `Authorized` so that the next reconciliation retries it. Each
    /// successful capture is recorded with a compare-and-set, so if a `payment_intent.succeeded` delivery recorded it
    /// first, no second notification is sent.
    ///
    /// A payer is charged at most once per event. Any further hold of theirs on the event is canceled at the gateway
    /// instead of being captured.
    pub async fn reconcile_event(&self, event_id: &EventId) -> Result<ReconciliationOutcome, ReconciliationError> {
        let _guard = self.locks.lock_event(event_id).await;
        let snapshot = self.capacity.capacity_snapshot(event_id).await?;
        if snapshot.target_count.is_none() {
            warn!("🔄️ No participant target has been set for event {event_id}. Payments will not be captured.");
            return Ok(ReconciliationOutcome::new(snapshot, ReconciliationDecision::NoTarget));
        }
        if !snapshot.quorum_reached() {
            info!("🔄️ Quorum not reached yet for {snapshot}");
            return Ok(ReconciliationOutcome::new(snapshot, ReconciliationDecision::AwaitingQuorum));
        }
        info!("🔄️ Quorum reached for {snapshot}. Capturing all authorized payments.");
        let pending = self.store.fetch_authorizations_for_event(event_id, Some(AuthorizationStatus::Authorized)).await?;
        let mut paid = self
            .store
            .fetch_authorizations_for_event(event_id, Some(AuthorizationStatus::Captured))
            .await?
            .into_iter()
            .filter_map(|a| a.payer_id)
            .collect::<HashSet<_>>();
        let mut outcome = ReconciliationOutcome::new(snapshot, ReconciliationDecision::Capture);
        for auth in pending {
            if let Some(payer) = auth.payer_id.as_ref().filter(|p| paid.contains(*p)) {
                warn!(
                    "🔄️ Payer {payer} has already paid for event {event_id}. Releasing their extra hold on session {}.",
                    auth.session_id
                );
                match self.cancel_authorization(&auth).await {
                    Ok(Some(released)) => outcome.released.push(released),
                    Ok(None) => {},
                    Err(reason) => outcome.failed.push(IntentFailure::new(&auth, reason)),
                }
                continue;
            }
            match self.capture_authorization(&auth).await {
                Ok(captured) => {
                    // `None` means another delivery recorded this capture, so the payer has paid either way
                    if let Some(payer) = auth.payer_id.clone() {
                        paid.insert(payer);
                    }
                    outcome.captured.extend(captured);
                },
                Err(reason) => outcome.failed.push(IntentFailure::new(&auth, reason)),
            }
        }
        info!(
            "🔄️ Reconciliation of event {event_id} complete. {} captured, {} released, {} failed",
            outcome.captured.len(),
            outcome.released.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    /// Captures one authorization at the gateway and records the result. `Ok(None)` means another delivery recorded the
    /// capture first.
    async fn capture_authorization(&self, auth: &PaymentAuthorization) -> Result<Option<PaymentAuthorization>, String> {
        let Some(intent_id) = auth.payment_intent_id.as_deref() else {
            warn!("🔄️ Authorization for session {} has no payment intent. Cannot capture.", auth.session_id);
            return Err("No payment intent on record".to_string());
        };
        let result = self.gateway.capture_intent(intent_id).await.map_err(|e| {
            error!("🔄️ Could not capture payment {intent_id} for event {}. {e}", auth.event_id);
            e.to_string()
        })?;
        let amount = result.amount();
        if amount != auth.amount {
            error!(
                "🔄️ Payment {intent_id} was authorized for {} but {} was captured",
                auth.amount.format_with_currency(&auth.currency),
                amount.format_with_currency(&auth.currency)
            );
        }
        let updated = self
            .store
            .update_status_for_intent(intent_id, &[AuthorizationStatus::Authorized], AuthorizationStatus::Captured)
            .await
            .map_err(|e| {
                error!("🔄️ Payment {intent_id} was captured, but could not be recorded. {e}");
                e.to_string()
            })?;
        match updated {
            Some(captured) => {
                info!("🔄️ Payment {intent_id} captured for event {}", captured.event_id);
                self.call_payment_captured_hook(&captured, amount).await;
                Ok(Some(captured))
            },
            None => {
                debug!("🔄️ Capture of {intent_id} had already been recorded");
                Ok(None)
            },
        }
    }

    /// Cancels every `Authorized` payment for the event, releasing the holds on the payers' cards. Used when an event
    /// is called off without reaching its quorum.
    pub async fn release_event(&self, event_id: &EventId) -> Result<ReleaseOutcome, ReconciliationError> {
        let _guard = self.locks.lock_event(event_id).await;
        let pending = self.store.fetch_authorizations_for_event(event_id, Some(AuthorizationStatus::Authorized)).await?;
        info!("🔄️ Releasing {} authorized payments for event {event_id}", pending.len());
        let mut outcome = ReleaseOutcome::default();
        for auth in pending {
            match self.cancel_authorization(&auth).await {
                Ok(Some(canceled)) => outcome.canceled.push(canceled),
                Ok(None) => {},
                Err(reason) => outcome.failed.push(IntentFailure::new(&auth, reason)),
            }
        }
        Ok(outcome)
    }

    async fn cancel_authorization(&self, auth: &PaymentAuthorization) -> Result<Option<PaymentAuthorization>, String> {
        let Some(intent_id) = auth.payment_intent_id.as_deref() else {
            warn!("🔄️ Authorization for session {} has no payment intent. Cannot cancel.", auth.session_id);
            return Err("No payment intent on record".to_string());
        };
        self.gateway.cancel_intent(intent_id).await.map_err(|e| {
            error!("🔄️ Could not cancel payment {intent_id} for event {}. {e}", auth.event_id);
            e.to_string()
        })?;
        let updated = self
            .store
            .update_status_for_intent(intent_id, &[AuthorizationStatus::Authorized], AuthorizationStatus::Canceled)
            .await
            .map_err(|e| e.to_string())?;
        if let Some(canceled) = &updated {
            self.call_payment_cancelled_hook(canceled).await;
        }
        Ok(updated)
    }

    pub async fn capacity_snapshot(&self, event_id: &EventId) -> Result<EventCapacitySnapshot, ReconciliationError> {
        Ok(self.capacity.capacity_snapshot(event_id).await?)
    }

    pub async fn authorizations_for_event(
        &self,
        event_id: &EventId,
        status: Option<AuthorizationStatus>,
    ) -> Result<Vec<PaymentAuthorization>, ReconciliationError> {
        Ok(self.store.fetch_authorizations_for_event(event_id, status).await?)
    }

    /// Fetches the checkout session from the gateway, for the post-checkout landing page.
    pub async fn booking_details(&self, session_id: &str) -> Result<CheckoutSummary, ReconciliationError> {
        Ok(self.gateway.retrieve_checkout_session(session_id).await?)
    }

    async fn call_payment_authorized_hook(&self, auth: &PaymentAuthorization) {
        debug!("🔄️ Notifying payment authorized hook subscribers");
        self.producers.publish(PaymentAuthorizedEvent::new(auth.clone())).await;
    }

    async fn call_payment_captured_hook(&self, auth: &PaymentAuthorization, amount: Cents) {
        debug!("🔄️ Notifying payment captured hook subscribers");
        self.producers.publish(PaymentCapturedEvent::new(auth.clone(), amount)).await;
    }

    async fn call_payment_cancelled_hook(&self, auth: &PaymentAuthorization) {
        debug!("🔄️ Notifying payment cancelled hook subscribers");
        self.producers.publish(PaymentCancelledEvent::new(auth.clone())).await;
    }

    async fn call_payment_expired_hook(&self, auth: &PaymentAuthorization) {
        debug!("🔄️ Notifying payment expired hook subscribers");
        self.producers.publish(PaymentExpiredEvent::new(auth.clone())).await;
    }
}

impl<B, C, G> ReconciliationApi<B, C, G>
where C: QuotaManagement
{
    pub async fn set_target_count(&self, event_id: &EventId, target: u64) -> Result<(), ReconciliationError> {
        self.capacity.set_target_count(event_id, target).await?;
        info!("🔄️ Participant target for event {event_id} is now {target}");
        Ok(())
    }
}

fn no_event_id(intent: &IntentSummary) -> EventOutcome {
    warn!("🔄️ Payment intent {} has no event_id in its metadata. Ignoring.", intent.intent_id);
    EventOutcome::NoOp(format!("Intent {} has no event_id", intent.intent_id))
}
