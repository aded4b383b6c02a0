use std::{str::FromStr, time::Duration};

use cucumber::{then, when};
use quorum_engine::{
    db_types::{AuthorizationStatus, Cents, EventId},
    gateway_types::{BookingMetadata, CheckoutSummary, GatewayEvent, IntentSummary},
    BookingStore,
    CapacityTracker,
    GatewayError,
};

use crate::cucumber::BookingWorld;

fn intent_for_session(session_id: &str) -> String {
    format!("pi_{}", session_id.trim_start_matches("cs_"))
}

#[when(expr = "checkout session {word} for event {word} is completed by payer '{word}' for {int} {word}")]
async fn checkout_completed(
    world: &mut BookingWorld,
    session_id: String,
    event_id: String,
    payer: String,
    amount: i64,
    currency: String,
) {
    let intent_id = intent_for_session(&session_id);
    let session = CheckoutSummary::new(session_id, BookingMetadata::for_event(event_id).with_payer(payer))
        .with_payment_intent(intent_id)
        .with_amount(Cents::from(amount), currency);
    world.system().gateway.add_session(session.clone()).await;
    world.api().handle_event(GatewayEvent::CheckoutCompleted(session)).await.expect("Error processing checkout");
}

#[when(expr = "checkout session {word} for event {word} expires")]
async fn checkout_expired(world: &mut BookingWorld, session_id: String, event_id: String) {
    let session = CheckoutSummary::new(session_id, BookingMetadata::for_event(event_id));
    world.api().handle_event(GatewayEvent::CheckoutExpired(session)).await.expect("Error processing expiry");
}

#[when(expr = "the gateway reports capturable funds on {word} for event {word}")]
async fn amount_capturable(world: &mut BookingWorld, intent_id: String, event_id: String) {
    let auth = world.system().db.fetch_by_intent_id(&intent_id).await.expect("Error fetching intent");
    let amount = auth.map(|a| a.amount).unwrap_or_else(|| Cents::from(1));
    let intent = IntentSummary::new(intent_id, amount, BookingMetadata::for_event(event_id)).with_capturable(amount);
    world
        .api()
        .handle_event(GatewayEvent::IntentAmountCapturableUpdated(intent))
        .await
        .expect("Error processing capturable update");
}

#[when(expr = "the gateway reports that {word} for event {word} succeeded with {int} {word}")]
async fn intent_succeeded(world: &mut BookingWorld, intent_id: String, event_id: String, amount: i64, currency: String) {
    let amount = Cents::from(amount);
    let mut intent = IntentSummary::new(intent_id, amount, BookingMetadata::for_event(event_id)).with_received(amount);
    intent.currency = currency;
    world.api().handle_event(GatewayEvent::IntentSucceeded(intent)).await.expect("Error processing intent success");
}

#[when(expr = "the gateway times out when capturing {word}")]
async fn capture_times_out(world: &mut BookingWorld, intent_id: String) {
    world.system().gateway.fail_intent(&intent_id, GatewayError::Timeout("no response".into())).await;
}

#[when(expr = "the gateway recovers for {word}")]
async fn gateway_recovers(world: &mut BookingWorld, intent_id: String) {
    world.system().gateway.clear_failure(&intent_id).await;
}

#[when(expr = "event {word} is reconciled")]
async fn reconcile(world: &mut BookingWorld, event_id: String) {
    world.api().reconcile_event(&EventId::from(event_id)).await.expect("Error reconciling event");
}

#[when(expr = "event {word} is released")]
async fn release(world: &mut BookingWorld, event_id: String) {
    world.api().release_event(&EventId::from(event_id)).await.expect("Error releasing event");
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut BookingWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "session {word} is {word}")]
async fn check_session_status(world: &mut BookingWorld, session_id: String, status: String) {
    let expected = AuthorizationStatus::from_str(&status).expect("Not a valid status");
    let auth = world.system().db.fetch_by_session_id(&session_id).await.expect("Error fetching session");
    let auth = auth.unwrap_or_else(|| panic!("Session {session_id} is not in the ledger"));
    assert_eq!(auth.status, expected, "Status of {session_id} is incorrect");
}

#[then(expr = "event {word} has {int} committed participant(s)")]
async fn check_committed(world: &mut BookingWorld, event_id: String, count: u64) {
    let committed = world.system().db.authorized_count(&EventId::from(event_id)).await.expect("Error counting");
    assert_eq!(committed, count, "Committed participant count is incorrect");
}

#[then(expr = "{int} payment(s) have been captured")]
async fn check_capture_calls(world: &mut BookingWorld, count: usize) {
    let calls = world.system().gateway.capture_calls().await;
    assert_eq!(calls.len(), count, "Capture calls: {calls:?}");
}

#[then(expr = "the gateway has been asked to capture {word} {int} time(s)")]
async fn check_capture_calls_for(world: &mut BookingWorld, intent_id: String, count: usize) {
    let calls = world.system().gateway.capture_calls().await;
    assert_eq!(calls.iter().filter(|c| **c == intent_id).count(), count, "Capture calls: {calls:?}");
}

#[then(expr = "payer '{word}' received {int} message(s)")]
async fn check_message_count(world: &mut BookingWorld, payer: String, count: usize) {
    let messages = world.system().messages_for(&payer, count).await;
    assert_eq!(messages.len(), count, "Messages for {payer}: {messages:?}");
}

#[then(expr = "payer '{word}' received a message containing {string}")]
async fn check_message_content(world: &mut BookingWorld, payer: String, text: String) {
    let messages = world.system().messages_for(&payer, 1).await;
    assert!(messages.iter().any(|m| m.contains(&text)), "No message for {payer} contains '{text}': {messages:?}");
}

#[then(expr = "payer '{word}' received {int} message(s) containing {string}")]
async fn check_matching_message_count(world: &mut BookingWorld, payer: String, count: usize, text: String) {
    let messages = world.system().messages_for(&payer, count).await;
    let matching = messages.iter().filter(|m| m.contains(&text)).count();
    assert_eq!(matching, count, "Messages for {payer} containing '{text}': {messages:?}");
}
