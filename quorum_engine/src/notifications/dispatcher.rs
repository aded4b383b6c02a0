use log::*;

use crate::{
    db_types::PaymentAuthorization,
    events::EventHooks,
    notifications::{render_message, NotificationKind, NotificationPayload},
    traits::{Notifier, NotifierError},
};

/// Renders notifications and sends them through a [`Notifier`]. Never fails: delivery problems are logged and
/// swallowed.
#[derive(Clone)]
pub struct NotificationDispatcher<N> {
    notifier: N,
}

impl<N: Notifier> NotificationDispatcher<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }

    pub async fn notify(&self, recipient_id: &str, kind: NotificationKind, payload: &NotificationPayload) {
        let text = render_message(kind, payload);
        match self.notifier.send_message(recipient_id, &text).await {
            Ok(()) => info!("📨️ Sent {kind} notification to {recipient_id}"),
            Err(NotifierError::NotConfigured) => {
                debug!("📨️ Notifications are not configured. {kind} notification for {recipient_id} dropped")
            },
            Err(e) => error!("📨️ Could not send {kind} notification to {recipient_id}. {e}"),
        }
    }

    /// Notifies the payer of `authorization`, if there is one on record.
    pub async fn notify_payer(
        &self,
        authorization: &PaymentAuthorization,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) {
        match authorization.payer_id.as_deref() {
            Some(recipient) => self.notify(recipient, kind, payload).await,
            None => warn!(
                "📨️ Authorization for session {} has no payer id. {kind} notification not sent.",
                authorization.session_id
            ),
        }
    }
}

/// Builds the event hooks that notify payers about every change to their authorization.
pub fn create_notification_hooks<N: Notifier>(dispatcher: NotificationDispatcher<N>) -> EventHooks {
    let mut hooks = EventHooks::default();
    let d = dispatcher.clone();
    hooks.on_payment_authorized(move |ev| {
        let d = d.clone();
        Box::pin(async move {
            let payload = NotificationPayload::for_authorization(&ev.authorization, None);
            d.notify_payer(&ev.authorization, NotificationKind::PaymentAuthorized, &payload).await;
        })
    });
    let d = dispatcher.clone();
    hooks.on_payment_captured(move |ev| {
        let d = d.clone();
        Box::pin(async move {
            let payload = NotificationPayload::for_authorization(&ev.authorization, Some(ev.amount));
            d.notify_payer(&ev.authorization, NotificationKind::PaymentCaptured, &payload).await;
        })
    });
    let d = dispatcher.clone();
    hooks.on_payment_cancelled(move |ev| {
        let d = d.clone();
        Box::pin(async move {
            let payload = NotificationPayload::for_authorization(&ev.authorization, None);
            d.notify_payer(&ev.authorization, NotificationKind::PaymentCancelled, &payload).await;
        })
    });
    let d = dispatcher;
    hooks.on_payment_expired(move |ev| {
        let d = d.clone();
        Box::pin(async move {
            let payload = NotificationPayload::for_authorization(&ev.authorization, None);
            d.notify_payer(&ev.authorization, NotificationKind::PaymentExpired, &payload).await;
        })
    });
    hooks
}
