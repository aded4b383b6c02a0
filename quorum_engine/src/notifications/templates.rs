use crate::notifications::{NotificationKind, NotificationPayload};

/// Renders the Markdown chat message for a notification.
pub fn render_message(kind: NotificationKind, payload: &NotificationPayload) -> String {
    let amount = payload.amount.unwrap_or_default().format_with_currency(&payload.currency);
    match kind {
        NotificationKind::PaymentAuthorized => format!(
            "✅ *PAYMENT AUTHORISED!*\n\n🎭 Your place has been reserved\n💰 Amount on hold: {amount}\n\n⏳ *What \
             happens next:*\n• We are gathering participants\n• We will tell you as soon as the event is confirmed\n• \
             Your card is only charged once the event is confirmed\n\nThank you for booking with us! 🥂"
        ),
        NotificationKind::PaymentCaptured => format!(
            "🎉 *EVENT CONFIRMED - PAYMENT TAKEN!*\n\n✅ The event has reached its participant target\n💳 Amount \
             charged: {amount}\n🎭 Your place is confirmed!\n\nWe will send you all the details by email."
        ),
        NotificationKind::PaymentCancelled => "😔 *EVENT NOT CONFIRMED*\n\n❌ The event did not reach its participant \
                                               target\n💰 Your card has not been charged\n🔄 The hold on your card \
                                               has been released\n\nWe will let you know about the next event!"
            .to_string(),
        NotificationKind::PaymentExpired => "⏰ *PAYMENT SESSION EXPIRED*\n\nYour payment link has expired.\n\nYou can \
                                             book your place again with:\n/start → Next Event → Book"
            .to_string(),
    }
}

#[cfg(test)]
mod test {
    use quorum_common::Cents;

    use super::*;

    fn payload(amount: i64) -> NotificationPayload {
        NotificationPayload { event_id: Some("evt_1".into()), amount: Some(Cents::from(amount)), currency: "eur".into() }
    }

    #[test]
    fn authorized_message_shows_the_held_amount() {
        let msg = render_message(NotificationKind::PaymentAuthorized, &payload(8000));
        assert!(msg.starts_with("✅ *PAYMENT AUTHORISED!*"));
        assert!(msg.contains("Amount on hold: €80.00"));
    }

    #[test]
    fn captured_message_shows_the_charged_amount() {
        let msg = render_message(NotificationKind::PaymentCaptured, &payload(7550));
        assert!(msg.contains("Amount charged: €75.50"));
    }

    #[test]
    fn missing_amount_renders_as_zero() {
        let mut p = payload(0);
        p.amount = None;
        p.currency = "usd".into();
        let msg = render_message(NotificationKind::PaymentAuthorized, &p);
        assert!(msg.contains("Amount on hold: $0.00"));
    }

    #[test]
    fn cancelled_and_expired_messages() {
        let msg = render_message(NotificationKind::PaymentCancelled, &payload(8000));
        assert!(msg.contains("has not been charged"));
        let msg = render_message(NotificationKind::PaymentExpired, &payload(8000));
        assert!(msg.contains("/start → Next Event → Book"));
    }
}
