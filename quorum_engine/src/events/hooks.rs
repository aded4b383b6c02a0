use std::{future::Future, pin::Pin, sync::Arc};

use tokio::task::JoinHandle;

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    LedgerEvent,
    PaymentAuthorizedEvent,
    PaymentCancelledEvent,
    PaymentCapturedEvent,
    PaymentExpiredEvent,
};

type BoxedHook = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub ledger_event_producer: Vec<EventProducer<LedgerEvent>>,
}

impl EventProducers {
    pub async fn publish<E: Into<LedgerEvent>>(&self, event: E) {
        let event = event.into();
        for emitter in &self.ledger_event_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}

/// All ledger events go through one channel, queued per payer, so a payer always hears about their booking in the
/// order the changes were made.
pub struct EventHandlers {
    pub on_ledger_event: Option<EventHandler<LedgerEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_ledger_event = hooks.into_handler().map(|f| {
            EventHandler::new(buffer_size, f).with_ordering(Arc::new(|ev: &LedgerEvent| ev.recipient()))
        });
        Self { on_ledger_event }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_ledger_event {
            result.ledger_event_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns the handler, if any hooks were configured. Each handle resolves once all producers have been dropped and
    /// the queue has drained.
    pub fn start_handlers(self) -> Vec<JoinHandle<()>> {
        self.on_ledger_event.into_iter().map(|handler| tokio::spawn(handler.start_handler())).collect()
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_authorized: Option<Handler<PaymentAuthorizedEvent>>,
    pub on_payment_captured: Option<Handler<PaymentCapturedEvent>>,
    pub on_payment_cancelled: Option<Handler<PaymentCancelledEvent>>,
    pub on_payment_expired: Option<Handler<PaymentExpiredEvent>>,
}

impl EventHooks {
    pub fn on_payment_authorized<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentAuthorizedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_payment_authorized = Some(Arc::new(f));
        self
    }

    pub fn on_payment_captured<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentCapturedEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_payment_captured = Some(Arc::new(f));
        self
    }

    pub fn on_payment_cancelled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentCancelledEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_payment_cancelled = Some(Arc::new(f));
        self
    }

    pub fn on_payment_expired<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentExpiredEvent) -> BoxedHook) + Send + Sync + 'static {
        self.on_payment_expired = Some(Arc::new(f));
        self
    }

    fn is_empty(&self) -> bool {
        self.on_payment_authorized.is_none() &&
            self.on_payment_captured.is_none() &&
            self.on_payment_cancelled.is_none() &&
            self.on_payment_expired.is_none()
    }

    /// Combines the hooks into a single handler that routes each ledger event to the hook for its kind.
    fn into_handler(self) -> Option<Handler<LedgerEvent>> {
        if self.is_empty() {
            return None;
        }
        let handler: Handler<LedgerEvent> = Arc::new(move |ev: LedgerEvent| {
            let hook = match ev {
                LedgerEvent::PaymentAuthorized(e) => self.on_payment_authorized.as_ref().map(|f| f(e)),
                LedgerEvent::PaymentCaptured(e) => self.on_payment_captured.as_ref().map(|f| f(e)),
                LedgerEvent::PaymentCancelled(e) => self.on_payment_cancelled.as_ref().map(|f| f(e)),
                LedgerEvent::PaymentExpired(e) => self.on_payment_expired.as_ref().map(|f| f(e)),
            };
            Box::pin(async move {
                if let Some(hook) = hook {
                    hook.await;
                }
            }) as BoxedHook
        });
        Some(handler)
    }
}
