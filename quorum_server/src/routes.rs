//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Anything that waits on I/O (the database, Stripe, Telegram) must be
//! awaited, never blocked on.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use quorum_engine::{
    db_types::EventId,
    reconciliation_objects::EventOutcome,
    BookingStore,
    CapacityTracker,
    PaymentGateway,
    QuotaManagement,
    ReconciliationApi,
};
use stripe_tools::StripeEvent;

use crate::{
    data_objects::{AuthorizationQuery, BookingDetails, BookingDetailsQuery, JsonResponse, QuotaUpdate, WebhookAck},
    errors::ServerError,
    integrations::stripe::gateway_event_from_stripe,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(stripe_webhook => Post "" impl BookingStore, CapacityTracker, PaymentGateway);
/// Route handler for Stripe webhook deliveries.
///
/// The signature middleware has already authenticated the delivery and parsed the event by the time this handler
/// runs. Every authenticated delivery is acknowledged with `{"received": true}`, whatever happens to it afterwards, so
/// Stripe never redelivers it. Processing failures are logged. The next delivery for the same event re-runs the quorum
/// check, and an operator can force one with `POST /api/events/{event_id}/reconcile`.
pub async fn stripe_webhook<B, C, G>(
    event: web::ReqData<StripeEvent>,
    api: web::Data<ReconciliationApi<B, C, G>>,
) -> HttpResponse
where
    B: BookingStore,
    C: CapacityTracker,
    G: PaymentGateway,
{
    let event = event.into_inner();
    info!("💻️ Received Stripe webhook {} ({})", event.id, event.event_type);
    match gateway_event_from_stripe(&event) {
        Ok(gateway_event) => match api.handle_event(gateway_event).await {
            Ok(EventOutcome::NoOp(reason) | EventOutcome::Ignored(reason)) => {
                debug!("💻️ Stripe event {} required no action. {reason}", event.id)
            },
            Ok(outcome) => info!("💻️ Stripe event {} processed. {outcome:?}", event.id),
            Err(e) => error!("💻️ Could not process Stripe event {} ({}). {e}", event.id, event.event_type),
        },
        Err(e) => warn!("💻️ Could not decode the object in Stripe event {} ({}). {e}", event.id, event.event_type),
    }
    HttpResponse::Ok().json(WebhookAck::received())
}

//----------------------------------------------   Booking details  -------------------------------------------
route!(booking_details => Get "/booking-details" impl BookingStore, CapacityTracker, PaymentGateway);
/// Route handler for the post-checkout landing page.
///
/// Looks the checkout session up at the payment gateway and returns what the confirmation page displays. Event
/// details that are missing from the session metadata fall back to the defaults of the flagship event.
pub async fn booking_details<B, C, G>(
    query: web::Query<BookingDetailsQuery>,
    api: web::Data<ReconciliationApi<B, C, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingStore,
    C: CapacityTracker,
    G: PaymentGateway,
{
    let session_id = query
        .into_inner()
        .session_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("Session ID required".to_string()))?;
    debug!("💻️ GET booking details for {session_id}");
    let session = api.booking_details(&session_id).await.map_err(|e| {
        debug!("💻️ Could not fetch booking details for {session_id}. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(BookingDetails::from(session)))
}

//----------------------------------------------   Operator  ----------------------------------------------------
route!(event_capacity => Get "/{event_id}/capacity" impl BookingStore, QuotaManagement, PaymentGateway);
pub async fn event_capacity<B, C, G>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B, C, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingStore,
    C: QuotaManagement,
    G: PaymentGateway,
{
    let event_id = EventId::from(path.into_inner());
    debug!("💻️ GET capacity for event {event_id}");
    let snapshot = api.capacity_snapshot(&event_id).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

route!(event_authorizations => Get "/{event_id}/authorizations" impl BookingStore, QuotaManagement, PaymentGateway);
/// Lists the event's authorizations, optionally filtered with `?status=Authorized` (or `Captured`, `Canceled`, ...).
pub async fn event_authorizations<B, C, G>(
    path: web::Path<String>,
    query: web::Query<AuthorizationQuery>,
    api: web::Data<ReconciliationApi<B, C, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingStore,
    C: QuotaManagement,
    G: PaymentGateway,
{
    let event_id = EventId::from(path.into_inner());
    let status = query.into_inner().status;
    debug!("💻️ GET authorizations for event {event_id} (status filter: {status:?})");
    let authorizations = api.authorizations_for_event(&event_id, status).await?;
    Ok(HttpResponse::Ok().json(authorizations))
}

route!(event_quota => Put "/{event_id}/quota" impl BookingStore, QuotaManagement, PaymentGateway);
/// Sets the number of participants the event needs. Payments are not captured by this call. The next
/// `amount_capturable_updated` delivery, or an explicit `reconcile`, does that.
pub async fn event_quota<B, C, G>(
    path: web::Path<String>,
    body: web::Json<QuotaUpdate>,
    api: web::Data<ReconciliationApi<B, C, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingStore,
    C: QuotaManagement,
    G: PaymentGateway,
{
    let event_id = EventId::from(path.into_inner());
    let target = body.into_inner().target_count;
    debug!("💻️ PUT quota of {target} for event {event_id}");
    api.set_target_count(&event_id, target).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Event {event_id} now needs {target} participants"))))
}

route!(reconcile_event => Post "/{event_id}/reconcile" impl BookingStore, QuotaManagement, PaymentGateway);
/// Runs the quorum check for the event immediately, capturing every held payment if the target has been reached.
pub async fn reconcile_event<B, C, G>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B, C, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingStore,
    C: QuotaManagement,
    G: PaymentGateway,
{
    let event_id = EventId::from(path.into_inner());
    info!("💻️ Operator requested reconciliation of event {event_id}");
    let outcome = api.reconcile_event(&event_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(release_event => Post "/{event_id}/release" impl BookingStore, QuotaManagement, PaymentGateway);
/// Cancels every held payment for the event. Used when an event is called off without reaching its target.
pub async fn release_event<B, C, G>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B, C, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: BookingStore,
    C: QuotaManagement,
    G: PaymentGateway,
{
    let event_id = EventId::from(path.into_inner());
    warn!("💻️ Operator requested release of every held payment for event {event_id}");
    let outcome = api.release_event(&event_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
