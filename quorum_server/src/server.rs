use std::time::Duration;

use actix_web::{
    dev::{HttpServiceFactory, Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::future::{ready, Either};
use log::*;
use quorum_engine::{
    BookingStore,
    CapacityTracker,
    PaymentGateway,
    QuotaManagement,
    ReconciliationApi,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{
        stripe::StripeGateway,
        telegram::{create_notification_handlers, TelegramNotifier},
    },
    middleware::{AdminTokenMiddlewareFactory, StripeSignatureMiddlewareFactory},
    routes::{
        health,
        BookingDetailsRoute,
        EventAuthorizationsRoute,
        EventCapacityRoute,
        EventQuotaRoute,
        ReconcileEventRoute,
        ReleaseEventRoute,
        StripeWebhookRoute,
    },
};

const NOTIFICATION_BUFFER_SIZE: usize = 25;

pub type QuorumApi = ReconciliationApi<SqliteDatabase, SqliteDatabase, StripeGateway>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = StripeGateway::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let notifier =
        TelegramNotifier::new(config.telegram.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers(notifier, NOTIFICATION_BUFFER_SIZE);
    let producers = handlers.producers();
    let _handles = handlers.start_handlers();
    // One instance for every worker, so that the per-event locks are shared
    let api = web::Data::new(ReconciliationApi::new(db.clone(), db, gateway, producers));
    let srv = create_server_instance(config, api)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, api: web::Data<QuorumApi>) -> Result<Server, ServerError> {
    let bind_addr = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("qps::access_log"))
            .app_data(api.clone())
            .service(health)
            .service(webhook_scope::<SqliteDatabase, SqliteDatabase, StripeGateway>(&config))
            .service(admin_scope::<SqliteDatabase, SqliteDatabase, StripeGateway>(&config))
            .service(api_scope::<SqliteDatabase, SqliteDatabase, StripeGateway>())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((bind_addr.0.as_str(), bind_addr.1))?
    .run();
    Ok(srv)
}

/// `POST /webhook`. Deliveries must carry a valid Stripe signature, and come from a whitelisted address if a
/// whitelist is configured.
pub fn webhook_scope<B, C, G>(config: &ServerConfig) -> impl HttpServiceFactory
where
    B: BookingStore + 'static,
    C: CapacityTracker + 'static,
    G: PaymentGateway + 'static,
{
    let use_x_forwarded_for = config.use_x_forwarded_for;
    let use_forwarded = config.use_forwarded;
    let whitelist = config.webhook.whitelist.clone();
    let signatures = StripeSignatureMiddlewareFactory::new(
        &config.webhook.signature_header,
        config.webhook.signing_secret.clone(),
        config.webhook.tolerance,
    );
    web::scope("/webhook")
        .wrap(signatures)
        .wrap_fn(move |req, srv| {
            // Collect peer IP from x-forwarded-for, or forwarded headers _if_ `use_nnn` has been set to true
            // in the configuration. Otherwise, use the peer address from the connection info.
            let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
            let whitelisted = match (peer_ip, &whitelist) {
                (Some(ip), Some(whitelist)) => {
                    trace!("Stripe webhook from {ip}");
                    whitelist.contains(&ip)
                },
                (_, None) => true,
                (None, Some(_)) => {
                    warn!("No IP address found in Stripe webhook request, denying access.");
                    false
                },
            };
            if whitelisted {
                Either::Left(srv.call(req))
            } else {
                warn!("🚨️ Rejected a webhook delivery from {peer_ip:?}, which is not on the Stripe whitelist");
                let err = ServerError::Forbidden("Peer is not on the webhook whitelist".to_string());
                Either::Right(ready(Ok(req.error_response(err))))
            }
        })
        .service(StripeWebhookRoute::<B, C, G>::new())
}

/// Operator routes under `/api/events`. Register this before [`api_scope`], which would otherwise swallow the
/// prefix.
pub fn admin_scope<B, C, G>(config: &ServerConfig) -> impl HttpServiceFactory
where
    B: BookingStore + 'static,
    C: QuotaManagement + 'static,
    G: PaymentGateway + 'static,
{
    web::scope("/api/events")
        .wrap(AdminTokenMiddlewareFactory::new(config.admin_token.clone()))
        .service(EventCapacityRoute::<B, C, G>::new())
        .service(EventAuthorizationsRoute::<B, C, G>::new())
        .service(EventQuotaRoute::<B, C, G>::new())
        .service(ReconcileEventRoute::<B, C, G>::new())
        .service(ReleaseEventRoute::<B, C, G>::new())
}

/// Public routes under `/api`.
pub fn api_scope<B, C, G>() -> impl HttpServiceFactory
where
    B: BookingStore + 'static,
    C: CapacityTracker + 'static,
    G: PaymentGateway + 'static,
{
    web::scope("/api").service(BookingDetailsRoute::<B, C, G>::new())
}
