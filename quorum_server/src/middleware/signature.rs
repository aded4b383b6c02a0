//! Stripe signature middleware for Actix Web.
//!
//! Stripe signs every webhook delivery with the endpoint's signing secret and sends the result in the
//! `Stripe-Signature` header (the header name is configurable). The signature covers a timestamp and the raw body of
//! the request, so the check has to happen before anything deserializes the body.
//!
//! On success, the parsed [`StripeEvent`] is stored in the request extensions (handlers can take it with
//! `web::ReqData<StripeEvent>`), and the body is restored so that downstream extractors still see it.
//! On failure the request is answered with `400 {"error":"Invalid signature"}` and never reaches the handler.

use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Duration,
};

use actix_http::h1;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use quorum_common::Secret;
use stripe_tools::verify_signature;

use crate::errors::ServerError;

pub struct StripeSignatureMiddlewareFactory {
    signature_header: String,
    secret: Secret<String>,
    tolerance: Duration,
}

impl StripeSignatureMiddlewareFactory {
    pub fn new(signature_header: &str, secret: Secret<String>, tolerance: Duration) -> Self {
        StripeSignatureMiddlewareFactory { signature_header: signature_header.into(), secret, tolerance }
    }
}

impl<S, B> Transform<S, ServiceRequest> for StripeSignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<BoxBody>;
    type Transform = StripeSignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StripeSignatureMiddlewareService {
            signature_header: self.signature_header.clone(),
            secret: self.secret.clone(),
            tolerance: self.tolerance,
            service: Rc::new(service),
        }))
    }
}

pub struct StripeSignatureMiddlewareService<S> {
    signature_header: String,
    secret: Secret<String>,
    tolerance: Duration,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for StripeSignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<BoxBody>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        let signature_header = self.signature_header.clone();
        let tolerance = self.tolerance;
        Box::pin(async move {
            trace!("🔐️ Checking Stripe signature for request");
            let data = match req.extract::<web::Bytes>().await {
                Ok(data) => data,
                Err(e) => {
                    warn!("🔐️ Failed to extract request data: {e:?}");
                    let err = ServerError::InvalidRequestBody(e.to_string());
                    return Ok(req.error_response(err));
                },
            };
            let header = req.headers().get(&signature_header).and_then(|v| v.to_str().ok()).map(String::from);
            let Some(header) = header else {
                warn!("🔐️ No {signature_header} header found in request. Denying access.");
                return Ok(req.error_response(ServerError::InvalidSignature));
            };
            match verify_signature(data.as_ref(), &header, &secret, tolerance) {
                Ok(event) => {
                    trace!("🔐️ Signature check for event {} ✅️", event.id);
                    req.extensions_mut().insert(event);
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await.map(ServiceResponse::map_into_boxed_body)
                },
                Err(e) => {
                    warn!("🔐️ Invalid Stripe signature found in request. Denying access. {e}");
                    Ok(req.error_response(ServerError::InvalidSignature))
                },
            }
        })
    }
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
