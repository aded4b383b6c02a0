//! Bearer token middleware for the operator routes.
//!
//! Requests must carry `Authorization: Bearer <QPS_ADMIN_TOKEN>`. A missing or wrong token is answered with `401`.
//! If no token has been configured, every request is answered with `403`, i.e. the operator API is switched off.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use quorum_common::Secret;
use subtle::ConstantTimeEq;

use crate::errors::ServerError;

pub struct AdminTokenMiddlewareFactory {
    token: Secret<String>,
}

impl AdminTokenMiddlewareFactory {
    pub fn new(token: Secret<String>) -> Self {
        AdminTokenMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<BoxBody>;
    type Transform = AdminTokenMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminTokenMiddlewareService { token: self.token.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminTokenMiddlewareService<S> {
    token: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<BoxBody>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let expected = self.token.reveal().clone();
        Box::pin(async move {
            if expected.is_empty() {
                warn!("🔐️ Operator API called on {}, but no admin token is configured", req.path());
                let err = ServerError::Forbidden("The operator API is disabled".into());
                return Ok(req.error_response(err));
            }
            let token = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim);
            let authorized = token.map(|t| bool::from(t.as_bytes().ct_eq(expected.as_bytes()))).unwrap_or(false);
            if authorized {
                trace!("🔐️ Admin token check ✅️");
                service.call(req).await.map(ServiceResponse::map_into_boxed_body)
            } else {
                warn!("🔐️ Missing or invalid admin token for {}. Denying access.", req.path());
                Ok(req.error_response(ServerError::Unauthorized))
            }
        })
    }
}
