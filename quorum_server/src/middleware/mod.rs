mod admin;
mod signature;

pub use admin::{AdminTokenMiddlewareFactory, AdminTokenMiddlewareService};
pub use signature::{StripeSignatureMiddlewareFactory, StripeSignatureMiddlewareService};
