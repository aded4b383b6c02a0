use std::time::Duration;

use log::*;
use quorum_common::{helpers::parse_seconds, Secret};

pub const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";
pub const DEFAULT_STRIPE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Base URL of the Stripe REST API. Only overridden in tests.
    pub api_url: String,
    /// The restricted or secret API key, `sk_...` / `rk_...`
    pub secret_key: Secret<String>,
    /// Upper bound on any single request to Stripe.
    pub timeout: Duration,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_STRIPE_API_URL.to_string(),
            secret_key: Secret::default(),
            timeout: DEFAULT_STRIPE_TIMEOUT,
        }
    }
}

impl StripeConfig {
    pub fn new(api_url: &str, secret_key: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: Secret::new(secret_key.into()),
            ..Default::default()
        }
    }

    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("QPS_STRIPE_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_STRIPE_API_URL.to_string());
        let secret_key = Secret::new(std::env::var("QPS_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("💳️ QPS_STRIPE_SECRET_KEY not set. Calls to the Stripe API will be rejected.");
            String::default()
        }));
        let timeout = match std::env::var("QPS_STRIPE_TIMEOUT") {
            Ok(s) => parse_seconds(&s).unwrap_or_else(|| {
                warn!(
                    "💳️ Invalid value for QPS_STRIPE_TIMEOUT ({s}). Using the default of {}s",
                    DEFAULT_STRIPE_TIMEOUT.as_secs()
                );
                DEFAULT_STRIPE_TIMEOUT
            }),
            Err(_) => DEFAULT_STRIPE_TIMEOUT,
        };
        Self { api_url, secret_key, timeout }
    }
}
