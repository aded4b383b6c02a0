use std::{env, net::IpAddr, time::Duration};

use log::*;
use quorum_common::{
    helpers::{parse_boolean_flag, parse_seconds},
    Secret,
};
use quorum_engine::sqlite::db::db_url;
use stripe_tools::{
    webhook::{DEFAULT_SIGNATURE_HEADER, DEFAULT_SIGNATURE_TOLERANCE},
    StripeConfig,
};

const DEFAULT_QPS_HOST: &str = "127.0.0.1";
const DEFAULT_QPS_PORT: u16 = 8470;
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_TELEGRAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Bearer token for the operator routes. When empty, those routes refuse every request.
    pub admin_token: Secret<String>,
    pub webhook: WebhookConfig,
    pub stripe: StripeConfig,
    pub telegram: TelegramConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_QPS_HOST.to_string(),
            port: DEFAULT_QPS_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            admin_token: Secret::default(),
            webhook: WebhookConfig::default(),
            stripe: StripeConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("QPS_HOST").ok().unwrap_or_else(|| DEFAULT_QPS_HOST.into());
        let port = env::var("QPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for QPS_PORT. {e} Using the default, {DEFAULT_QPS_PORT}, instead."
                    );
                    DEFAULT_QPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_QPS_PORT);
        let database_url = db_url();
        let use_x_forwarded_for = parse_boolean_flag(env::var("QPS_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("QPS_USE_FORWARDED").ok(), false);
        let admin_token = env::var("QPS_ADMIN_TOKEN").ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
            warn!("🪛️ QPS_ADMIN_TOKEN is not set. The operator API (/api/events) is disabled.");
            String::default()
        });
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            admin_token: Secret::new(admin_token),
            webhook: WebhookConfig::from_env_or_defaults(),
            stripe: StripeConfig::new_from_env_or_default(),
            telegram: TelegramConfig::from_env_or_defaults(),
        }
    }
}

//-------------------------------------------------  WebhookConfig  ----------------------------------------------------
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// The endpoint signing secret from the Stripe dashboard, `whsec_...`
    pub signing_secret: Secret<String>,
    pub signature_header: String,
    /// Deliveries whose signature timestamp is further than this from the current time are rejected.
    pub tolerance: Duration,
    /// If supplied, requests against /webhook are checked against a whitelist of Stripe IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            signing_secret: Secret::default(),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            tolerance: DEFAULT_SIGNATURE_TOLERANCE,
            whitelist: None,
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let signing_secret = env::var("QPS_STRIPE_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ QPS_STRIPE_WEBHOOK_SECRET is not set. Please set it to the signing secret of your Stripe webhook \
                 endpoint. Every webhook delivery will be rejected until you do."
            );
            String::default()
        });
        let signature_header = env::var("QPS_STRIPE_SIGNATURE_HEADER").unwrap_or_else(|_| {
            debug!("🪛️ QPS_STRIPE_SIGNATURE_HEADER is not set. Using {DEFAULT_SIGNATURE_HEADER}");
            DEFAULT_SIGNATURE_HEADER.to_string()
        });
        let tolerance = match env::var("QPS_STRIPE_SIGNATURE_TOLERANCE") {
            Ok(s) => parse_seconds(&s).unwrap_or_else(|| {
                warn!(
                    "🪛️ Invalid configuration value for QPS_STRIPE_SIGNATURE_TOLERANCE ({s}). Using the default of {}s",
                    DEFAULT_SIGNATURE_TOLERANCE.as_secs()
                );
                DEFAULT_SIGNATURE_TOLERANCE
            }),
            Err(_) => DEFAULT_SIGNATURE_TOLERANCE,
        };
        let whitelist = env::var("QPS_STRIPE_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The Stripe IP whitelist was configured, but is empty. The server will run, but won't accept \
                     any webhook deliveries."
                );
            },
            None => {
                info!("🪛️ No Stripe IP whitelist is set. Only signature validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Stripe IP whitelist: {addrs}");
            },
        }
        Self { signing_secret: Secret::new(signing_secret), signature_header, tolerance, whitelist }
    }
}

fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Stripe IP whitelist is disabled. If this is not what you want, set QPS_STRIPE_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse()
                .map_err(|e| {
                    warn!("🪛️ Ignoring invalid IP address ({s}) in QPS_STRIPE_IP_WHITELIST: {e}");
                })
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  TelegramConfig  ---------------------------------------------------
#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub api_url: String,
    /// When empty, payer notifications are disabled.
    pub bot_token: Secret<String>,
    pub timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            bot_token: Secret::default(),
            timeout: DEFAULT_TELEGRAM_TIMEOUT,
        }
    }
}

impl TelegramConfig {
    pub fn new(api_url: &str, bot_token: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: Secret::new(bot_token.to_string()),
            ..Default::default()
        }
    }

    pub fn from_env_or_defaults() -> Self {
        let api_url = env::var("QPS_TELEGRAM_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_TELEGRAM_API_URL.to_string());
        let bot_token = env::var("QPS_TELEGRAM_BOT_TOKEN").ok().unwrap_or_else(|| {
            warn!("🪛️ QPS_TELEGRAM_BOT_TOKEN is not set. Payers will not be notified of booking updates.");
            String::default()
        });
        let timeout = match env::var("QPS_TELEGRAM_TIMEOUT") {
            Ok(s) => parse_seconds(&s).unwrap_or_else(|| {
                warn!(
                    "🪛️ Invalid configuration value for QPS_TELEGRAM_TIMEOUT ({s}). Using the default of {}s",
                    DEFAULT_TELEGRAM_TIMEOUT.as_secs()
                );
                DEFAULT_TELEGRAM_TIMEOUT
            }),
            Err(_) => DEFAULT_TELEGRAM_TIMEOUT,
        };
        Self { api_url, bot_token: Secret::new(bot_token), timeout }
    }

    pub fn is_enabled(&self) -> bool {
        !self.bot_token.reveal().is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn whitelist_parsing() {
        assert_eq!(parse_whitelist("none"), None);
        assert_eq!(parse_whitelist(" FALSE "), None);
        let list = parse_whitelist("3.18.12.63, 3.130.192.231,not-an-ip,").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].to_string(), "3.18.12.63");
        assert_eq!(parse_whitelist("nonsense"), Some(vec![]));
    }

    #[test]
    fn telegram_config() {
        let config = TelegramConfig::new("http://localhost:1234/", "123:abc");
        assert_eq!(config.api_url, "http://localhost:1234");
        assert!(config.is_enabled());
        assert!(!TelegramConfig::default().is_enabled());
    }
}
