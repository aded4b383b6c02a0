use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request to Stripe timed out: {0}")]
    Timeout(String),
    #[error("Could not reach Stripe: {0}")]
    Network(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, code: Option<String>, message: String },
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
}

impl StripeApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::QueryError { status: 404, .. })
    }

    /// The Stripe error code, e.g. `payment_intent_unexpected_state`, if Stripe supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::QueryError { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StripeApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::JsonError(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
