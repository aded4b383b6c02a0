use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use quorum_engine::{BookingStoreError, CapacityError, GatewayError, ReconciliationError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The payment gateway could not complete the request. {0}")]
    GatewayError(String),
    #[error("Missing or invalid access token")]
    Unauthorized,
    #[error("Forbidden. {0}")]
    Forbidden(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayError(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::StoreError(BookingStoreError::AuthorizationNotFound(s)) => Self::NoRecordFound(s),
            ReconciliationError::StoreError(e) => Self::BackendError(e.to_string()),
            ReconciliationError::CapacityError(CapacityError::InvalidQuota(s)) => Self::InvalidRequest(s),
            ReconciliationError::CapacityError(e) => Self::BackendError(e.to_string()),
            ReconciliationError::GatewayError(GatewayError::NotFound(s)) => {
                Self::NoRecordFound(format!("{s} does not exist"))
            },
            ReconciliationError::GatewayError(e) => Self::GatewayError(e.to_string()),
        }
    }
}
