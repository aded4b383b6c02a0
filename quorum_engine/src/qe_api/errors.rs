use thiserror::Error;

use crate::traits::{BookingStoreError, CapacityError, GatewayError};

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Booking store error. {0}")]
    StoreError(#[from] BookingStoreError),
    #[error("Capacity tracking error. {0}")]
    CapacityError(#[from] CapacityError),
    #[error("Payment gateway error. {0}")]
    GatewayError(#[from] GatewayError),
}
