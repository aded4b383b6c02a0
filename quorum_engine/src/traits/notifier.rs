use std::future::Future;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    #[error("No messaging channel has been configured")]
    NotConfigured,
    #[error("Could not reach the messaging service. {0}")]
    Network(String),
    #[error("The messaging service rejected the message. Error {status}. {message}")]
    Rejected { status: u16, message: String },
}

/// A channel that can deliver a text message to a payer.
///
/// Notifiers are called from event handlers running on their own tasks, so the returned future must be `Send`.
pub trait Notifier: Clone + Send + Sync + 'static {
    fn send_message(&self, recipient_id: &str, text: &str)
        -> impl Future<Output = Result<(), NotifierError>> + Send;
}
