use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::Mutex;

use crate::traits::{Notifier, NotifierError};

/// A [`Notifier`] that keeps every delivered message in memory, or refuses every message if built with
/// [`RecordingNotifier::failing`].
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(String, String)>>>,
    attempts: Arc<AtomicUsize>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    /// `(recipient_id, text)` for every delivered message, in delivery order.
    pub async fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().await.clone()
    }

    pub async fn messages_for(&self, recipient_id: &str) -> Vec<String> {
        self.messages.lock().await.iter().filter(|(r, _)| r == recipient_id).map(|(_, t)| t.clone()).collect()
    }

    pub async fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Notifier for RecordingNotifier {
    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), NotifierError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifierError::Network("connection refused".to_string()));
        }
        self.messages.lock().await.push((recipient_id.to_string(), text.to_string()));
        Ok(())
    }
}
