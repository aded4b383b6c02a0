//! Delivers payer notifications as Telegram bot messages.
use std::sync::Arc;

use log::*;
use quorum_engine::{
    events::EventHandlers,
    notifications::{create_notification_hooks, NotificationDispatcher},
    Notifier,
    NotifierError,
};
use reqwest::Client;
use serde_json::json;

use crate::config::TelegramConfig;

#[derive(Clone)]
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: Arc<Client>,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self, NotifierError> {
        let client = Client::builder().timeout(config.timeout).build().map_err(|e| NotifierError::Network(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.config.api_url, self.config.bot_token.reveal())
    }
}

impl Notifier for TelegramNotifier {
    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), NotifierError> {
        if !self.config.is_enabled() {
            return Err(NotifierError::NotConfigured);
        }
        let body = json!({ "chat_id": recipient_id, "text": text, "parse_mode": "Markdown" });
        trace!("📨️ Sending Telegram message to {recipient_id}");
        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifierError::Network(e.without_url().to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(NotifierError::Rejected { status: status.as_u16(), message })
    }
}

/// Wires Telegram notifications into the engine's event hooks. Start the returned handlers after taking their
/// producers.
pub fn create_notification_handlers(notifier: TelegramNotifier, buffer_size: usize) -> EventHandlers {
    if !notifier.config.is_enabled() {
        info!("📨️ Telegram notifications are disabled");
    }
    let hooks = create_notification_hooks(NotificationDispatcher::new(notifier));
    EventHandlers::new(buffer_size, hooks)
}

#[cfg(test)]
mod test {
    use httpmock::{Method::POST, MockServer};

    use super::*;

    #[tokio::test]
    async fn sends_markdown_messages() {
        let _ = env_logger::try_init();
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendMessage")
                .json_body(json!({"chat_id": "u_1", "text": "*Ciao*", "parse_mode": "Markdown"}));
            then.status(200).json_body(json!({"ok": true}));
        });
        let notifier = TelegramNotifier::new(TelegramConfig::new(&server.base_url(), "123:abc")).unwrap();
        notifier.send_message("u_1", "*Ciao*").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn rejected_messages() {
        let _ = env_logger::try_init();
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage");
            then.status(400).body("chat not found");
        });
        let notifier = TelegramNotifier::new(TelegramConfig::new(&server.base_url(), "123:abc")).unwrap();
        let err = notifier.send_message("u_1", "hi").await.unwrap_err();
        assert!(matches!(err, NotifierError::Rejected { status: 400, ref message } if message == "chat not found"));
    }

    #[tokio::test]
    async fn disabled_without_a_token() {
        let notifier = TelegramNotifier::new(TelegramConfig::default()).unwrap();
        let err = notifier.send_message("u_1", "hi").await.unwrap_err();
        assert!(matches!(err, NotifierError::NotConfigured));
    }
}
