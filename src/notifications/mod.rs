// Order confirmation notifications
//
// Fire-and-forget: checkout spawns the send after its transaction commits and
// a failure is only logged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::config::NotificationConfig;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Payload describing a freshly placed order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: Uuid,
    pub recipient: String,
    pub final_amount: Decimal,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
}

#[axum::async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Short name of the delivery channel, for logs
    fn channel(&self) -> &'static str;

    async fn order_confirmed(&self, confirmation: &OrderConfirmation) -> Result<(), NotificationError>;
}

/// Posts confirmations as JSON to an external mailer webhook
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    from: String,
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    order: &'a OrderConfirmation,
}

impl WebhookNotifier {
    pub fn new(url: String, from: String) -> Self {
        Self {
            client: Client::new(),
            url,
            from,
        }
    }
}

#[axum::async_trait]
impl OrderNotifier for WebhookNotifier {
    fn channel(&self) -> &'static str {
        "webhook"
    }

    async fn order_confirmed(&self, confirmation: &OrderConfirmation) -> Result<(), NotificationError> {
        let body = WebhookBody {
            from: &self.from,
            to: &confirmation.recipient,
            subject: format!("Order confirmation #{}", confirmation.order_id),
            order: confirmation,
        };

        let response = self.client.post(&self.url).json(&body).send().await?;

        if response.status().is_success() {
            tracing::info!("Order confirmation sent for order {}", confirmation.order_id);
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(NotificationError::Rejected { status, body })
        }
    }
}

/// Writes confirmations to the log when no webhook is configured
#[derive(Clone, Default)]
pub struct LogNotifier;

#[axum::async_trait]
impl OrderNotifier for LogNotifier {
    fn channel(&self) -> &'static str {
        "log"
    }

    async fn order_confirmed(&self, confirmation: &OrderConfirmation) -> Result<(), NotificationError> {
        tracing::info!(
            "Order {} confirmed for {} ({} items, {})",
            confirmation.order_id,
            confirmation.recipient,
            confirmation.item_count,
            confirmation.final_amount
        );
        Ok(())
    }
}

pub fn notifier_from_config(config: &NotificationConfig) -> Arc<dyn OrderNotifier> {
    match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone(), config.from.clone())),
        None => Arc::new(LogNotifier),
    }
}

/// Send on a background task; the caller never waits or fails on it
pub fn spawn_confirmation(notifier: Arc<dyn OrderNotifier>, confirmation: OrderConfirmation) {
    tokio::spawn(async move {
        if let Err(e) = notifier.order_confirmed(&confirmation).await {
            tracing::warn!(
                "Failed to send confirmation for order {}: {}",
                confirmation.order_id,
                e
            );
        }
    });
}
