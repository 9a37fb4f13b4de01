use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::error::NotifyError;

use super::Notifier;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

/// Posts messages to a Discord channel webhook.
pub struct DiscordNotifier {
    name: String,
    webhook_url: String,
    username: Option<String>,
    client: Client,
}

impl DiscordNotifier {
    pub fn new(
        name: impl Into<String>,
        webhook_url: impl Into<String>,
        username: Option<String>,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self::with_client(name, webhook_url, username, client))
    }

    pub fn with_client(
        name: impl Into<String>,
        webhook_url: impl Into<String>,
        username: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            name: name.into(),
            webhook_url: webhook_url.into(),
            username: username.filter(|u| !u.trim().is_empty()),
            client,
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, content: &str) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            content,
            username: self.username.as_deref(),
        };
        let response = self.client.post(&self.webhook_url).json(&payload).send().await?;

        // Discord answers 204 No Content on success
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http {
                channel: self.name.clone(),
                status: status.as_u16(),
                body,
            });
        }
        info!("📣 [DISPATCH] {} accepted message ({})", self.name, status);
        Ok(())
    }
}
