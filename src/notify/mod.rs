//! Notification dispatcher: renders a run outcome and fans it out to every
//! configured channel. Channel failures are isolated from one another.

pub mod buy_alert;
pub mod discord;
pub mod render;

pub use buy_alert::AlertMode;
pub use discord::DiscordNotifier;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::calendar::is_market_day;
use crate::config::NotifyConfig;
use crate::constants::{events, notify::DISCORD_MAX_CHARS};
use crate::error::NotifyError;
use crate::services::orchestrator::RunOutcome;

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, content: &str) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of a chat service.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, content: &str) -> Result<(), NotifyError> {
        info!("📣 [DISPATCH] Message:\n{}", content);
        Ok(())
    }
}

/// Per-channel delivery result of one dispatch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchSummary {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
    /// `Some(mode)` when a buy alert was delivered.
    pub buy_alert: Option<AlertMode>,
}

pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
    buy_channel: Option<Box<dyn Notifier>>,
    mode: AlertMode,
}

impl Dispatcher {
    pub fn new(dry_run: bool) -> Self {
        Self {
            channels: Vec::new(),
            buy_channel: None,
            mode: AlertMode::from_dry_run(dry_run),
        }
    }

    pub fn with_channel(mut self, channel: Box<dyn Notifier>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn with_buy_channel(mut self, channel: Box<dyn Notifier>) -> Self {
        self.buy_channel = Some(channel);
        self
    }

    /// Discord channels for every configured webhook plus the optional log channel.
    /// `dry_run` from the command line can only tighten the configured mode.
    pub fn from_config(config: &NotifyConfig, dry_run: bool) -> Result<Self, NotifyError> {
        let mut dispatcher = Self::new(config.dry_run || dry_run);
        let username = Some(config.username.clone());

        if let Some(url) = &config.webhook_url {
            dispatcher = dispatcher.with_channel(Box::new(DiscordNotifier::new(
                "discord",
                url.clone(),
                username.clone(),
            )?));
        } else {
            warn!("⚠️ [DISPATCH] DISCORD_WEBHOOK_URL is not set");
        }
        if config.log_channel {
            dispatcher = dispatcher.with_channel(Box::new(LogNotifier));
        }
        if let Some(url) = &config.buy_webhook_url {
            dispatcher = dispatcher.with_buy_channel(Box::new(DiscordNotifier::new(
                "discord-buy",
                url.clone(),
                username,
            )?));
        }
        Ok(dispatcher)
    }

    pub fn mode(&self) -> AlertMode {
        self.mode
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn dispatch(&self, outcome: &RunOutcome, today: NaiveDate) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        let message = render::render_run(outcome, today, render::random_emoji());
        let chunks = render::chunk_message(&message, DISCORD_MAX_CHARS);
        for channel in &self.channels {
            match send_chunks(channel.as_ref(), &chunks).await {
                Ok(()) => summary.delivered.push(channel.name().to_string()),
                Err(e) => {
                    error!(
                        event = events::DISPATCH_FAILED,
                        "❌ [DISPATCH] {} failed: {}",
                        channel.name(),
                        e
                    );
                    summary.failed.push(channel.name().to_string());
                }
            }
        }

        if let Some(channel) = &self.buy_channel {
            if !is_market_day(today) {
                info!("📣 [DISPATCH] {} is not a market day, skipping buy alert", today);
            } else if let Some(alert) = buy_alert::render_buy_alert(&outcome.new, today, self.mode) {
                match send_chunks(channel.as_ref(), &render::chunk_message(&alert, DISCORD_MAX_CHARS)).await {
                    Ok(()) => {
                        info!("🛒 [DISPATCH] Buy alert sent ({})", self.mode.label());
                        summary.delivered.push(channel.name().to_string());
                        summary.buy_alert = Some(self.mode);
                    }
                    Err(e) => {
                        error!(
                            event = events::DISPATCH_FAILED,
                            "❌ [DISPATCH] {} failed: {}",
                            channel.name(),
                            e
                        );
                        summary.failed.push(channel.name().to_string());
                    }
                }
            }
        }

        info!(
            "📣 [DISPATCH] Delivered to {:?}, failed: {:?}",
            summary.delivered, summary.failed
        );
        summary
    }
}

/// Stops at the first failed chunk; the channel is not retried this run.
async fn send_chunks(channel: &dyn Notifier, chunks: &[String]) -> Result<(), NotifyError> {
    for chunk in chunks {
        channel.send(chunk).await?;
    }
    Ok(())
}
