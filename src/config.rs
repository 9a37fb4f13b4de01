use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::constants::{notify, paths, quotes, research, schedule};
use crate::error::ConfigError;
use crate::services::classifier::ClassifierConfig;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    pub path: PathBuf,
    pub report_path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(paths::DEFAULT_LEDGER),
            report_path: PathBuf::from(paths::DEFAULT_REPORT),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub inter_record_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Some(research::DEFAULT_BASE_URL.to_string()),
            model: research::DEFAULT_MODEL.to_string(),
            max_attempts: research::MAX_ATTEMPTS,
            retry_delay_ms: research::RETRY_BASE_DELAY.as_millis() as u64,
            max_retry_delay_ms: research::MAX_RETRY_DELAY.as_millis() as u64,
            inter_record_delay_ms: research::INTER_RECORD_DELAY.as_millis() as u64,
        }
    }
}

/// One upstream producer of raw split records.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A JSON array written by an external scraper.
    JsonFile { name: String, path: PathBuf },
    /// An endpoint returning a JSON array of records.
    HttpJson { name: String, url: String },
}

impl SourceConfig {
    pub fn name(&self) -> &str {
        match self {
            SourceConfig::JsonFile { name, .. } | SourceConfig::HttpJson { name, .. } => name,
        }
    }
}

/// Optional price lookup for newly found splits.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct QuoteConfig {
    #[serde(default = "default_quote_name")]
    pub name: String,
    /// Endpoint with a `{symbol}` placeholder
    pub url: String,
}

fn default_quote_name() -> String {
    "quotes".to_string()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotifyConfig {
    /// Buy alerts are labelled DRY RUN and never LIVE while set.
    pub dry_run: bool,
    pub username: String,
    /// Also write every rendered message to the log.
    pub log_channel: bool,
    pub webhook_url: Option<String>,
    pub buy_webhook_url: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            username: notify::DEFAULT_USERNAME.to_string(),
            log_channel: true,
            webhook_url: None,
            buy_webhook_url: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: schedule::DEFAULT_CRON.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub llm: LlmConfig,
    pub sources: Vec<SourceConfig>,
    pub quotes: Option<QuoteConfig>,
    pub notify: NotifyConfig,
    pub schedule: ScheduleConfig,
}

impl AppConfig {
    /// Reads `path`, overlays secrets from the environment and validates.
    /// A missing file means all defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("⚠️ {} not found, using default configuration", path.display());
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.apply_secrets(|key| std::env::var(key).ok());
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Secrets never live in config.yaml; the environment wins when set.
    pub fn apply_secrets<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("LLM_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get("DISCORD_WEBHOOK_URL") {
            self.notify.webhook_url = Some(url);
        }
        if let Some(url) = get("DISCORD_BUY_WEBHOOK_URL") {
            self.notify.buy_webhook_url = Some(url);
        }
        self.llm.api_key = self.llm.api_key.take().filter(|k| !k.trim().is_empty());
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.max_attempts == 0 || self.llm.max_attempts > research::MAX_ATTEMPTS {
            return Err(ConfigError::Invalid {
                field: "llm.max_attempts",
                reason: format!("must be between 1 and {}", research::MAX_ATTEMPTS),
            });
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "llm.model",
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(url) = &self.llm.base_url {
            check_http_url("llm.base_url", url)?;
        }
        if let Some(url) = &self.notify.webhook_url {
            check_http_url("notify.webhook_url", url)?;
        }
        if let Some(url) = &self.notify.buy_webhook_url {
            check_http_url("notify.buy_webhook_url", url)?;
        }
        for source in &self.sources {
            if source.name().trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "sources.name",
                    reason: "must not be empty".to_string(),
                });
            }
            if let SourceConfig::HttpJson { url, .. } = source {
                check_http_url("sources.url", url)?;
            }
        }
        if let Some(quote) = &self.quotes {
            if !quote.url.contains(quotes::SYMBOL_PLACEHOLDER) {
                return Err(ConfigError::Invalid {
                    field: "quotes.url",
                    reason: format!("must contain {}", quotes::SYMBOL_PLACEHOLDER),
                });
            }
            check_http_url("quotes.url", &quote.url.replace(quotes::SYMBOL_PLACEHOLDER, "ABCD"))?;
        }
        if self.schedule.cron.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "schedule.cron",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            max_attempts: self.llm.max_attempts,
            retry_delay: Duration::from_millis(self.llm.retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.llm.max_retry_delay_ms),
            inter_record_delay: Duration::from_millis(self.llm.inter_record_delay_ms),
        }
    }
}

fn check_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("'{}' is not a URL ({})", value, e),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            field,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
