use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::SourceError;
use crate::split::RawSplitRecord;

use super::{parse_payload, SourceAdapter};

/// Fetches records from an HTTP endpoint serving the scraper's JSON output.
pub struct HttpJsonSource {
    name: String,
    url: String,
    client: Client,
}

impl HttpJsonSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self, SourceError> {
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
        })
    }
}

#[async_trait]
impl SourceAdapter for HttpJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawSplitRecord>, SourceError> {
        debug!("📥 [SOURCES] GET {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        let body = response.text().await?;
        parse_payload(&self.name, &body)
    }
}
