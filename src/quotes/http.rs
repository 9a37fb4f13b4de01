use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::constants::quotes::{REQUEST_TIMEOUT, SYMBOL_PLACEHOLDER};
use crate::error::QuoteError;

use super::{parse_quote, Quote, QuoteSource};

/// Looks up quotes from an endpoint returning one JSON object per symbol,
/// e.g. `https://quotes.example.com/v1/{symbol}`.
pub struct HttpQuoteSource {
    name: String,
    url_template: String,
    client: Client,
}

impl HttpQuoteSource {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Result<Self, QuoteError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(name, url_template, client))
    }

    pub fn with_client(name: impl Into<String>, url_template: impl Into<String>, client: Client) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            client,
        }
    }

    fn url_for(&self, symbol: &str) -> String {
        self.url_template.replace(SYMBOL_PLACEHOLDER, symbol)
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
        let url = self.url_for(symbol);
        debug!("💲 [QUOTES] GET {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(QuoteError::Http {
                status: status.as_u16(),
                url,
            });
        }
        parse_quote(&response.text().await?)
    }
}
