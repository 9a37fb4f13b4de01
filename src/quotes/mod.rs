//! Quote lookup for newly found splits: current price and listing venue.
//!
//! Lookups are best-effort. A failed lookup leaves the record unpriced; a
//! listing the quote source reports as OTC is dropped from the run.

pub mod http;

pub use http::HttpQuoteSource;

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::constants::{events, quotes};
use crate::error::QuoteError;
use crate::split::SplitRecord;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Quote {
    pub price: Option<f64>,
    pub exchange: Option<String>,
}

impl Quote {
    pub fn is_otc(&self) -> bool {
        self.exchange
            .as_deref()
            .is_some_and(|e| e.to_uppercase().contains(quotes::OTC_MARKER))
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;
    async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
}

/// Reads a quote object. Missing fields are `None`; prices are rounded to cents.
pub(crate) fn parse_quote(body: &str) -> Result<Quote, QuoteError> {
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    let json: Value = serde_json::from_str(body)?;

    let price = quotes::PRICE_FIELDS
        .iter()
        .find_map(|field| json.get(*field).and_then(Value::as_f64))
        .filter(|p| p.is_finite() && *p > 0.0)
        .map(|p| (p * 100.0).round() / 100.0);
    let exchange = quotes::EXCHANGE_FIELDS
        .iter()
        .find_map(|field| json.get(*field).and_then(Value::as_str))
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());

    Ok(Quote { price, exchange })
}

/// Looks up every symbol concurrently. Failed lookups are logged and absent
/// from the result.
pub async fn fetch_quotes(source: &dyn QuoteSource, symbols: &[String]) -> HashMap<String, Quote> {
    let results = join_all(symbols.iter().map(|s| source.quote(s))).await;

    let mut found = HashMap::with_capacity(symbols.len());
    for (symbol, result) in symbols.iter().zip(results) {
        match result {
            Ok(quote) => {
                debug!("💲 [QUOTES] {}: {:?} on {:?}", symbol, quote.price, quote.exchange);
                found.insert(symbol.clone(), quote);
            }
            Err(e) => warn!(
                event = events::QUOTE_FAILED,
                "⚠️ [QUOTES] {} lookup via {} failed: {}",
                symbol,
                source.name(),
                e
            ),
        }
    }
    info!(
        "💲 [QUOTES] Priced {}/{} symbol(s)",
        found.values().filter(|q| q.price.is_some()).count(),
        symbols.len()
    );
    found
}

/// Drops records listed OTC and collects the known prices of the rest.
pub fn apply_quotes(
    records: Vec<SplitRecord>,
    found: &HashMap<String, Quote>,
) -> (Vec<SplitRecord>, BTreeMap<String, f64>) {
    let kept: Vec<SplitRecord> = records
        .into_iter()
        .filter(|record| match found.get(&record.symbol) {
            Some(quote) if quote.is_otc() => {
                info!(
                    event = events::OTC_DROPPED,
                    "💲 [QUOTES] {} trades on {}, dropping",
                    record.symbol,
                    quote.exchange.as_deref().unwrap_or(quotes::OTC_MARKER)
                );
                false
            }
            _ => true,
        })
        .collect();

    let prices = kept
        .iter()
        .filter_map(|r| {
            found
                .get(&r.symbol)
                .and_then(|q| q.price)
                .map(|p| (r.symbol.clone(), p))
        })
        .collect();
    (kept, prices)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;

    use super::*;
    use crate::split::{EffectiveDate, FractionalHandling, SplitRatio};

    struct FixedQuotes {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QuoteSource for FixedQuotes {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn quote(&self, symbol: &str) -> Result<Quote, QuoteError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            match symbol {
                "ABCD" => Ok(Quote {
                    price: Some(0.45),
                    exchange: Some("NasdaqCM".to_string()),
                }),
                "PINK" => Ok(Quote {
                    price: Some(0.01),
                    exchange: Some("Other OTC".to_string()),
                }),
                _ => Err(QuoteError::Http {
                    status: 404,
                    url: format!("https://quotes.test/{}", symbol),
                }),
            }
        }
    }

    fn record(symbol: &str) -> SplitRecord {
        SplitRecord {
            symbol: symbol.to_string(),
            company: String::new(),
            ratio: SplitRatio::new(20, 1),
            effective_date: EffectiveDate::Known(NaiveDate::from_ymd_opt(2025, 9, 3).unwrap()),
            is_reverse: true,
            fractional_handling: FractionalHandling::RoundUp,
            threshold_minimum_shares: None,
            threshold_explanation: None,
            source: "test".to_string(),
            article_link: None,
        }
    }

    #[test]
    fn test_parse_prefers_current_price() {
        let quote = parse_quote(
            r#"{"currentPrice": 1.234, "regularMarketPrice": 9.0, "fullExchangeName": "NasdaqGS"}"#,
        )
        .unwrap();
        assert_eq!(quote.price, Some(1.23));
        assert_eq!(quote.exchange.as_deref(), Some("NasdaqGS"));
        assert!(!quote.is_otc());
    }

    #[test]
    fn test_parse_falls_back_and_tolerates_nulls() {
        let quote = parse_quote(r#"{"currentPrice": null, "previousClose": 2.5, "exchange": "OTC Markets"}"#).unwrap();
        assert_eq!(quote.price, Some(2.5));
        assert!(quote.is_otc());

        let quote = parse_quote(r#"{"price": 0}"#).unwrap();
        assert_eq!(quote, Quote::default());

        assert!(parse_quote("not json").is_err());
    }

    #[tokio::test]
    async fn test_failed_lookups_are_skipped() {
        let source = FixedQuotes {
            calls: Mutex::new(Vec::new()),
        };
        let symbols = vec!["ABCD".to_string(), "GONE".to_string()];

        let found = fetch_quotes(&source, &symbols).await;

        assert_eq!(source.calls.lock().unwrap().len(), 2);
        assert_eq!(found.len(), 1);
        assert_eq!(found["ABCD"].price, Some(0.45));
    }

    #[tokio::test]
    async fn test_otc_listings_are_dropped_and_prices_kept() {
        let source = FixedQuotes {
            calls: Mutex::new(Vec::new()),
        };
        let symbols = vec!["ABCD".to_string(), "PINK".to_string(), "GONE".to_string()];
        let found = fetch_quotes(&source, &symbols).await;

        let (kept, prices) = apply_quotes(vec![record("ABCD"), record("PINK"), record("GONE")], &found);

        let symbols: Vec<&str> = kept.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ABCD", "GONE"]);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["ABCD"], 0.45);
    }
}
