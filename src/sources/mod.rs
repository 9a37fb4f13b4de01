//! Source adapters: producers of raw split records.
//!
//! Adapters only fetch and deserialize. Every field-level interpretation
//! happens in the normalizer.

pub mod factory;
pub mod http_json;
pub mod json_file;

pub use factory::build_sources;
pub use http_json::HttpJsonSource;
pub use json_file::JsonFileSource;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{info, warn};

use crate::constants::events;
use crate::error::SourceError;
use crate::split::RawSplitRecord;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<Vec<RawSplitRecord>, SourceError>;
}

/// Accepted payload shapes: a bare array, or an object wrapping one.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Records(Vec<RawSplitRecord>),
    Wrapped {
        #[serde(alias = "data", alias = "results")]
        splits: Vec<RawSplitRecord>,
    },
}

/// Parses a source payload, stamping `source` where the producer left it blank.
pub(crate) fn parse_payload(source_name: &str, body: &str) -> Result<Vec<RawSplitRecord>, SourceError> {
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut records = match serde_json::from_str::<Payload>(body)? {
        Payload::Records(records) | Payload::Wrapped { splits: records } => records,
    };
    for record in &mut records {
        if record.source.trim().is_empty() {
            record.source = source_name.to_string();
        }
    }
    Ok(records)
}

/// Fans out to every adapter and concatenates the results in adapter order.
/// A failing adapter contributes nothing.
pub async fn collect_all(sources: &[Box<dyn SourceAdapter>]) -> Vec<RawSplitRecord> {
    let results = join_all(sources.iter().map(|s| s.fetch())).await;

    let mut records = Vec::new();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(batch) => {
                info!("📥 [SOURCES] {} returned {} record(s)", source.name(), batch.len());
                records.extend(batch);
            }
            Err(e) => warn!(
                event = events::SOURCE_FAILED,
                "⚠️ [SOURCES] {} failed, skipping: {}",
                source.name(),
                e
            ),
        }
    }
    records
}
