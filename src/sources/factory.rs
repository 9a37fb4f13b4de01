use tracing::{info, warn};

use crate::config::SourceConfig;
use crate::constants::events;

use super::{HttpJsonSource, JsonFileSource, SourceAdapter};

/// Builds one adapter per configured source. An adapter that cannot be
/// constructed is skipped like any other failing source.
pub fn build_sources(configs: &[SourceConfig]) -> Vec<Box<dyn SourceAdapter>> {
    let mut sources: Vec<Box<dyn SourceAdapter>> = Vec::with_capacity(configs.len());
    for config in configs {
        match config {
            SourceConfig::JsonFile { name, path } => {
                sources.push(Box::new(JsonFileSource::new(name.clone(), path.clone())));
            }
            SourceConfig::HttpJson { name, url } => match HttpJsonSource::new(name.clone(), url.clone()) {
                Ok(source) => sources.push(Box::new(source)),
                Err(e) => warn!(
                    event = events::SOURCE_FAILED,
                    "⚠️ [SOURCES] Cannot build {}: {}", name, e
                ),
            },
        }
    }
    info!("📥 [SOURCES] {} source(s) configured", sources.len());
    sources
}
