use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SourceError;
use crate::split::RawSplitRecord;

use super::{parse_payload, SourceAdapter};

/// Reads the JSON array an external scraper leaves on disk.
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<RawSplitRecord>, SourceError> {
        debug!("📥 [SOURCES] Reading {}", self.path.display());
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_payload(&self.name, &body)
    }
}
