//! Custom error types for the split watcher
//!
//! Provides structured, typed errors instead of generic Box<dyn Error>

use std::path::PathBuf;

use thiserror::Error;

/// A source adapter failed to produce records. Never fatal for a run.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed source payload: {0}")]
    Deserialization(#[from] serde_json::Error),
}

/// A raw field could not be normalized. The record is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unparseable ratio '{0}'")]
    Ratio(String),

    #[error("Unparseable effective date '{0}'")]
    Date(String),

    #[error("Ratio {0} is not a reverse split")]
    NotReverse(String),

    #[error("Unrecognised fractional handling '{0}'")]
    Fractional(String),

    #[error("Unusable research response: {0}")]
    Response(String),

    #[error("Missing symbol")]
    MissingSymbol,
}

/// A single research call failed. Consumed by the classifier's retry loop.
#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("Research API error: {0}")]
    Api(#[from] async_openai::error::OpenAIError),

    #[error("Empty research response")]
    EmptyResponse,
}

/// Sent-ledger persistence errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to read ledger {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write ledger {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A quote lookup failed. The record stays, without a price.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed quote payload: {0}")]
    Deserialization(#[from] serde_json::Error),
}

/// A notification channel failed to deliver
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("{channel} returned HTTP {status}: {body}")]
    Http {
        channel: String,
        status: u16,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors that abort a whole run before anything is dispatched
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Notification setup failed: {0}")]
    Notify(#[from] NotifyError),
}
