//! SplitWatch - Reverse stock split discovery and notification
//!
//! This library provides the core functionality for collecting announced
//! reverse splits, researching how fractional shares are handled, tracking
//! what has already been announced, and notifying subscribers.

pub mod agents;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod llm;
pub mod notify;
pub mod quotes;
pub mod services;
pub mod sources;
pub mod split;

// Re-export commonly used types
pub use config::AppConfig;
pub use data::{LedgerEntry, SentLedger};
pub use services::{Pipeline, RunOutcome};
pub use split::{ActionCategory, FractionalHandling, SplitRecord};
