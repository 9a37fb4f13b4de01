//! Application-wide constants and magic numbers
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make the pipeline easier to tune.

use std::time::Duration;

/// External research (classifier) constants
pub mod research {
    use super::*;

    /// Maximum research attempts per query (primary and threshold each)
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Delay before the first retry (doubled each retry)
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(2_000);

    /// Upper bound for the retry delay
    pub const MAX_RETRY_DELAY: Duration = Duration::from_millis(10_000);

    /// Pause between records so consecutive lookups don't hammer the API
    pub const INTER_RECORD_DELAY: Duration = Duration::from_millis(1_000);

    /// Default model served by the OpenAI-compatible Gemini endpoint
    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

    /// Gemini's OpenAI-compatible base URL
    pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
}

/// Quote lookup constants
pub mod quotes {
    use super::*;

    /// Replaced with the symbol in a quote URL template
    pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";

    /// Per-lookup HTTP timeout
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Exchange names containing this mark an over-the-counter listing
    pub const OTC_MARKER: &str = "OTC";

    /// Price fields in order of preference
    pub const PRICE_FIELDS: &[&str] = &["currentPrice", "regularMarketPrice", "previousClose", "price"];

    /// Exchange name fields in order of preference
    pub const EXCHANGE_FIELDS: &[&str] = &["fullExchangeName", "exchange"];
}

/// Ledger and report locations
pub mod paths {
    pub const DEFAULT_CONFIG: &str = "config.yaml";
    pub const DEFAULT_LEDGER: &str = "logs/previously_sent_db.json";
    pub const DEFAULT_REPORT: &str = "logs/previously_sent.txt";
}

/// Placeholder vocabularies recognised by the normalizer
pub mod placeholders {
    /// Date tokens meaning "not announced yet"
    pub const UNKNOWN_DATES: &[&str] = &["", "unknown", "n/a", "na", "tbd", "pending", "-", "none"];

    /// Text used for an unresolved effective date in keys and on disk
    pub const UNKNOWN_DATE: &str = "unknown";
}

/// Notification constants
pub mod notify {
    /// Discord rejects message content above this length
    pub const DISCORD_MAX_CHARS: usize = 2_000;

    /// Username shown on webhook posts
    pub const DEFAULT_USERNAME: &str = "Stock Split Bot";

    /// Sent when nothing actionable was found
    pub const NO_SPLITS_MESSAGE: &str = "No upcoming reverse stock splits found";
}

/// Scheduling constants
pub mod schedule {
    /// Weekdays at 14:00 UTC (08:00 MST), before the US open
    pub const DEFAULT_CRON: &str = "0 0 14 * * Mon-Fri";
}

/// Logging event names for structured logging
pub mod events {
    pub const SOURCE_FAILED: &str = "source_failed";
    pub const RECORD_DROPPED: &str = "record_dropped";
    pub const MERGE_CONFLICT: &str = "merge_conflict";
    pub const CLASSIFICATION_EXHAUSTED: &str = "classification_exhausted";
    pub const LEDGER_CORRUPT: &str = "ledger_corrupt";
    pub const LEDGER_MIGRATED: &str = "ledger_migrated";
    pub const DISPATCH_FAILED: &str = "dispatch_failed";
    pub const QUOTE_FAILED: &str = "quote_failed";
    pub const OTC_DROPPED: &str = "otc_dropped";
}
