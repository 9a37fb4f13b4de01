pub mod ledger;
pub mod query;
pub mod report;

pub use ledger::{still_buyable, LedgerEntry, SentLedger};
