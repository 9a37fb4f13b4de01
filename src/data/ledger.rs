//! Sent-ledger: the persistent record of which split events have already
//! been announced.
//!
//! On disk the ledger is a JSON object keyed by `"SYMBOL|EFFECTIVE_DATE"`:
//!
//! ```json
//! {
//!   "ABCD|2025-09-01": {
//!     "data": { "symbol": "ABCD", "ratio": "20->1", ... },
//!     "first_sent": "2025-08-20T14:00:03Z",
//!     "last_seen": "2025-08-21T14:00:02Z"
//!   }
//! }
//! ```
//!
//! Every mutation is followed by a write-to-temp-then-rename so a killed
//! process never leaves a half-written file behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::calendar::next_market_day;
use crate::constants::events;
use crate::error::LedgerError;
use crate::split::{DedupKey, EffectiveDate, SplitRecord};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub data: SplitRecord,
    pub first_sent: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn key(&self) -> DedupKey {
        self.data.key()
    }
}

/// True while a subscriber can still buy ahead of the split: the date is
/// unknown, or it falls on or after the next market day.
pub fn still_buyable(entry: &LedgerEntry, today: NaiveDate) -> bool {
    is_still_buyable(entry.data.effective_date, today)
}

pub fn is_still_buyable(effective_date: EffectiveDate, today: NaiveDate) -> bool {
    match effective_date {
        EffectiveDate::Unknown => true,
        EffectiveDate::Known(date) => date >= next_market_day(today),
    }
}

#[derive(Debug)]
pub struct SentLedger {
    path: Option<PathBuf>,
    entries: BTreeMap<String, LedgerEntry>,
}

impl SentLedger {
    /// A ledger that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    /// Loads the ledger at `path`. A missing or corrupt file yields an empty
    /// ledger; any other read failure is returned.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&path, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("📒 [LEDGER] No ledger at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(source) => return Err(LedgerError::Read { path, source }),
        };

        info!("📒 [LEDGER] Loaded {} entries from {}", entries.len(), path.display());
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    fn parse(path: &Path, content: &str) -> BTreeMap<String, LedgerEntry> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        if content.trim().is_empty() {
            return BTreeMap::new();
        }
        match serde_json::from_str::<BTreeMap<String, LedgerEntry>>(content) {
            Ok(entries) => entries,
            Err(e) => {
                error!(
                    event = events::LEDGER_CORRUPT,
                    "❌ [LEDGER] {} is corrupt ({}), continuing with an empty ledger",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, key: &DedupKey) -> Option<&LedgerEntry> {
        self.entries.get(&key.to_string())
    }

    /// Creates the entry with `first_sent = last_seen = now`, or replaces its
    /// data and bumps `last_seen`. Persists before returning.
    pub fn upsert(
        &mut self,
        key: &DedupKey,
        record: SplitRecord,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self
            .entries
            .entry(key.to_string())
            .and_modify(|e| {
                e.data = record.clone();
                e.last_seen = now;
            })
            .or_insert_with(|| LedgerEntry {
                data: record,
                first_sent: now,
                last_seen: now,
            })
            .clone();
        self.persist()?;
        Ok(entry)
    }

    /// Bumps `last_seen` without touching the stored data.
    pub fn touch(&mut self, key: &DedupKey, now: DateTime<Utc>) -> Result<Option<LedgerEntry>, LedgerError> {
        let touched = self.entries.get_mut(&key.to_string()).map(|e| {
            e.last_seen = now;
            e.clone()
        });
        if touched.is_some() {
            self.persist()?;
        }
        Ok(touched)
    }

    /// Moves an entry to a new key, keeping `first_sent`. Used when an
    /// announced split with an unknown date later gets one.
    pub fn rekey(&mut self, from: &DedupKey, to: &DedupKey) -> Result<bool, LedgerError> {
        if self.entries.contains_key(&to.to_string()) {
            return Ok(false);
        }
        let Some(mut entry) = self.entries.remove(&from.to_string()) else {
            return Ok(false);
        };
        entry.data.symbol = to.symbol.clone();
        entry.data.effective_date = to.effective_date;
        self.entries.insert(to.to_string(), entry);
        info!(event = events::LEDGER_MIGRATED, "📒 [LEDGER] Migrated {} -> {}", from, to);
        self.persist()?;
        Ok(true)
    }

    /// Read-only enumeration, ordered by key.
    pub fn all_entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Raw keyed view, as stored on disk.
    pub fn keyed_entries(&self) -> impl Iterator<Item = (&str, &LedgerEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn persist(&self) -> Result<(), LedgerError> {
        match &self.path {
            Some(path) => write_atomic(path, &serde_json::to_vec_pretty(&self.entries)?),
            None => Ok(()),
        }
    }
}

/// Writes `bytes` to a sibling temp file, syncs it, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LedgerError> {
    let write_err = |source| LedgerError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let temp_path = path.with_extension("tmp");
    let cleanup_and_err = |e| {
        let _ = fs::remove_file(&temp_path);
        write_err(e)
    };

    let mut file = fs::File::create(&temp_path).map_err(write_err)?;
    file.write_all(bytes).map_err(cleanup_and_err)?;
    file.sync_all().map_err(cleanup_and_err)?;
    drop(file);

    fs::rename(&temp_path, path).map_err(cleanup_and_err)?;
    Ok(())
}
