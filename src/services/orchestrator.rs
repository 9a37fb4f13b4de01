//! Run orchestrator: splits a run's classified records against the
//! Sent-Ledger into New, Still-Buyable and Expired.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::data::ledger::{still_buyable, LedgerEntry, SentLedger};
use crate::error::LedgerError;
use crate::split::normalize::merge_into;
use crate::split::{DedupKey, EffectiveDate, SplitRecord};

/// The three disjoint outputs of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunOutcome {
    /// Never announced before; sorted by symbol then date.
    pub new: Vec<SplitRecord>,
    /// Announced on an earlier run and still actionable; sorted by symbol then date.
    pub still_buyable: Vec<LedgerEntry>,
    /// Ledger entries past their last buy day. Kept on disk, never rendered.
    pub expired_count: usize,
    /// Current share price of New records by symbol, when a quote was found.
    pub prices: BTreeMap<String, f64>,
}

impl RunOutcome {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.still_buyable.is_empty()
    }
}

/// Partitions `records` against `ledger`, upserting every record and
/// refreshing `last_seen` on still-buyable entries. Every ledger mutation is
/// persisted before this returns, so a `LedgerError` means nothing may be sent.
pub fn partition(
    records: Vec<SplitRecord>,
    ledger: &mut SentLedger,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<RunOutcome, LedgerError> {
    let mut outcome = RunOutcome::default();
    let mut matched: HashSet<DedupKey> = HashSet::new();

    for mut record in fold_dateless(records) {
        let mut key = record.key();

        if ledger.lookup(&key).is_none() {
            match key.effective_date {
                EffectiveDate::Known(_) => {
                    // A split first announced without a date now has one
                    let unknown = key.with_unknown_date();
                    if !matched.contains(&unknown) {
                        ledger.rekey(&unknown, &key)?;
                    }
                }
                EffectiveDate::Unknown => {
                    // The source lost a date the ledger already knows
                    if let Some(known) = known_date_for(ledger, &key.symbol, &matched) {
                        debug!("📒 [ORCHESTRATOR] {} matches stored {}", key, known);
                        record.effective_date = known.effective_date;
                        key = known;
                    }
                }
            }
        }

        if !matched.insert(key.clone()) {
            debug!("📒 [ORCHESTRATOR] {} already handled this run", key);
            continue;
        }

        if ledger.lookup(&key).is_some() {
            let entry = ledger.upsert(&key, record, now)?;
            if still_buyable(&entry, today) {
                outcome.still_buyable.push(entry);
            } else {
                outcome.expired_count += 1;
            }
        } else {
            ledger.upsert(&key, record.clone(), now)?;
            outcome.new.push(record);
        }
    }

    let unmatched: Vec<DedupKey> = stored_keys(ledger)
        .filter(|k| !matched.contains(k))
        .collect();
    for key in unmatched {
        let buyable = ledger
            .lookup(&key)
            .map(|e| still_buyable(e, today))
            .unwrap_or(false);
        if !buyable {
            outcome.expired_count += 1;
            continue;
        }
        if let Some(entry) = ledger.touch(&key, now)? {
            outcome.still_buyable.push(entry);
        }
    }

    outcome.new.sort_by(|a, b| a.key().cmp(&b.key()));
    outcome.still_buyable.sort_by(|a, b| a.key().cmp(&b.key()));

    info!(
        "📒 [ORCHESTRATOR] New: {}, still buyable: {}, expired: {}",
        outcome.new.len(),
        outcome.still_buyable.len(),
        outcome.expired_count
    );
    Ok(outcome)
}

/// Merges each dateless record into the earliest-dated record of the same
/// symbol in the batch, so one split never yields two keys in a run.
pub fn fold_dateless(records: Vec<SplitRecord>) -> Vec<SplitRecord> {
    let mut earliest: HashMap<String, EffectiveDate> = HashMap::new();
    for record in records.iter().filter(|r| r.effective_date.is_known()) {
        earliest
            .entry(record.symbol.clone())
            .and_modify(|date| *date = (*date).min(record.effective_date))
            .or_insert(record.effective_date);
    }

    let (mut kept, dateless): (Vec<SplitRecord>, Vec<SplitRecord>) = records
        .into_iter()
        .partition(|r| r.effective_date.is_known() || !earliest.contains_key(&r.symbol));

    for record in dateless {
        let target = earliest.get(&record.symbol).and_then(|date| {
            kept.iter_mut()
                .find(|r| r.symbol == record.symbol && r.effective_date == *date)
        });
        if let Some(target) = target {
            debug!(
                "📒 [ORCHESTRATOR] Folding dateless {} into {}",
                record.symbol,
                target.key()
            );
            merge_into(target, record);
        }
    }
    kept
}

/// Earliest stored known-date key for `symbol` not already claimed this run.
pub(crate) fn known_date_for(ledger: &SentLedger, symbol: &str, matched: &HashSet<DedupKey>) -> Option<DedupKey> {
    stored_keys(ledger)
        .filter(|k| k.symbol == symbol && k.effective_date.is_known() && !matched.contains(k))
        .min()
}

fn stored_keys(ledger: &SentLedger) -> impl Iterator<Item = DedupKey> + '_ {
    ledger.keyed_entries().filter_map(|(k, _)| k.parse().ok())
}
