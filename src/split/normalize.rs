//! Normalizer & deduplicator: the single adaptation boundary between raw
//! source records and the canonical [`SplitRecord`].

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::constants::{events, placeholders::UNKNOWN_DATES};
use crate::error::ParseError;

use super::ratio::parse_ratio;
use super::types::{DedupKey, EffectiveDate, FractionalHandling, RawSplitRecord, SplitRecord};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%m-%d-%Y", "%b %d, %Y", "%B %d, %Y"];

const PLACEHOLDER_TEXT: &[&str] = &["", "n/a", "na", "unknown", "none", "-", "not specified"];

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().trim_start_matches('$').trim().to_uppercase()
}

pub fn normalize_date(text: Option<&str>) -> Result<EffectiveDate, ParseError> {
    let raw = text.unwrap_or("").trim();
    if UNKNOWN_DATES.contains(&raw.to_lowercase().as_str()) {
        return Ok(EffectiveDate::Unknown);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(EffectiveDate::Known)
        .ok_or_else(|| ParseError::Date(raw.to_string()))
}

/// Maps a source's free-text fractional note to the enum.
pub fn parse_fractional_hint(text: Option<&str>) -> FractionalHandling {
    let hint = text.unwrap_or("").trim();
    if let Ok(handling) = hint.parse::<FractionalHandling>() {
        return handling;
    }
    let t = hint.to_lowercase();
    let rounds_up = t.contains("round up") || t.contains("rounded up") || t.contains("rounding up");
    if rounds_up && (t.contains("threshold") || t.contains("exceed")) {
        FractionalHandling::ThresholdRoundUp
    } else if rounds_up {
        FractionalHandling::RoundUp
    } else if t.contains("cash") {
        FractionalHandling::CashInLieu
    } else if t.contains("round down") || t.contains("rounded down") {
        FractionalHandling::RoundDown
    } else {
        FractionalHandling::Unknown
    }
}

fn is_placeholder(text: &str) -> bool {
    PLACEHOLDER_TEXT.contains(&text.trim().to_lowercase().as_str())
}

/// Converts one raw record, rejecting anything that is not a well-formed reverse split.
pub fn normalize_record(raw: &RawSplitRecord) -> Result<SplitRecord, ParseError> {
    let symbol = normalize_symbol(&raw.symbol);
    if symbol.is_empty() {
        return Err(ParseError::MissingSymbol);
    }

    let ratio = parse_ratio(&raw.ratio)?;
    if !ratio.is_reverse() || raw.is_reverse == Some(false) {
        return Err(ParseError::NotReverse(ratio.to_string()));
    }

    let effective_date = normalize_date(raw.effective_date.as_deref())?;

    let company = raw
        .company
        .as_deref()
        .filter(|c| !is_placeholder(c))
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    let mut record = SplitRecord {
        symbol,
        company,
        ratio,
        effective_date,
        is_reverse: true,
        fractional_handling: FractionalHandling::Unknown,
        threshold_minimum_shares: None,
        threshold_explanation: None,
        source: raw.source.trim().to_string(),
        article_link: raw.article_link.clone().filter(|l| !is_placeholder(l)),
    };
    record.set_fractional_handling(parse_fractional_hint(raw.fractional.as_deref()));
    Ok(record)
}

/// Normalizes a batch, dropping malformed and non-reverse records, then deduplicates.
pub fn normalize_batch(raws: &[RawSplitRecord]) -> Vec<SplitRecord> {
    let records = raws
        .iter()
        .filter_map(|raw| match normalize_record(raw) {
            Ok(record) => Some(record),
            Err(ParseError::NotReverse(ratio)) => {
                debug!("Skipping {} ({}): not a reverse split ({})", raw.symbol, raw.source, ratio);
                None
            }
            Err(e) => {
                warn!(
                    event = events::RECORD_DROPPED,
                    "⚠️ Dropping {} from {}: {}", raw.symbol, raw.source, e
                );
                None
            }
        })
        .collect();
    dedup(records)
}

/// Collapses records sharing a [`DedupKey`], keeping first-seen order.
pub fn dedup(records: Vec<SplitRecord>) -> Vec<SplitRecord> {
    let mut merged: Vec<SplitRecord> = Vec::with_capacity(records.len());
    let mut index: HashMap<DedupKey, usize> = HashMap::new();

    for record in records {
        match index.get(&record.key()) {
            Some(&i) => merge_into(&mut merged[i], record),
            None => {
                index.insert(record.key(), merged.len());
                merged.push(record);
            }
        }
    }
    merged
}

/// Field-by-field merge. A real value always beats a placeholder; when both
/// sides carry conflicting values the earlier record wins and the conflict is logged.
pub fn merge_into(existing: &mut SplitRecord, incoming: SplitRecord) {
    let key = existing.key();
    let (kept_source, dropped_source) = (existing.source.clone(), incoming.source.clone());
    let conflict = |field: &str, kept: &dyn std::fmt::Display, dropped: &dyn std::fmt::Display| {
        warn!(
            event = events::MERGE_CONFLICT,
            "⚠️ {} conflict for {}: keeping '{}' ({}), ignoring '{}' ({})",
            field, key, kept, kept_source, dropped, dropped_source
        );
    };

    if existing.company.is_empty() {
        existing.company = incoming.company.clone();
    } else if !incoming.company.is_empty() && incoming.company != existing.company {
        conflict("company", &existing.company, &incoming.company);
    }

    if incoming.ratio != existing.ratio {
        conflict("ratio", &existing.ratio, &incoming.ratio);
    }

    match (existing.fractional_handling.is_resolved(), incoming.fractional_handling.is_resolved()) {
        (false, true) => {
            existing.set_fractional_handling(incoming.fractional_handling);
            existing.threshold_minimum_shares = incoming.threshold_minimum_shares;
            existing.threshold_explanation = incoming.threshold_explanation.clone();
        }
        (true, true) if existing.fractional_handling != incoming.fractional_handling => {
            conflict("fractional_handling", &existing.fractional_handling, &incoming.fractional_handling);
        }
        (true, true) if existing.threshold_minimum_shares.is_none() => {
            existing.threshold_minimum_shares = incoming.threshold_minimum_shares;
            if existing.threshold_explanation.is_none() {
                existing.threshold_explanation = incoming.threshold_explanation.clone();
            }
        }
        _ => {}
    }

    if existing.article_link.is_none() {
        existing.article_link = incoming.article_link;
    }
}
