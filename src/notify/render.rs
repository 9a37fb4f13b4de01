//! Chat message rendering for a run outcome.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::seq::SliceRandom;

use crate::calendar::previous_market_day;
use crate::constants::notify::NO_SPLITS_MESSAGE;
use crate::services::orchestrator::RunOutcome;
use crate::split::{ActionCategory, EffectiveDate, SplitRatio, SplitRecord};

const EMOJIS: &[&str] = &["🚀", "📈", "💎", "🔥", "⭐", "🎯", "🍀", "💸", "🦄", "⚡"];

pub fn random_emoji() -> &'static str {
    EMOJIS.choose(&mut rand::thread_rng()).copied().unwrap_or("📈")
}

/// The day before the split a position must be held by.
pub fn last_day_to_buy(effective_date: EffectiveDate) -> String {
    match effective_date {
        EffectiveDate::Known(date) => previous_market_day(date).format("%Y-%m-%d").to_string(),
        EffectiveDate::Unknown => "unknown".to_string(),
    }
}

fn section_header(category: ActionCategory) -> String {
    match category {
        ActionCategory::BuyOneShare => format!("💰 **{}** 💰", category.title()),
        ActionCategory::BuyThresholdShares => format!("🤔 **{}** 🤔", category.title()),
        ActionCategory::CheckRounding => format!("🔍 **{}** 🔍", category.title()),
    }
}

/// Price of one share once the split takes effect.
pub fn projected_price(price: f64, ratio: SplitRatio) -> f64 {
    price * f64::from(ratio.old_shares) / f64::from(ratio.new_shares.max(1))
}

fn record_line(record: &SplitRecord, category: ActionCategory, price: Option<f64>, emoji: &str) -> String {
    let mut line = format!("{} {} - {}", emoji, record.symbol, record.ratio);
    if let Some(price) = price {
        line.push_str(&format!(
            " (${:.2}--->${:.2})",
            price,
            projected_price(price, record.ratio)
        ));
    }
    if !record.company.is_empty() {
        line.push_str(&format!(" ({})", record.company));
    }
    match category {
        ActionCategory::BuyThresholdShares => {
            if let Some(min) = record.threshold_minimum_shares {
                line.push_str(&format!(" [min {} shares]", min));
            }
        }
        ActionCategory::CheckRounding => {
            line.push_str(&format!(" [{}] [Source: {}]", record.fractional_handling, record.source));
        }
        ActionCategory::BuyOneShare => {}
    }
    line
}

/// One fenced block, records grouped by effective date (unknown last).
fn render_block<'a>(
    out: &mut String,
    header: &str,
    records: impl Iterator<Item = (&'a SplitRecord, ActionCategory)>,
    prices: &BTreeMap<String, f64>,
    emoji: &str,
) {
    let mut by_date: BTreeMap<EffectiveDate, Vec<String>> = BTreeMap::new();
    for (record, category) in records {
        let price = prices.get(&record.symbol).copied();
        by_date
            .entry(record.effective_date)
            .or_default()
            .push(record_line(record, category, price, emoji));
    }
    if by_date.is_empty() {
        return;
    }

    out.push_str(header);
    out.push_str("\n```\n");
    for (date, lines) in by_date {
        for line in lines {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str(&format!("(Last day to buy: {})\n\n", last_day_to_buy(date)));
    }
    out.push_str("```\n\n");
}

/// Full message for a run: the three category sections for New records,
/// then previously sent entries that are still buyable.
pub fn render_run(outcome: &RunOutcome, today: NaiveDate, emoji: &str) -> String {
    if outcome.is_empty() {
        return format!("📊 **{} ({})**", NO_SPLITS_MESSAGE, today.format("%m-%d-%Y"));
    }

    let mut message = format!(
        "🚨 **Upcoming Reverse Splits {}** 🚨\n\n",
        today.format("%m-%d-%Y")
    );
    for category in ActionCategory::ALL {
        render_block(
            &mut message,
            &section_header(category),
            outcome
                .new
                .iter()
                .map(|r| (r, r.category()))
                .filter(|(_, c)| *c == category),
            &outcome.prices,
            emoji,
        );
    }
    render_block(
        &mut message,
        "📬 **Previously Sent (Still Buyable)** 📬",
        outcome.still_buyable.iter().map(|e| (&e.data, e.data.category())),
        &BTreeMap::new(),
        emoji,
    );
    message.trim_end().to_string()
}

/// Splits `text` into pieces of at most `max_chars` characters, preferring
/// line boundaries.
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
