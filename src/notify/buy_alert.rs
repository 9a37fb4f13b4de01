//! Transactional buy alert for newly announced actionable splits.

use chrono::NaiveDate;

use crate::split::{ActionCategory, SplitRecord};

use super::render::last_day_to_buy;

/// Whether the alert may be acted on. A dry run is never `Live`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertMode {
    DryRun,
    Live,
}

impl AlertMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            AlertMode::DryRun
        } else {
            AlertMode::Live
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AlertMode::DryRun => "DRY RUN",
            AlertMode::Live => "LIVE",
        }
    }
}

/// Shares to buy for one record, if it is actionable at all.
pub fn order_quantity(record: &SplitRecord) -> Option<u32> {
    match record.category() {
        ActionCategory::BuyOneShare => Some(1),
        ActionCategory::BuyThresholdShares => record.threshold_minimum_shares,
        ActionCategory::CheckRounding => None,
    }
}

/// `None` when no new record is actionable.
pub fn render_buy_alert(new: &[SplitRecord], today: NaiveDate, mode: AlertMode) -> Option<String> {
    let orders: Vec<String> = new
        .iter()
        .filter_map(|record| {
            order_quantity(record).map(|qty| {
                format!(
                    "BUY {} x{} (ratio {}, effective {}, last day {})",
                    record.symbol,
                    qty,
                    record.ratio,
                    record.effective_date,
                    last_day_to_buy(record.effective_date)
                )
            })
        })
        .collect();
    if orders.is_empty() {
        return None;
    }

    Some(format!(
        "🛒 **Buy Alert [{}] {}** 🛒\n```\n{}\n```",
        mode.label(),
        today.format("%m-%d-%Y"),
        orders.join("\n")
    ))
}
