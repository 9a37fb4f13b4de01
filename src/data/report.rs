//! Human-readable listing of still-buyable ledger entries. Derived from the
//! ledger and regenerated after every run; never read back.

use std::path::Path;

use chrono::NaiveDate;

use crate::error::LedgerError;

use super::ledger::{still_buyable, write_atomic, SentLedger};

pub fn render_still_buyable(ledger: &SentLedger, today: NaiveDate) -> String {
    let mut entries: Vec<_> = ledger
        .all_entries()
        .filter(|e| still_buyable(e, today))
        .collect();
    entries.sort_by(|a, b| {
        (a.data.effective_date, &a.data.symbol).cmp(&(b.data.effective_date, &b.data.symbol))
    });

    let mut out = String::from("Previously Sent (Still Buyable)\n===============================\n\n");
    if entries.is_empty() {
        out.push_str("(none)\n");
    }
    for entry in entries {
        out.push_str(&format!(
            "{}  {}  effective: {}  first_sent: {}\n",
            entry.data.symbol,
            entry.data.ratio,
            entry.data.effective_date,
            entry.first_sent.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    out
}

pub fn write_report(ledger: &SentLedger, today: NaiveDate, path: &Path) -> Result<(), LedgerError> {
    write_atomic(path, render_still_buyable(ledger, today).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::{EffectiveDate, FractionalHandling, SplitRatio, SplitRecord};
    use chrono::{TimeZone, Utc};

    fn rec(symbol: &str, date: EffectiveDate) -> SplitRecord {
        SplitRecord {
            symbol: symbol.to_string(),
            company: String::new(),
            ratio: SplitRatio::new(25, 1),
            effective_date: date,
            is_reverse: true,
            fractional_handling: FractionalHandling::RoundUp,
            threshold_minimum_shares: None,
            threshold_explanation: None,
            source: "test".to_string(),
            article_link: None,
        }
    }

    #[test]
    fn test_report_lists_only_still_buyable() {
        let today = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 8, 18, 14, 0, 0).unwrap();
        let mut ledger = SentLedger::in_memory();
        for r in [
            rec("OLD", EffectiveDate::Known(NaiveDate::from_ymd_opt(2025, 8, 19).unwrap())),
            rec("NEW", EffectiveDate::Known(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap())),
            rec("TBD", EffectiveDate::Unknown),
        ] {
            ledger.upsert(&r.key(), r.clone(), now).unwrap();
        }

        let text = render_still_buyable(&ledger, today);
        assert!(!text.contains("OLD"));
        assert!(text.contains("NEW  25->1  effective: 2025-09-01  first_sent: 2025-08-18 14:00:00"));
        assert!(text.contains("TBD  25->1  effective: unknown"));
        assert!(text.find("NEW").unwrap() < text.find("TBD").unwrap());
        // One line per entry
        assert_eq!(text.lines().filter(|l| l.contains("effective:")).count(), 2);
        assert!(text.ends_with("first_sent: 2025-08-18 14:00:00\n"));
    }

    #[test]
    fn test_report_empty() {
        let today = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
        let text = render_still_buyable(&SentLedger::in_memory(), today);
        assert!(text.ends_with("(none)\n"));
    }
}
