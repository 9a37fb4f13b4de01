//! Read-only query surface over the sent-ledger.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::split::SplitRecord;

use super::ledger::{still_buyable, SentLedger};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    StillBuyable,
    Expired,
}

/// All filters are conjunctive. Date filters never match an unknown date.
#[derive(Clone, Debug, Default)]
pub struct LedgerQuery {
    pub symbol: Option<String>,
    pub on: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<StatusFilter>,
}

#[derive(Clone, Debug, Serialize)]
pub struct QueryRow {
    pub key: String,
    pub data: SplitRecord,
    pub first_sent: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub still_buyable: bool,
}

#[derive(Tabled)]
struct TableRow {
    #[tabled(rename = "SYMBOL")]
    symbol: String,
    #[tabled(rename = "EFFECTIVE_DATE")]
    effective_date: String,
    #[tabled(rename = "RATIO")]
    ratio: String,
    #[tabled(rename = "FRACTIONAL")]
    fractional: String,
    #[tabled(rename = "FIRST_SENT")]
    first_sent: String,
    #[tabled(rename = "LAST_SEEN")]
    last_seen: String,
    #[tabled(rename = "STATUS")]
    status: &'static str,
}

impl LedgerQuery {
    fn has_date_filter(&self) -> bool {
        self.on.is_some() || self.from.is_some() || self.to.is_some()
    }

    pub fn run(&self, ledger: &SentLedger, today: NaiveDate) -> Vec<QueryRow> {
        ledger
            .keyed_entries()
            .filter_map(|(key, entry)| {
                let data = &entry.data;
                if let Some(symbol) = &self.symbol {
                    if !data.symbol.eq_ignore_ascii_case(symbol.trim()) {
                        return None;
                    }
                }

                if self.has_date_filter() {
                    let date = data.effective_date.date()?;
                    if self.on.is_some_and(|on| date != on)
                        || self.from.is_some_and(|from| date < from)
                        || self.to.is_some_and(|to| date > to)
                    {
                        return None;
                    }
                }

                let buyable = still_buyable(entry, today);
                match self.status {
                    Some(StatusFilter::StillBuyable) if !buyable => return None,
                    Some(StatusFilter::Expired) if buyable => return None,
                    _ => {}
                }

                Some(QueryRow {
                    key: key.to_string(),
                    data: data.clone(),
                    first_sent: entry.first_sent,
                    last_seen: entry.last_seen,
                    still_buyable: buyable,
                })
            })
            .collect()
    }
}

pub fn render_table(rows: &[QueryRow]) -> String {
    if rows.is_empty() {
        return "(no results)".to_string();
    }
    let table_rows = rows.iter().map(|r| TableRow {
        symbol: r.data.symbol.clone(),
        effective_date: r.data.effective_date.to_string(),
        ratio: r.data.ratio.to_string(),
        fractional: r.data.fractional_handling.to_string(),
        first_sent: r.first_sent.format("%Y-%m-%d %H:%M:%S").to_string(),
        last_seen: r.last_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
        status: if r.still_buyable { "STILL" } else { "EXPIRED" },
    });
    Table::new(table_rows).to_string()
}

pub fn render_json(rows: &[QueryRow]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::{EffectiveDate, FractionalHandling, SplitRatio};
    use chrono::TimeZone;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ledger() -> SentLedger {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 14, 0, 0).unwrap();
        let mut ledger = SentLedger::in_memory();
        for (symbol, date) in [
            ("ABCD", EffectiveDate::Known(d("2025-08-19"))),
            ("WXYZ", EffectiveDate::Known(d("2025-09-01"))),
            ("MNOP", EffectiveDate::Known(d("2025-09-15"))),
            ("TBD", EffectiveDate::Unknown),
        ] {
            let rec = SplitRecord {
                symbol: symbol.to_string(),
                company: String::new(),
                ratio: SplitRatio::new(10, 1),
                effective_date: date,
                is_reverse: true,
                fractional_handling: FractionalHandling::RoundUp,
                threshold_minimum_shares: None,
                threshold_explanation: None,
                source: "test".to_string(),
                article_link: None,
            };
            ledger.upsert(&rec.key(), rec, now).unwrap();
        }
        ledger
    }

    fn symbols(rows: &[QueryRow]) -> Vec<&str> {
        rows.iter().map(|r| r.data.symbol.as_str()).collect()
    }

    #[test]
    fn test_query_all() {
        let rows = LedgerQuery::default().run(&ledger(), d("2025-08-20"));
        assert_eq!(symbols(&rows), vec!["ABCD", "MNOP", "TBD", "WXYZ"]);
    }

    #[test]
    fn test_query_symbol_case_insensitive() {
        let q = LedgerQuery {
            symbol: Some("wxyz".to_string()),
            ..Default::default()
        };
        assert_eq!(symbols(&q.run(&ledger(), d("2025-08-20"))), vec!["WXYZ"]);
    }

    #[test]
    fn test_query_exact_date_and_range() {
        let today = d("2025-08-20");
        let on = LedgerQuery {
            on: Some(d("2025-09-01")),
            ..Default::default()
        };
        assert_eq!(symbols(&on.run(&ledger(), today)), vec!["WXYZ"]);

        let range = LedgerQuery {
            from: Some(d("2025-08-01")),
            to: Some(d("2025-09-10")),
            ..Default::default()
        };
        assert_eq!(symbols(&range.run(&ledger(), today)), vec!["ABCD", "WXYZ"]);
    }

    #[test]
    fn test_query_status() {
        let today = d("2025-08-20");
        let still = LedgerQuery {
            status: Some(StatusFilter::StillBuyable),
            ..Default::default()
        };
        assert_eq!(symbols(&still.run(&ledger(), today)), vec!["MNOP", "TBD", "WXYZ"]);

        let expired = LedgerQuery {
            status: Some(StatusFilter::Expired),
            ..Default::default()
        };
        let rows = expired.run(&ledger(), today);
        assert_eq!(symbols(&rows), vec!["ABCD"]);
        assert!(!rows[0].still_buyable);
    }

    #[test]
    fn test_render_outputs() {
        let rows = LedgerQuery::default().run(&ledger(), d("2025-08-20"));
        let table = render_table(&rows);
        assert!(table.contains("EFFECTIVE_DATE"));
        assert!(table.contains("EXPIRED"));

        let json: serde_json::Value = serde_json::from_str(&render_json(&rows).unwrap()).unwrap();
        assert_eq!(json[0]["key"], "ABCD|2025-08-19");
        assert_eq!(json[0]["still_buyable"], false);
        assert_eq!(render_table(&[]), "(no results)");
    }
}
