//! Unit tests for the canonical split types and their wire format.

#[cfg(test)]
mod types_tests {
    use crate::split::types::*;
    use crate::split::ActionCategory;
    use chrono::NaiveDate;

    fn sample() -> SplitRecord {
        SplitRecord {
            symbol: "ABCD".to_string(),
            company: "Alpha Corp".to_string(),
            ratio: SplitRatio::new(20, 1),
            effective_date: EffectiveDate::Known(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()),
            is_reverse: true,
            fractional_handling: FractionalHandling::Unknown,
            threshold_minimum_shares: None,
            threshold_explanation: None,
            source: "A".to_string(),
            article_link: None,
        }
    }

    // ============= DedupKey Tests =============

    #[test]
    fn test_dedup_key_format() {
        assert_eq!(sample().key().to_string(), "ABCD|2025-09-01");

        let mut unknown = sample();
        unknown.effective_date = EffectiveDate::Unknown;
        assert_eq!(unknown.key().to_string(), "ABCD|unknown");
    }

    #[test]
    fn test_dedup_key_parse_normalizes_symbol() {
        let key: DedupKey = "abcd|2025-09-01".parse().unwrap();
        assert_eq!(key, sample().key());
        assert!("|2025-09-01".parse::<DedupKey>().is_err());
        assert!("ABCD".parse::<DedupKey>().is_err());
        assert!("ABCD|next week".parse::<DedupKey>().is_err());
    }

    #[test]
    fn test_unknown_date_sorts_last() {
        let known = EffectiveDate::Known(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert!(known < EffectiveDate::Unknown);
    }

    // ============= FractionalHandling Tests =============

    #[test]
    fn test_fractional_handling_tokens() {
        assert_eq!("ROUND_UP".parse::<FractionalHandling>().unwrap(), FractionalHandling::RoundUp);
        assert_eq!(
            "threshold round_up".parse::<FractionalHandling>().unwrap(),
            FractionalHandling::ThresholdRoundUp
        );
        assert_eq!("\"CASH_IN_LIEU\"".parse::<FractionalHandling>().unwrap(), FractionalHandling::CashInLieu);
        assert_eq!("NO_INFO".parse::<FractionalHandling>().unwrap(), FractionalHandling::Unknown);
        assert!("maybe".parse::<FractionalHandling>().is_err());
    }

    #[test]
    fn test_threshold_only_kept_for_threshold_handling() {
        let mut record = sample();
        record.set_fractional_handling(FractionalHandling::ThresholdRoundUp);
        record.set_threshold(Some(100), Some("Holders of 100+ shares round up".to_string()));
        assert_eq!(record.threshold_minimum_shares, Some(100));
        assert_eq!(record.category(), ActionCategory::BuyThresholdShares);

        record.set_fractional_handling(FractionalHandling::CashInLieu);
        assert_eq!(record.threshold_minimum_shares, None);
        assert_eq!(record.threshold_explanation, None);

        record.set_threshold(Some(50), None);
        assert_eq!(record.threshold_minimum_shares, None);
    }

    #[test]
    fn test_zero_threshold_is_unset() {
        let mut record = sample();
        record.set_fractional_handling(FractionalHandling::ThresholdRoundUp);
        record.set_threshold(Some(0), None);
        assert_eq!(record.threshold_minimum_shares, None);
        assert_eq!(record.category(), ActionCategory::CheckRounding);
    }

    // ============= Serialization Tests =============

    #[test]
    fn test_split_record_wire_format() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["symbol"], "ABCD");
        assert_eq!(json["ratio"], "20->1");
        assert_eq!(json["effective_date"], "2025-09-01");
        assert_eq!(json["fractional_handling"], "UNKNOWN");
        assert_eq!(json["is_reverse"], true);
        assert!(json.get("threshold_minimum_shares").is_none());
    }

    #[test]
    fn test_split_record_rejects_bad_ratio() {
        let json = r#"{"symbol":"ABCD","ratio":"banana","effective_date":"unknown","is_reverse":true,"source":"A"}"#;
        assert!(serde_json::from_str::<SplitRecord>(json).is_err());
    }

    // ============= RawSplitRecord Tests =============

    #[test]
    fn test_raw_record_aliases() {
        let json = r#"{
            "ticker": "wxyz",
            "company_name": "Omega Inc",
            "split_ratio": "1:10",
            "date": "09/15/2025",
            "fractional_shares": "Rounded up to nearest whole share",
            "url": ["", "https://example.com/pr"]
        }"#;
        let raw: RawSplitRecord = serde_json::from_str(json).unwrap();
        assert_eq!(raw.symbol, "wxyz");
        assert_eq!(raw.company.as_deref(), Some("Omega Inc"));
        assert_eq!(raw.ratio, "1:10");
        assert_eq!(raw.effective_date.as_deref(), Some("09/15/2025"));
        assert_eq!(raw.article_link.as_deref(), Some("https://example.com/pr"));
        assert_eq!(raw.is_reverse, None);
        assert!(raw.source.is_empty());
    }

    #[test]
    fn test_raw_record_single_link() {
        let json = r#"{"symbol": "ABCD", "ratio": "1-for-20", "article_link": "https://example.com/a"}"#;
        let raw: RawSplitRecord = serde_json::from_str(json).unwrap();
        assert_eq!(raw.article_link.as_deref(), Some("https://example.com/a"));
        assert_eq!(raw.effective_date, None);
    }
}
