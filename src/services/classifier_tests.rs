//! Unit tests for the fractional-handling classifier retry state machine.

#[cfg(test)]
mod classifier_tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_openai::error::OpenAIError;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use crate::error::ResearchError;
    use crate::llm::ResearchApi;
    use crate::services::classifier::{ClassifierConfig, FractionalClassifier};
    use crate::split::{ActionCategory, EffectiveDate, FractionalHandling, SplitRatio, SplitRecord};

    /// Replays scripted responses in order; `None` simulates a transport failure.
    struct ScriptedResearch {
        responses: Mutex<VecDeque<Option<String>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedResearch {
        fn new(responses: &[Option<&str>]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().map(|r| r.map(str::to_string)).collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ResearchApi for ScriptedResearch {
        async fn research(&self, _system_prompt: &str, query: &str) -> Result<String, ResearchError> {
            self.calls.lock().unwrap().push(query.to_string());
            match self.responses.lock().unwrap().pop_front() {
                Some(Some(response)) => Ok(response),
                Some(None) => Err(ResearchError::Api(OpenAIError::InvalidArgument(
                    "connection reset".to_string(),
                ))),
                None => Err(ResearchError::EmptyResponse),
            }
        }
    }

    fn record(symbol: &str) -> SplitRecord {
        SplitRecord {
            symbol: symbol.to_string(),
            company: String::new(),
            ratio: SplitRatio::new(20, 1),
            effective_date: EffectiveDate::Known(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()),
            is_reverse: true,
            fractional_handling: FractionalHandling::Unknown,
            threshold_minimum_shares: None,
            threshold_explanation: None,
            source: "test".to_string(),
            article_link: None,
        }
    }

    fn classifier(research: Arc<ScriptedResearch>) -> FractionalClassifier {
        FractionalClassifier::new(
            Some(research as Arc<dyn ResearchApi>),
            ClassifierConfig::immediate(3),
        )
    }

    // ============= Backoff =============

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = ClassifierConfig {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(5),
            inter_record_delay: Duration::ZERO,
        };
        assert_eq!(config.backoff(1), Duration::from_secs(2));
        assert_eq!(config.backoff(2), Duration::from_secs(4));
        assert_eq!(config.backoff(3), Duration::from_secs(5));
        assert_eq!(config.backoff(40), Duration::from_secs(5));
    }

    // ============= Primary research =============

    #[tokio::test]
    async fn test_resolves_on_first_attempt() {
        let research = ScriptedResearch::new(&[Some(r#"{"fractional_handling": "ROUND_UP"}"#)]);
        let out = classifier(research.clone()).classify(record("ABCD")).await;

        assert_eq!(out.fractional_handling, FractionalHandling::RoundUp);
        assert_eq!(out.category(), ActionCategory::BuyOneShare);
        assert_eq!(research.call_count(), 1);
    }

    #[tokio::test]
    async fn test_retries_after_parse_and_transport_failures() {
        let research = ScriptedResearch::new(&[
            Some("I am not sure."),
            None,
            Some(r#"{"fractional_handling": "CASH_IN_LIEU"}"#),
        ]);
        let out = classifier(research.clone()).classify(record("ABCD")).await;

        assert_eq!(out.fractional_handling, FractionalHandling::CashInLieu);
        assert_eq!(research.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_yields_unknown() {
        let research = ScriptedResearch::new(&[Some("?"), Some("??"), Some("???"), Some("ROUND_UP")]);
        let out = classifier(research.clone()).classify(record("ABCD")).await;

        assert_eq!(out.fractional_handling, FractionalHandling::Unknown);
        assert_eq!(out.category(), ActionCategory::CheckRounding);
        // Never a fourth attempt
        assert_eq!(research.call_count(), 3);
    }

    #[tokio::test]
    async fn test_attempts_never_exceed_three() {
        let research = ScriptedResearch::new(&[None; 10]);
        let out = FractionalClassifier::new(
            Some(research.clone() as Arc<dyn ResearchApi>),
            ClassifierConfig::immediate(10),
        )
        .classify(record("ABCD"))
        .await;

        assert_eq!(out.fractional_handling, FractionalHandling::Unknown);
        assert_eq!(research.call_count(), 3);
    }

    #[tokio::test]
    async fn test_explicit_unknown_is_terminal() {
        let research = ScriptedResearch::new(&[Some("NO_INFO"), Some("ROUND_UP")]);
        let out = classifier(research.clone()).classify(record("ABCD")).await;

        assert_eq!(out.fractional_handling, FractionalHandling::Unknown);
        assert_eq!(research.call_count(), 1);
    }

    #[tokio::test]
    async fn test_finding_refines_ratio_and_fills_unknown_date() {
        let mut input = record("ABCD");
        input.effective_date = EffectiveDate::Unknown;
        let research = ScriptedResearch::new(&[Some(
            r#"{"fractional_handling": "ROUND_UP", "ratio": "1-for-25", "effective_date": "2025-09-03"}"#,
        )]);
        let out = classifier(research).classify(input).await;

        assert_eq!(out.ratio, SplitRatio::new(25, 1));
        assert_eq!(
            out.effective_date,
            EffectiveDate::Known(NaiveDate::from_ymd_opt(2025, 9, 3).unwrap())
        );
    }

    #[tokio::test]
    async fn test_finding_never_overrides_known_date_or_flips_direction() {
        let research = ScriptedResearch::new(&[Some(
            r#"{"fractional_handling": "ROUND_UP", "ratio": "2-for-1", "effective_date": "2025-10-01", "is_reverse": false}"#,
        )]);
        let out = classifier(research).classify(record("ABCD")).await;

        assert_eq!(out.ratio, SplitRatio::new(20, 1));
        assert_eq!(
            out.effective_date,
            EffectiveDate::Known(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap())
        );
        assert!(out.is_reverse);
    }

    #[tokio::test]
    async fn test_resolved_records_skip_research() {
        let research = ScriptedResearch::new(&[]);
        let mut input = record("ABCD");
        input.set_fractional_handling(FractionalHandling::RoundDown);
        let out = classifier(research.clone()).classify(input).await;

        assert_eq!(out.fractional_handling, FractionalHandling::RoundDown);
        assert_eq!(research.call_count(), 0);
    }

    // ============= Threshold research =============

    #[tokio::test]
    async fn test_threshold_resolves_minimum_shares() {
        let research = ScriptedResearch::new(&[
            Some(r#"{"fractional_handling": "THRESHOLD_ROUND_UP"}"#),
            Some(r#"{"threshold_minimum_shares": 100, "explanation": "100 shares or more round up"}"#),
        ]);
        let out = classifier(research.clone()).classify(record("ABCD")).await;

        assert_eq!(out.fractional_handling, FractionalHandling::ThresholdRoundUp);
        assert_eq!(out.threshold_minimum_shares, Some(100));
        assert_eq!(out.category(), ActionCategory::BuyThresholdShares);
        assert_eq!(research.call_count(), 2);
    }

    #[tokio::test]
    async fn test_threshold_exhaustion_keeps_category_without_count() {
        let research = ScriptedResearch::new(&[
            Some(r#"{"fractional_handling": "THRESHOLD_ROUND_UP"}"#),
            None,
            Some("no idea"),
            None,
        ]);
        let out = classifier(research.clone()).classify(record("ABCD")).await;

        assert_eq!(out.fractional_handling, FractionalHandling::ThresholdRoundUp);
        assert_eq!(out.threshold_minimum_shares, None);
        assert_eq!(out.category(), ActionCategory::CheckRounding);
        assert_eq!(research.call_count(), 4);
    }

    #[tokio::test]
    async fn test_partial_threshold_keeps_explanation() {
        let research = ScriptedResearch::new(&[
            Some(r#"{"fractional_handling": "THRESHOLD_ROUND_UP"}"#),
            Some(r#"{"threshold_minimum_shares": null, "explanation": "Depends on the broker"}"#),
        ]);
        let out = classifier(research.clone()).classify(record("ABCD")).await;

        assert_eq!(out.threshold_minimum_shares, None);
        assert_eq!(out.threshold_explanation.as_deref(), Some("Depends on the broker"));
        assert_eq!(out.category(), ActionCategory::CheckRounding);
        assert_eq!(research.call_count(), 2);
    }

    #[tokio::test]
    async fn test_source_threshold_hint_only_researches_count() {
        let research = ScriptedResearch::new(&[Some(r#"{"threshold_minimum_shares": 50}"#)]);
        let mut input = record("ABCD");
        input.set_fractional_handling(FractionalHandling::ThresholdRoundUp);
        let out = classifier(research.clone()).classify(input).await;

        assert_eq!(out.threshold_minimum_shares, Some(50));
        assert_eq!(research.call_count(), 1);
    }

    // ============= Degraded mode =============

    #[tokio::test]
    async fn test_no_credential_makes_no_calls() {
        let out = FractionalClassifier::disabled()
            .classify_all(vec![record("ABCD"), record("WXYZ")])
            .await;

        assert_eq!(out.len(), 2);
        for r in &out {
            assert_eq!(r.fractional_handling, FractionalHandling::Unknown);
            assert_eq!(r.category(), ActionCategory::CheckRounding);
        }
    }

    #[tokio::test]
    async fn test_classify_all_preserves_order() {
        let research = ScriptedResearch::new(&[
            Some("ROUND_UP"),
            Some("ROUND_DOWN"),
        ]);
        let out = classifier(research)
            .classify_all(vec![record("BBBB"), record("AAAA")])
            .await;

        assert_eq!(out[0].symbol, "BBBB");
        assert_eq!(out[0].fractional_handling, FractionalHandling::RoundUp);
        assert_eq!(out[1].symbol, "AAAA");
        assert_eq!(out[1].fractional_handling, FractionalHandling::RoundDown);
    }
}
