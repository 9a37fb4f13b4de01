//! Fractional-handling classifier
//!
//! Each record walks a bounded research state machine:
//! `Pending -> Researching{1..=max_attempts} -> Resolved | Exhausted`.
//! Exhaustion is a value (`UNKNOWN`, or a missing threshold), never an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::agents::{ask, Agent, FractionalAgent, FractionalFinding, ThresholdAgent};
use crate::constants::{events, research};
use crate::error::ParseError;
use crate::llm::ResearchApi;
use crate::split::{EffectiveDate, FractionalHandling, SplitRecord};

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub inter_record_delay: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_attempts: research::MAX_ATTEMPTS,
            retry_delay: research::RETRY_BASE_DELAY,
            max_retry_delay: research::MAX_RETRY_DELAY,
            inter_record_delay: research::INTER_RECORD_DELAY,
        }
    }
}

impl ClassifierConfig {
    /// No sleeping between attempts or records.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            retry_delay: Duration::ZERO,
            max_retry_delay: Duration::ZERO,
            inter_record_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (1-based): doubles, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay.saturating_mul(factor).min(self.max_retry_delay)
    }
}

#[derive(Debug)]
enum ResearchState<T> {
    Pending,
    Researching { attempt: u32 },
    Resolved(T),
    Exhausted,
}

pub struct FractionalClassifier {
    research: Option<Arc<dyn ResearchApi>>,
    config: ClassifierConfig,
    fractional: FractionalAgent,
    threshold: ThresholdAgent,
}

impl FractionalClassifier {
    /// `max_attempts` is clamped to `1..=research::MAX_ATTEMPTS`.
    pub fn new(research: Option<Arc<dyn ResearchApi>>, mut config: ClassifierConfig) -> Self {
        config.max_attempts = config.max_attempts.clamp(1, research::MAX_ATTEMPTS);
        Self {
            research,
            config,
            fractional: FractionalAgent,
            threshold: ThresholdAgent,
        }
    }

    /// Degraded mode: no credential, no calls.
    pub fn disabled() -> Self {
        Self::new(None, ClassifierConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.research.is_some()
    }

    /// Classifies records in order, pausing between records that needed research.
    pub async fn classify_all(&self, records: Vec<SplitRecord>) -> Vec<SplitRecord> {
        if !self.is_enabled() {
            warn!(
                "🔍 [CLASSIFIER] No research credential configured, {} record(s) keep their source classification",
                records.len()
            );
        }

        let total = records.len();
        let mut classified = Vec::with_capacity(total);
        let mut researched_last = false;
        for record in records {
            if researched_last && self.needs_research(&record) && !self.config.inter_record_delay.is_zero() {
                sleep(self.config.inter_record_delay).await;
            }
            researched_last = self.needs_research(&record);
            classified.push(self.classify(record).await);
        }

        let unresolved = classified
            .iter()
            .filter(|r| !r.fractional_handling.is_resolved())
            .count();
        info!(
            "🔍 [CLASSIFIER] Classified {} record(s), {} unresolved",
            total, unresolved
        );
        classified
    }

    fn needs_research(&self, record: &SplitRecord) -> bool {
        self.is_enabled() && (!record.fractional_handling.is_resolved() || Self::missing_threshold(record))
    }

    fn missing_threshold(record: &SplitRecord) -> bool {
        record.fractional_handling == FractionalHandling::ThresholdRoundUp
            && record.threshold_minimum_shares.is_none()
    }

    /// Always terminates with a record; research failures only leave fields unresolved.
    pub async fn classify(&self, mut record: SplitRecord) -> SplitRecord {
        let Some(research) = self.research.as_deref() else {
            return record;
        };

        if !record.fractional_handling.is_resolved() {
            let query = self.fractional.query(&record);
            match self
                .research_with_retry(research, &self.fractional, &query, &record.symbol, |r| {
                    self.fractional.parse(r)
                })
                .await
            {
                Some(finding) => apply_finding(&mut record, finding),
                None => {
                    warn!(
                        event = events::CLASSIFICATION_EXHAUSTED,
                        "⚠️ [CLASSIFIER] {}: research exhausted, fractional handling stays UNKNOWN",
                        record.key()
                    );
                    record.set_fractional_handling(FractionalHandling::Unknown);
                }
            }
        } else {
            debug!(
                "🔍 [CLASSIFIER] {} already classified as {}",
                record.key(),
                record.fractional_handling
            );
        }

        if Self::missing_threshold(&record) {
            let query = self.threshold.query(&record);
            match self
                .research_with_retry(research, &self.threshold, &query, &record.symbol, |r| {
                    self.threshold.parse(r)
                })
                .await
            {
                Some(finding) => {
                    if !finding.is_complete() {
                        info!(
                            "🔍 [CLASSIFIER] {}: threshold explained without a share count",
                            record.key()
                        );
                    }
                    record.set_threshold(finding.minimum_shares, finding.explanation);
                }
                None => warn!(
                    event = events::CLASSIFICATION_EXHAUSTED,
                    "⚠️ [CLASSIFIER] {}: threshold research exhausted, minimum shares unknown",
                    record.key()
                ),
            }
        }

        record
    }

    async fn research_with_retry<T, F>(
        &self,
        research: &dyn ResearchApi,
        agent: &(dyn Agent + Sync),
        query: &str,
        symbol: &str,
        parse: F,
    ) -> Option<T>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        let mut state = ResearchState::Pending;
        loop {
            state = match state {
                ResearchState::Pending => ResearchState::Researching { attempt: 1 },
                ResearchState::Researching { attempt } => {
                    let outcome = match ask(agent, research, query).await {
                        Ok(response) => parse(&response).map_err(|e| e.to_string()),
                        Err(e) => Err(e.to_string()),
                    };
                    match outcome {
                        Ok(value) => ResearchState::Resolved(value),
                        Err(reason) if attempt >= self.config.max_attempts => {
                            warn!(
                                "⚠️ [CLASSIFIER] {} attempt {}/{} for {} failed: {}",
                                agent.name(),
                                attempt,
                                self.config.max_attempts,
                                symbol,
                                reason
                            );
                            ResearchState::Exhausted
                        }
                        Err(reason) => {
                            let delay = self.config.backoff(attempt);
                            warn!(
                                "⚠️ [CLASSIFIER] {} attempt {}/{} for {} failed: {} (retrying in {:?})",
                                agent.name(),
                                attempt,
                                self.config.max_attempts,
                                symbol,
                                reason,
                                delay
                            );
                            if !delay.is_zero() {
                                sleep(delay).await;
                            }
                            ResearchState::Researching { attempt: attempt + 1 }
                        }
                    }
                }
                ResearchState::Resolved(value) => return Some(value),
                ResearchState::Exhausted => return None,
            };
        }
    }
}

/// Research may refine the ratio and fill an unknown date, but never turns
/// the record into a forward split.
fn apply_finding(record: &mut SplitRecord, finding: FractionalFinding) {
    record.set_fractional_handling(finding.fractional_handling);

    if let Some(ratio) = finding.ratio.filter(|r| r.is_reverse()) {
        if ratio != record.ratio {
            info!("🔍 [CLASSIFIER] {}: ratio refined {} -> {}", record.symbol, record.ratio, ratio);
            record.ratio = ratio;
        }
    }

    if let Some(EffectiveDate::Known(date)) = finding.effective_date {
        if !record.effective_date.is_known() {
            info!("🔍 [CLASSIFIER] {}: effective date resolved to {}", record.symbol, date);
            record.effective_date = EffectiveDate::Known(date);
        }
    }

    if finding.is_reverse == Some(false) {
        debug!(
            "🔍 [CLASSIFIER] {}: research says not reverse, keeping parsed ratio {}",
            record.symbol, record.ratio
        );
    }
}
