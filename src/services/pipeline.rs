//! One complete discovery pass, from source fetch to notification.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::data::ledger::{LedgerEntry, SentLedger};
use crate::data::report::write_report;
use crate::error::PipelineError;
use crate::llm::{LLMClient, ResearchApi};
use crate::notify::{DispatchSummary, Dispatcher};
use crate::quotes::{apply_quotes, fetch_quotes, HttpQuoteSource, QuoteSource};
use crate::services::classifier::FractionalClassifier;
use crate::services::orchestrator::{known_date_for, partition, RunOutcome};
use crate::sources::{build_sources, collect_all, SourceAdapter};
use crate::split::{dedup, normalize_batch, EffectiveDate, FractionalHandling, SplitRecord};

#[derive(Debug)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub fetched: usize,
    pub normalized: usize,
    pub outcome: RunOutcome,
    pub dispatch: DispatchSummary,
}

pub struct Pipeline {
    sources: Vec<Box<dyn SourceAdapter>>,
    classifier: FractionalClassifier,
    dispatcher: Dispatcher,
    quotes: Option<Box<dyn QuoteSource>>,
    ledger_path: PathBuf,
    report_path: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        sources: Vec<Box<dyn SourceAdapter>>,
        classifier: FractionalClassifier,
        dispatcher: Dispatcher,
        ledger_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sources,
            classifier,
            dispatcher,
            quotes: None,
            ledger_path: ledger_path.into(),
            report_path: None,
        }
    }

    pub fn with_report(mut self, report_path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(report_path.into());
        self
    }

    pub fn with_quotes(mut self, quotes: Box<dyn QuoteSource>) -> Self {
        self.quotes = Some(quotes);
        self
    }

    pub fn from_config(config: &AppConfig, dry_run: bool) -> Result<Self, PipelineError> {
        config.validate()?;
        let research: Option<Arc<dyn ResearchApi>> = match &config.llm.api_key {
            Some(api_key) => {
                info!("Using LLM Model: {}", config.llm.model);
                let client = LLMClient::new(
                    api_key.clone(),
                    config.llm.base_url.clone(),
                    config.llm.model.clone(),
                );
                Some(Arc::new(client) as Arc<dyn ResearchApi>)
            }
            None => {
                warn!("⚠️ No GEMINI_API_KEY / LLM_API_KEY set, fractional research disabled");
                None
            }
        };

        let mut pipeline = Self::new(
            build_sources(&config.sources),
            FractionalClassifier::new(research, config.classifier_config()),
            Dispatcher::from_config(&config.notify, dry_run)?,
            config.ledger.path.clone(),
        )
        .with_report(config.ledger.report_path.clone());

        if let Some(quote) = &config.quotes {
            match HttpQuoteSource::new(quote.name.clone(), quote.url.clone()) {
                Ok(source) => pipeline = pipeline.with_quotes(Box::new(source)),
                Err(e) => warn!("⚠️ [QUOTES] Cannot build {}, prices disabled: {}", quote.name, e),
            }
        }
        Ok(pipeline)
    }

    /// Runs one pass. Any ledger failure aborts before dispatch.
    pub async fn run(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", run_id = %run_id, today = %today);
        self.run_inner(run_id, today, now).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, PipelineError> {
        info!("🔄 [PIPELINE] Starting run for {}", today);
        let mut ledger = SentLedger::open(&self.ledger_path)?;

        let raw = collect_all(&self.sources).await;
        let fetched = raw.len();
        let mut records = normalize_batch(&raw);
        let normalized = records.len();
        info!(
            "🔄 [PIPELINE] {} raw record(s) -> {} reverse split(s)",
            fetched, normalized
        );

        reuse_classifications(&mut records, &ledger);
        let records = dedup(self.classifier.classify_all(records).await);
        let (records, prices) = self.price_unsent(records, &ledger).await;

        let mut outcome = partition(records, &mut ledger, today, now)?;
        let new_symbols: HashSet<&str> = outcome.new.iter().map(|r| r.symbol.as_str()).collect();
        let priced: BTreeMap<String, f64> = prices
            .into_iter()
            .filter(|(symbol, _)| new_symbols.contains(symbol.as_str()))
            .collect();
        outcome.prices = priced;

        if let Some(path) = &self.report_path {
            if let Err(e) = write_report(&ledger, today, path) {
                warn!("⚠️ [PIPELINE] Could not write report {}: {}", path.display(), e);
            }
        }

        let dispatch = self.dispatcher.dispatch(&outcome, today).await;
        info!("✅ [PIPELINE] Run complete");

        Ok(RunSummary {
            run_id,
            fetched,
            normalized,
            outcome,
            dispatch,
        })
    }

    /// Quotes records not yet in the ledger. OTC listings are dropped; without
    /// a quote source every record passes through unpriced.
    async fn price_unsent(
        &self,
        records: Vec<SplitRecord>,
        ledger: &SentLedger,
    ) -> (Vec<SplitRecord>, BTreeMap<String, f64>) {
        let Some(source) = self.quotes.as_deref() else {
            return (records, BTreeMap::new());
        };
        let mut symbols: Vec<String> = records
            .iter()
            .filter(|r| stored_entry(ledger, r).is_none())
            .map(|r| r.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        if symbols.is_empty() {
            return (records, BTreeMap::new());
        }
        let found = fetch_quotes(source, &symbols).await;
        apply_quotes(records, &found)
    }
}

/// The ledger entry a record refreshes: its own key, the undated key of a
/// split that has since gained a date, or for a dateless record the earliest
/// dated entry of the symbol.
fn stored_entry<'a>(ledger: &'a SentLedger, record: &SplitRecord) -> Option<&'a LedgerEntry> {
    let key = record.key();
    ledger.lookup(&key).or_else(|| match key.effective_date {
        EffectiveDate::Known(_) => ledger.lookup(&key.with_unknown_date()),
        EffectiveDate::Unknown => known_date_for(ledger, &key.symbol, &HashSet::new())
            .and_then(|known| ledger.lookup(&known)),
    })
}

/// Adopts a resolved classification already stored for the same split so it
/// is not researched again.
pub fn reuse_classifications(records: &mut [SplitRecord], ledger: &SentLedger) {
    for record in records.iter_mut() {
        let key = record.key();
        let Some(stored) = stored_entry(ledger, record).map(|entry| &entry.data) else {
            continue;
        };

        let stored_is_better = !record.fractional_handling.is_resolved()
            || (record.fractional_handling == FractionalHandling::ThresholdRoundUp
                && record.threshold_minimum_shares.is_none()
                && stored.fractional_handling == FractionalHandling::ThresholdRoundUp);
        if stored_is_better && stored.fractional_handling.is_resolved() {
            record.set_fractional_handling(stored.fractional_handling);
            record.set_threshold(stored.threshold_minimum_shares, stored.threshold_explanation.clone());
            info!(
                "♻️ [PIPELINE] {} reuses stored classification {}",
                key, record.fractional_handling
            );
        }
        if record.company.is_empty() && !stored.company.is_empty() {
            record.company = stored.company.clone();
        }
        if record.article_link.is_none() {
            record.article_link = stored.article_link.clone();
        }
    }
}
