//! Scan coordination: fans scoring work out across a bounded worker
//! pool, catches per-instrument failures at the worker boundary, and
//! folds completions into a deterministic ranked outcome.
//!
//! Instruments are independent units of work; the only cross-task
//! discipline is the fetch semaphore and the collection loop, so the
//! pipeline parallelizes fully. Ordering never depends on completion
//! order — the final sort alone decides it.

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{ScanConfiguration, UniverseSelection};
use crate::domain::entities::instrument::{normalize_symbol, InstrumentClass};
use crate::domain::entities::scan_result::{
    IndicatorSnapshot, ScanOutcome, ScanResult, SkippedInstrument,
};
use crate::domain::errors::{IndicatorError, InstrumentFailure, ProviderError, ScanError};
use crate::domain::repositories::market_data::MarketDataProvider;
use crate::domain::services::indicators::periodic_change_series;
use crate::domain::services::pattern::match_fluctuation_pattern;
use crate::domain::services::scoring::{build_snapshot, InstrumentScorer};

/// Progress event emitted while a scan runs.
///
/// Consumption is optional; a dropped or unconsumed receiver never
/// affects scan correctness.
#[derive(Debug, Clone)]
pub enum ScanProgress {
    Started { symbol: String },
    Evaluated { symbol: String, qualified: bool },
    Skipped { symbol: String, reason: String },
}

/// Runs the scan pipeline against an injected market data provider.
pub struct ScanCoordinator {
    provider: Arc<dyn MarketDataProvider>,
    config: ScanConfiguration,
    progress: Option<UnboundedSender<ScanProgress>>,
}

impl ScanCoordinator {
    /// Validates the configuration up front; an invalid configuration
    /// is the caller's error, never a per-instrument skip.
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        config: ScanConfiguration,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        Ok(ScanCoordinator {
            provider,
            config,
            progress: None,
        })
    }

    /// Attach a progress event stream for verbose reporting.
    pub fn with_progress(mut self, sender: UnboundedSender<ScanProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &ScanConfiguration {
        &self.config
    }

    /// Fetch the configured universe, union it with the manual symbols,
    /// and scan the combined list.
    pub async fn run_scan(&self) -> Result<ScanOutcome, ScanError> {
        let universe = self.fetch_universe().await;
        info!(
            universe_size = universe.len(),
            manual = self.config.manual_symbols.len(),
            criterion = ?self.config.criterion,
            "Starting scan"
        );
        self.scan(universe).await
    }

    /// A universe fetch failure degrades to whatever the other class
    /// returned; partial universes are tolerated by contract.
    async fn fetch_universe(&self) -> Vec<String> {
        let classes = match self.config.instrument_class {
            InstrumentClass::Both => vec![InstrumentClass::Crypto, InstrumentClass::Equity],
            class => vec![class],
        };

        let mut universe = Vec::new();
        for class in classes {
            match self.provider.fetch_universe(class).await {
                Ok(symbols) => {
                    debug!(provider = self.provider.name(), ?class, count = symbols.len(), "Fetched universe");
                    universe.extend(symbols);
                }
                Err(err) => warn!(
                    provider = self.provider.name(),
                    ?class,
                    %err,
                    "Universe fetch failed; continuing with what is available"
                ),
            }
        }
        universe
    }

    /// Scan an explicit identifier list.
    ///
    /// Identifiers are case-normalized and deduplicated, unioned with
    /// the manual symbols, capped per the configured selection, and
    /// dispatched to the worker pool. The outcome is ranked score
    /// descending with ties broken by symbol ascending, so identical
    /// inputs always produce identical output.
    pub async fn scan(&self, instrument_ids: Vec<String>) -> Result<ScanOutcome, ScanError> {
        let work_list = self.build_work_list(instrument_ids);
        let attempted = work_list.len();
        if attempted == 0 {
            info!("Nothing to scan");
            return Ok(ScanOutcome::default());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_fetches));
        let mut tasks = JoinSet::new();
        for symbol in work_list {
            let provider = Arc::clone(&self.provider);
            let config = self.config.clone();
            let semaphore = Arc::clone(&semaphore);
            let progress = self.progress.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (
                        symbol,
                        Err(InstrumentFailure::Provider(ProviderError::Unavailable(
                            "scan cancelled".to_string(),
                        ))),
                    );
                };
                emit(&progress, ScanProgress::Started {
                    symbol: symbol.clone(),
                });
                let outcome = evaluate_instrument(provider.as_ref(), &config, &symbol).await;
                (symbol, outcome)
            });
        }

        let deadline = self.config.scan_timeout.map(|timeout| Instant::now() + timeout);
        let mut results: Vec<ScanResult> = Vec::new();
        let mut skipped: Vec<SkippedInstrument> = Vec::new();
        let mut evaluated = 0usize;

        loop {
            let joined = match deadline {
                Some(deadline) => tokio::select! {
                    joined = tasks.join_next() => joined,
                    _ = tokio::time::sleep_until(deadline) => {
                        warn!(
                            completed = evaluated + skipped.len(),
                            remaining = tasks.len(),
                            "Scan deadline reached; discarding in-flight work"
                        );
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };
            let Some(joined) = joined else { break };

            match joined {
                Ok((symbol, Ok(Some(result)))) => {
                    evaluated += 1;
                    debug!(symbol = %symbol, score = result.score, "Instrument qualified");
                    emit(&self.progress, ScanProgress::Evaluated {
                        symbol,
                        qualified: true,
                    });
                    results.push(result);
                }
                Ok((symbol, Ok(None))) => {
                    evaluated += 1;
                    debug!(symbol = %symbol, "Evaluated, did not qualify");
                    emit(&self.progress, ScanProgress::Evaluated {
                        symbol,
                        qualified: false,
                    });
                }
                Ok((symbol, Err(reason))) => {
                    warn!(symbol = %symbol, %reason, "Instrument skipped");
                    emit(&self.progress, ScanProgress::Skipped {
                        symbol: symbol.clone(),
                        reason: reason.to_string(),
                    });
                    skipped.push(SkippedInstrument { symbol, reason });
                }
                Err(join_error) if join_error.is_cancelled() => {}
                Err(join_error) => error!(%join_error, "Scan worker failed"),
            }
        }

        if evaluated == 0 {
            return Err(ScanError::ScanExhausted { attempted });
        }

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        if let Some(max_results) = self.config.max_results {
            results.truncate(max_results);
        }
        skipped.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        info!(
            qualified = results.len(),
            skipped = skipped.len(),
            evaluated,
            "Scan complete"
        );
        Ok(ScanOutcome { results, skipped })
    }

    /// Direct single-symbol analysis outside the scan pipeline.
    pub async fn analyze_single_instrument(
        &self,
        symbol: &str,
    ) -> Result<IndicatorSnapshot, InstrumentFailure> {
        let normalized = normalize_symbol(symbol);
        let series = self
            .provider
            .fetch_history(&normalized, self.config.lookback_periods, self.config.granularity)
            .await?;
        Ok(build_snapshot(&series, &self.config)?)
    }

    /// Manual symbols first (exempt from the cap), then the capped
    /// universe portion. First occurrence of a normalized identifier
    /// wins.
    fn build_work_list(&self, instrument_ids: Vec<String>) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut work_list: Vec<String> = Vec::new();

        for symbol in &self.config.manual_symbols {
            let normalized = normalize_symbol(symbol);
            if !normalized.is_empty() && seen.insert(normalized.clone()) {
                work_list.push(normalized);
            }
        }

        let mut universe: Vec<String> = Vec::new();
        for symbol in instrument_ids {
            let normalized = normalize_symbol(&symbol);
            if !normalized.is_empty() && seen.insert(normalized.clone()) {
                universe.push(normalized);
            }
        }

        if let Some(cap) = self.config.max_instruments {
            if universe.len() > cap {
                match self.config.selection {
                    UniverseSelection::Truncate => {
                        debug!(
                            dropped = universe.len() - cap,
                            "Truncating universe to the configured cap"
                        );
                        universe.truncate(cap);
                    }
                    UniverseSelection::Sample { seed } => {
                        debug!(
                            dropped = universe.len() - cap,
                            seed, "Sampling universe down to the configured cap"
                        );
                        let mut rng = StdRng::seed_from_u64(seed);
                        universe.shuffle(&mut rng);
                        universe.truncate(cap);
                    }
                }
            }
        }

        work_list.extend(universe);
        work_list
    }
}

/// One instrument's fetch → indicators → scoring pipeline, owned end to
/// end by a single worker. Every failure is returned, not raised, so the
/// coordinator can record it and move on.
async fn evaluate_instrument(
    provider: &dyn MarketDataProvider,
    config: &ScanConfiguration,
    symbol: &str,
) -> Result<Option<ScanResult>, InstrumentFailure> {
    let series = provider
        .fetch_history(symbol, config.lookback_periods, config.granularity)
        .await?;
    let snapshot = build_snapshot(&series, config)?;

    let changes = match periodic_change_series(&series, config.granularity) {
        Ok(changes) => changes,
        // Too little history for even one change: the matcher treats
        // that as an ordinary non-match.
        Err(IndicatorError::InsufficientHistory { .. }) => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let fluctuation = match_fluctuation_pattern(
        &changes,
        config.min_fluctuation_pct,
        config.max_fluctuation_pct,
        config.consecutive_periods,
    );

    let scorer = InstrumentScorer::from_config(config);
    Ok(scorer
        .score(&snapshot, &fluctuation)
        .map(|score| ScanResult {
            symbol: symbol.to_string(),
            snapshot,
            fluctuation,
            score,
        }))
}

fn emit(progress: &Option<UnboundedSender<ScanProgress>>, event: ScanProgress) {
    if let Some(sender) = progress {
        // Receiver may already be gone; progress is best-effort.
        let _ = sender.send(event);
    }
}
