//! Concurrent scan across all configured exchanges.
//!
//! Every exchange is fetched in its own task under a per-exchange timeout,
//! with an overall deadline for the whole fan-out. A slow or failing exchange
//! only removes its own data from the scan.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::aggregator::aggregate;
use super::ranker::{filter_and_rank, top_n, Thresholds};
use super::spread::{compute, Opportunity};
use crate::config::Config;
use crate::exchange::{build_http_client, FundingRecord, FundingSource, RestAdapter};

/// How one exchange's fetch ended.
#[derive(Debug, Clone)]
pub enum FetchStatus {
    Ok { records: usize },
    Failed(String),
    TimedOut,
    /// Still pending when the scan deadline passed.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub exchange_id: String,
    pub status: FetchStatus,
    pub elapsed: Duration,
}

impl ExchangeOutcome {
    /// The exchange returned at least one usable record.
    pub fn has_data(&self) -> bool {
        matches!(self.status, FetchStatus::Ok { records } if records > 0)
    }
}

/// Everything one scan produced.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    /// One entry per exchange, in configuration order
    pub exchanges: Vec<ExchangeOutcome>,
    /// Symbols listed on two or more responding exchanges
    pub symbols_compared: usize,
    /// Opportunities before filtering
    pub candidates: usize,
    /// Filtered and ranked, best first
    pub opportunities: Vec<Opportunity>,
}

impl ScanReport {
    /// No exchange returned usable data.
    pub fn is_total_failure(&self) -> bool {
        !self.exchanges.iter().any(ExchangeOutcome::has_data)
    }

    pub fn succeeded(&self) -> usize {
        self.exchanges.iter().filter(|e| e.has_data()).count()
    }

    pub fn failed(&self) -> usize {
        self.exchanges.len() - self.succeeded()
    }

    /// The best `n` opportunities.
    pub fn top(&self, n: usize) -> &[Opportunity] {
        top_n(&self.opportunities, n)
    }
}

/// Knobs the scanner needs from [`Config`].
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub thresholds: Thresholds,
    pub adapter_timeout: Duration,
    pub scan_timeout: Duration,
    pub max_concurrency: usize,
}

impl ScanSettings {
    pub fn from_config(config: &Config, sources: usize) -> Self {
        Self {
            thresholds: Thresholds {
                spread: config.thresholds.spread_threshold,
                volume: config.thresholds.volume_threshold,
            },
            adapter_timeout: config.adapter_timeout(),
            scan_timeout: config.scan_timeout(),
            max_concurrency: config.scan.max_concurrency.unwrap_or(sources).max(1),
        }
    }
}

/// Scans a set of funding sources and ranks cross-exchange spreads.
pub struct Scanner {
    sources: Vec<Arc<dyn FundingSource>>,
    settings: ScanSettings,
}

impl Scanner {
    pub fn new(sources: Vec<Arc<dyn FundingSource>>, settings: ScanSettings) -> Self {
        Self { sources, settings }
    }

    /// One [`RestAdapter`] per enabled exchange, sharing a single HTTP client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = build_http_client(config.adapter_timeout())?;
        let sources: Vec<Arc<dyn FundingSource>> = config
            .enabled_exchanges()
            .into_iter()
            .map(|descriptor| {
                Arc::new(RestAdapter::with_client(descriptor.clone(), http.clone()))
                    as Arc<dyn FundingSource>
            })
            .collect();
        let settings = ScanSettings::from_config(config, sources.len());
        Ok(Self::new(sources, settings))
    }

    /// Run one full scan: fetch, aggregate, compute spreads, filter and rank.
    #[instrument(skip(self), fields(exchanges = self.sources.len()))]
    pub async fn run(&self) -> ScanReport {
        let started_at = Utc::now();
        let (exchanges, batches) = self.fetch_all().await;

        let book = aggregate(batches);
        let candidates = compute(&book, Utc::now());
        let candidate_count = candidates.len();
        let opportunities = filter_and_rank(candidates, &self.settings.thresholds);

        let report = ScanReport {
            started_at,
            exchanges,
            symbols_compared: book.len(),
            candidates: candidate_count,
            opportunities,
        };

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            symbols_compared = report.symbols_compared,
            opportunities = report.opportunities.len(),
            "Scan complete"
        );

        report
    }

    /// Fetch every source concurrently.
    ///
    /// Returns one outcome per source plus the record lists of the sources
    /// that answered in time, both in source order.
    pub async fn fetch_all(&self) -> (Vec<ExchangeOutcome>, Vec<Vec<FundingRecord>>) {
        let deadline = Instant::now() + self.settings.scan_timeout;
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency));
        let adapter_timeout = self.settings.adapter_timeout;

        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let exchange_id = source.id().to_string();
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        let outcome = ExchangeOutcome {
                            exchange_id,
                            status: FetchStatus::Failed(e.to_string()),
                            elapsed: Duration::ZERO,
                        };
                        return (index, outcome, None);
                    }
                };

                let start = Instant::now();
                let result = tokio::time::timeout(adapter_timeout, source.fetch()).await;
                let elapsed = start.elapsed();

                let (status, records) = match result {
                    Ok(Ok(records)) => {
                        debug!(exchange = %exchange_id, records = records.len(), ?elapsed, "Fetched");
                        (FetchStatus::Ok { records: records.len() }, Some(records))
                    }
                    Ok(Err(e)) => {
                        warn!(exchange = %exchange_id, error = %e, "Exchange fetch failed");
                        (FetchStatus::Failed(e.to_string()), None)
                    }
                    Err(_) => {
                        warn!(exchange = %exchange_id, timeout = ?adapter_timeout, "Exchange fetch timed out");
                        (FetchStatus::TimedOut, None)
                    }
                };

                let outcome = ExchangeOutcome {
                    exchange_id,
                    status,
                    elapsed,
                };
                (index, outcome, records)
            });
        }

        let mut slots: Vec<Option<ExchangeOutcome>> = vec![None; self.sources.len()];
        let mut batches: Vec<Option<Vec<FundingRecord>>> = vec![None; self.sources.len()];
        let mut deadline_hit = false;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, outcome, records)))) => {
                    slots[index] = Some(outcome);
                    batches[index] = records;
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "Exchange task panicked");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        pending = tasks.len(),
                        timeout = ?self.settings.scan_timeout,
                        "Scan deadline reached, cancelling pending exchanges"
                    );
                    tasks.abort_all();
                    deadline_hit = true;
                    break;
                }
            }
        }

        let outcomes = slots
            .into_iter()
            .zip(&self.sources)
            .map(|(slot, source)| {
                slot.unwrap_or_else(|| ExchangeOutcome {
                    exchange_id: source.id().to_string(),
                    status: if deadline_hit {
                        FetchStatus::Cancelled
                    } else {
                        FetchStatus::Failed("task panicked".to_string())
                    },
                    elapsed: if deadline_hit { self.settings.scan_timeout } else { Duration::ZERO },
                })
            })
            .collect();

        (outcomes, batches.into_iter().flatten().collect())
    }
}
