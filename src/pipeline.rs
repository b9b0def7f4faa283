//! Two-stage ingestion pipeline.
//!
//! One run walks every active city through:
//!
//! 1. enumerate: active city names go onto the fetch queue
//! 2. fetch: a fixed pool of fetch workers calls the upstream (through the
//!    retry policy, gated by the run's circuit breaker) and pushes reports
//!    onto the persist queue; the run waits for the fetch queue to drain
//! 3. persist: a fixed pool of persist workers writes reports to the store;
//!    the run waits for the persist queue to drain
//! 4. teardown: one stop sentinel per worker, then wait for both pools
//!
//! A report is put on the persist queue before its city is marked done on
//! the fetch queue, so once the fetch barrier clears every producible report
//! is already queued for persistence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::queue::{Job, WorkQueue};
use crate::{CircuitBreaker, RetryPolicy, WeatherReport, WeatherSource, WeatherStore};

// ---

pub const DEFAULT_FETCH_WORKERS: usize = 3;
pub const DEFAULT_PERSIST_WORKERS: usize = 5;

/// Pool sizes and per-run fetch parameters. Fixed for the life of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    // ---
    pub fetch_workers: usize,
    pub persist_workers: usize,
    pub lang: String,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fetch_workers: DEFAULT_FETCH_WORKERS,
            persist_workers: DEFAULT_PERSIST_WORKERS,
            lang: "en".to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Outcome counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    // ---
    pub cities: usize,
    pub fetched: usize,
    /// Cities that produced no report (not found, invalid data, breaker open).
    pub skipped: usize,
    pub saved: usize,
    pub persist_failures: usize,
    pub breaker_open: bool,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct RunStats {
    fetched: AtomicUsize,
    skipped: AtomicUsize,
    saved: AtomicUsize,
    persist_failures: AtomicUsize,
}

impl RunStats {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Fetch side of a run: source + retry policy + breaker.
#[derive(Clone)]
pub struct Fetcher {
    // ---
    source: Arc<dyn WeatherSource>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    lang: Arc<str>,
    shutdown: CancellationToken,
}

impl Fetcher {
    // ---
    pub fn new(
        source: Arc<dyn WeatherSource>,
        breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        lang: &str,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            breaker,
            retry,
            lang: Arc::from(lang),
            shutdown,
        }
    }

    /// Try to obtain a report for `city`.
    ///
    /// `None` covers every "no report this run" outcome: breaker already
    /// open, not found, invalid payload, exhausted retry cap, run cancelled
    /// while waiting out a rate limit, or a systemic error (which also opens
    /// the breaker).
    pub async fn fetch_report(&self, city: &str) -> Option<WeatherReport> {
        // ---
        if self.breaker.is_open() {
            debug!("Circuit breaker open, skipping '{}'", city);
            return None;
        }

        // The breaker is re-checked before every attempt, so a city waiting
        // out a rate limit stops once another worker trips it.
        let source = &self.source;
        let breaker = &self.breaker;
        let lang: &str = &self.lang;
        let result = self
            .retry
            .run(city, &self.shutdown, move || async move {
                if breaker.is_open() {
                    return Ok(None);
                }
                source.fetch(city, lang).await.map(Some)
            })
            .await
            .map(Option::flatten);

        match result {
            Ok(Some(report)) => Some(report),
            Ok(None) => {
                debug!("'{}' abandoned while waiting to retry", city);
                None
            }
            Err(e) => {
                if self.breaker.record(&e) {
                    error!(
                        "Circuit breaker opened while fetching '{}': {}. Skipping remaining cities.",
                        city, e
                    );
                } else {
                    warn!("No report for '{}': {}", city, e);
                }
                None
            }
        }
    }
}

pub struct IngestionPipeline {
    // ---
    fetcher: Fetcher,
    store: Arc<dyn WeatherStore>,
    breaker: Arc<CircuitBreaker>,
    settings: PipelineSettings,
    shutdown: CancellationToken,
}

impl IngestionPipeline {
    // ---
    /// Build a pipeline for a single run. Each pipeline owns a fresh,
    /// closed circuit breaker.
    pub fn new(
        source: Arc<dyn WeatherSource>,
        store: Arc<dyn WeatherStore>,
        settings: PipelineSettings,
    ) -> Self {
        // ---
        let breaker = Arc::new(CircuitBreaker::new());
        let shutdown = CancellationToken::new();
        let fetcher = Fetcher::new(
            source,
            Arc::clone(&breaker),
            settings.retry,
            &settings.lang,
            shutdown.clone(),
        );
        Self {
            fetcher,
            store,
            breaker,
            settings,
            shutdown,
        }
    }

    /// Cancel the run when `token` fires. Idle workers stop at once; a
    /// worker mid-call finishes its current city first, and a city waiting
    /// out a rate limit is abandoned.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.fetcher.shutdown = token.clone();
        self.shutdown = token;
        self
    }

    /// Run one full ingestion cycle over all active cities.
    #[tracing::instrument(name = "ingestion_run", skip_all)]
    pub async fn run(self) -> Result<RunSummary> {
        // ---
        ensure!(self.settings.fetch_workers > 0, "fetch pool needs at least one worker");
        ensure!(self.settings.persist_workers > 0, "persist pool needs at least one worker");

        let fetch_queue: WorkQueue<String> = WorkQueue::unbounded();
        let persist_queue: WorkQueue<WeatherReport> = WorkQueue::unbounded();
        let stats = Arc::new(RunStats::default());

        // Phase 1: enumerate
        let cities = self
            .store
            .list_active_cities()
            .await
            .context("Failed to enumerate active cities")?;
        for city in &cities {
            fetch_queue.put(city.clone()).await?;
        }
        info!("Enqueued {} active cities", cities.len());

        // Phase 2: fetch
        let fetch_pool = TaskTracker::new();
        for id in 0..self.settings.fetch_workers {
            fetch_pool.spawn(fetch_worker(
                id,
                self.fetcher.clone(),
                fetch_queue.clone(),
                persist_queue.clone(),
                Arc::clone(&stats),
                self.shutdown.clone(),
            ));
        }
        fetch_pool.close();

        let mut cancelled = !self.barrier(&fetch_queue, "fetch").await;

        // Phase 3: persist
        let persist_pool = TaskTracker::new();
        if !cancelled {
            for id in 0..self.settings.persist_workers {
                persist_pool.spawn(persist_worker(
                    id,
                    Arc::clone(&self.store),
                    persist_queue.clone(),
                    Arc::clone(&stats),
                    self.shutdown.clone(),
                ));
            }
            cancelled = !self.barrier(&persist_queue, "persist").await;
        }
        persist_pool.close();

        // Teardown
        fetch_queue.stop(self.settings.fetch_workers).await?;
        persist_queue.stop(self.settings.persist_workers).await?;
        fetch_pool.wait().await;
        persist_pool.wait().await;
        fetch_queue.close();
        persist_queue.close();

        let summary = RunSummary {
            cities: cities.len(),
            fetched: stats.fetched.load(Ordering::Relaxed),
            skipped: stats.skipped.load(Ordering::Relaxed),
            saved: stats.saved.load(Ordering::Relaxed),
            persist_failures: stats.persist_failures.load(Ordering::Relaxed),
            breaker_open: self.breaker.is_open(),
            cancelled,
        };

        if summary.breaker_open {
            warn!("Run finished with the circuit breaker open: {:?}", summary);
        } else {
            info!("Run finished: {:?}", summary);
        }
        Ok(summary)
    }

    /// Wait for `queue` to drain. Returns `false` if the run was cancelled first.
    async fn barrier<T>(&self, queue: &WorkQueue<T>, stage: &str) -> bool {
        // ---
        tokio::select! {
            _ = queue.join() => {
                debug!("{} queue drained", stage);
                true
            }
            _ = self.shutdown.cancelled() => {
                warn!("Run cancelled while waiting on the {} queue ({} pending)", stage, queue.pending());
                false
            }
        }
    }
}

async fn fetch_worker(
    id: usize,
    fetcher: Fetcher,
    fetch_queue: WorkQueue<String>,
    persist_queue: WorkQueue<WeatherReport>,
    stats: Arc<RunStats>,
    shutdown: CancellationToken,
) {
    // ---
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            job = fetch_queue.get() => job,
        };
        let city = match job {
            Some(Job::Work(city)) => city,
            Some(Job::Stop) | None => break,
        };

        debug!("fetch worker {} processing '{}'", id, city);
        match fetcher.fetch_report(&city).await {
            Some(report) => {
                RunStats::bump(&stats.fetched);
                if let Err(e) = persist_queue.put(report).await {
                    warn!("Dropping report for '{}': {}", city, e);
                }
            }
            None => RunStats::bump(&stats.skipped),
        }
        fetch_queue.task_done();
    }
    debug!("fetch worker {} stopped", id);
}

async fn persist_worker(
    id: usize,
    store: Arc<dyn WeatherStore>,
    persist_queue: WorkQueue<WeatherReport>,
    stats: Arc<RunStats>,
    shutdown: CancellationToken,
) {
    // ---
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            job = persist_queue.get() => job,
        };
        let report = match job {
            Some(Job::Work(report)) => report,
            Some(Job::Stop) | None => break,
        };

        match store.save_report(&report).await {
            Ok(()) => {
                debug!("persist worker {} saved '{}'", id, report.city);
                RunStats::bump(&stats.saved);
            }
            Err(e) => {
                // Failed writes are dropped; the next run will produce a fresh reading.
                error!("Failed to persist report for '{}': {:#}", report.city, e);
                RunStats::bump(&stats.persist_failures);
            }
        }
        persist_queue.task_done();
    }
    debug!("persist worker {} stopped", id);
}

/// Run a fresh pipeline every `interval` until `shutdown` fires.
///
/// `build` is called once per tick so every run starts with a closed breaker.
pub async fn run_periodically<F>(interval: Duration, shutdown: CancellationToken, build: F)
where
    F: Fn() -> IngestionPipeline,
{
    // ---
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let pipeline = build().with_shutdown(shutdown.clone());
        if let Err(e) = pipeline.run().await {
            error!("Ingestion run failed: {:#}", e);
        }
    }
    info!("Ingestion scheduler stopped");
}
