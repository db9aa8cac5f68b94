//! Fixed-interval export scheduler
//!
//! The scheduler is built around an already-loaded [`ReferenceStore`], so it
//! can never tick against partial reference data. Once spawned it runs one
//! cycle immediately and then one per interval until shut down:
//!
//! 1. fetch a batch from the [`BatchSource`] (empty or unreachable: no output)
//! 2. join the batch against the reference tables
//! 3. write a report when at least one row was produced
//! 4. record elapsed time and outcome
//!
//! Cycles never overlap. Shutdown stops the timer and waits for an in-flight
//! cycle to finish.

use super::join::{join_batch, FailurePolicy, RequestFailure};
use super::report::ReportWriter;
use super::source::BatchSource;
use crate::code_index::CodeIndex;
use crate::error::ExportError;
use crate::reference::ReferenceStore;
use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Interval between cycles in the reference deployment
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(120);

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// How a cycle ended
#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing was queued
    Empty,
    /// The batch source could not be reached
    Unavailable(String),
    /// A batch was processed but produced no rows; no file written
    NoRows,
    /// A report was written
    Written(PathBuf),
    /// The join or report write failed
    Failed(String),
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Empty => write!(f, "queue empty"),
            CycleOutcome::Unavailable(reason) => write!(f, "source unavailable ({})", reason),
            CycleOutcome::NoRows => write!(f, "no rows"),
            CycleOutcome::Written(path) => write!(f, "wrote {}", path.display()),
            CycleOutcome::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Record of one cycle
#[derive(Debug)]
pub struct CycleReport {
    pub id: Uuid,
    pub started_at: NaiveDateTime,
    pub elapsed: Duration,
    pub requests: usize,
    pub rows: usize,
    pub failures: Vec<RequestFailure>,
    /// Requests left unprocessed because an earlier one failed
    pub skipped: usize,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    pub fn report_path(&self) -> Option<&PathBuf> {
        match &self.outcome {
            CycleOutcome::Written(path) => Some(path),
            _ => None,
        }
    }
}

/// Cumulative cycle counters
#[derive(Debug, Default)]
pub struct SchedulerStats {
    cycles: AtomicU64,
    empty: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    rows: AtomicU64,
    busy_micros: AtomicU64,
}

/// Point-in-time copy of [`SchedulerStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub empty: u64,
    pub written: u64,
    pub failed: u64,
    pub rows: u64,
    pub busy: Duration,
}

impl SchedulerStats {
    fn record(&self, report: &CycleReport) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.rows.fetch_add(report.rows as u64, Ordering::Relaxed);
        self.busy_micros
            .fetch_add(report.elapsed.as_micros() as u64, Ordering::Relaxed);
        let counter = match report.outcome {
            CycleOutcome::Empty | CycleOutcome::Unavailable(_) | CycleOutcome::NoRows => &self.empty,
            CycleOutcome::Written(_) => &self.written,
            CycleOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rows: self.rows.load(Ordering::Relaxed),
            busy: Duration::from_micros(self.busy_micros.load(Ordering::Relaxed)),
        }
    }
}

/// Periodic join-and-export job
pub struct ExportScheduler<S> {
    source: S,
    store: Arc<ReferenceStore>,
    index: Arc<CodeIndex>,
    writer: Arc<ReportWriter>,
    config: SchedulerConfig,
    stats: Arc<SchedulerStats>,
}

impl<S: BatchSource + 'static> ExportScheduler<S> {
    pub fn new(
        source: S,
        store: Arc<ReferenceStore>,
        index: Arc<CodeIndex>,
        writer: ReportWriter,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            source,
            store,
            index,
            writer: Arc::new(writer),
            config,
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    /// Run one cycle stamped with the current local time
    pub async fn tick(&self) -> CycleReport {
        self.tick_at(Local::now().naive_local()).await
    }

    /// Run one cycle stamped with `started_at`. Never fails: every error is
    /// folded into the returned report.
    pub async fn tick_at(&self, started_at: NaiveDateTime) -> CycleReport {
        let clock = Instant::now();
        let mut report = CycleReport {
            id: Uuid::new_v4(),
            started_at,
            elapsed: Duration::ZERO,
            requests: 0,
            rows: 0,
            failures: Vec::new(),
            skipped: 0,
            outcome: CycleOutcome::Empty,
        };
        log::debug!("Cycle {} starting at {}", report.id, started_at);

        match self.source.fetch_batch().await {
            Ok(batch) => {
                report.requests = batch.len();
                self.process(batch, &mut report).await;
            }
            Err(ExportError::EmptyQueue) => {}
            Err(e) => {
                log::warn!("Cycle {}: {} source unavailable: {}", report.id, self.source.name(), e);
                report.outcome = CycleOutcome::Unavailable(e.to_string());
            }
        }

        report.elapsed = clock.elapsed();
        self.stats.record(&report);
        log::info!(
            "Cycle {} finished in {:.3}s: {} request(s), {} row(s), {}",
            report.id,
            report.elapsed.as_secs_f64(),
            report.requests,
            report.rows,
            report.outcome
        );
        report
    }

    async fn process(&self, batch: crate::types::Batch, report: &mut CycleReport) {
        let store = Arc::clone(&self.store);
        let index = Arc::clone(&self.index);
        let writer = Arc::clone(&self.writer);
        let policy = self.config.failure_policy;
        let started_at = report.started_at;

        // join and file write are blocking; keep them off the runtime threads
        let joined = tokio::task::spawn_blocking(move || {
            let outcome = join_batch(&batch, &store, &index, policy);
            let written = if outcome.rows.is_empty() {
                None
            } else {
                Some(writer.write(&outcome.rows, started_at))
            };
            (outcome, written)
        })
        .await;

        let (outcome, written) = match joined {
            Ok(result) => result,
            Err(e) => {
                log::error!("Cycle {}: export task panicked: {}", report.id, e);
                report.outcome = CycleOutcome::Failed(e.to_string());
                return;
            }
        };

        report.rows = outcome.rows.len();
        report.skipped = outcome.skipped;
        if outcome.aborted() {
            log::warn!(
                "Cycle {}: batch aborted after request {}, {} request(s) not processed",
                report.id,
                outcome.failures.last().map(|f| f.position).unwrap_or_default(),
                outcome.skipped
            );
        }
        report.failures = outcome.failures;
        report.outcome = match written {
            None => CycleOutcome::NoRows,
            Some(Ok(path)) => CycleOutcome::Written(path),
            Some(Err(e)) => {
                log::error!("Cycle {}: failed to write report: {}", report.id, e);
                CycleOutcome::Failed(e.to_string())
            }
        };
    }

    /// Tick until `cancel` fires. The first tick completes immediately.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        log::info!(
            "Export scheduler starting: every {}s from {} source",
            self.config.interval.as_secs(),
            self.source.name()
        );
        let mut ticker = tokio::time::interval(self.config.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            // an in-flight cycle is never cancelled
            self.tick().await;
        }

        log::info!("Export scheduler stopped");
    }

    /// Spawn the run loop on the current tokio runtime
    pub fn spawn(self) -> SchedulerHandle {
        let scheduler = Arc::new(self);
        let stats = scheduler.stats();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&scheduler).run(cancel.clone()));
        SchedulerHandle {
            cancel,
            handle,
            stats,
        }
    }
}

/// Handle to a spawned scheduler
pub struct SchedulerHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    stats: Arc<SchedulerStats>,
}

impl SchedulerHandle {
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop the timer and wait for any in-flight cycle to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            log::error!("Export scheduler task failed: {}", e);
        }
    }
}
