//! Scheduler background loop.
//!
//! Spawns a tokio task that fires a tick every `interval`, measured from
//! tick start. Each tick fetches a candidate and hands it to the
//! [`Persister`]. Ticks never overlap: the worker awaits each tick before
//! taking the next timer tick, missed periods are skipped rather than
//! replayed, and manual [`Scheduler::run_once`] calls share the same lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::{PollError, Result};
use crate::fetcher::CandidateSource;
use crate::persist::{Persister, ProcessOutcome};
use crate::scheduler::ticks::{
    TickHistory, TickOutcome, TickReport, TickStats, TickStatsSnapshot,
};
use crate::store::now_iso8601;

/// Lifecycle of a [`Scheduler`]. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Cancelled,
}

/// State shared between the scheduler handle and its worker task.
struct TickContext {
    source: Arc<dyn CandidateSource>,
    persister: Arc<Persister>,
    stats: TickStats,
    history: TickHistory,
    /// Held for the whole of a tick so no two ticks interleave.
    tick_lock: tokio::sync::Mutex<()>,
}

impl TickContext {
    async fn run_tick(&self) -> TickOutcome {
        let _guard = self.tick_lock.lock().await;
        let started_at = now_iso8601();
        let started = Instant::now();

        let source = Arc::clone(&self.source);
        let persister = Arc::clone(&self.persister);
        let outcome = match tokio::spawn(async move { tick_body(&*source, persister).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("tick aborted: {e}");
                TickOutcome::Aborted {
                    reason: e.to_string(),
                }
            }
        };

        let seq = self.stats.record(&outcome);
        self.history.push(TickReport {
            seq,
            started_at,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcome: outcome.clone(),
        });
        outcome
    }
}

/// Fetch, then dedup-and-persist. Every failure is mapped to an outcome.
///
/// The store calls are synchronous and may wait on a busy database, so the
/// persist stage runs on the blocking pool.
async fn tick_body(source: &dyn CandidateSource, persister: Arc<Persister>) -> TickOutcome {
    let candidate = match source.fetch_candidate().await {
        Ok(candidate) => candidate,
        Err(e) => {
            warn!("fetch failed, skipping tick: {e}");
            return TickOutcome::FetchFailed {
                reason: stage_reason(e),
            };
        }
    };

    let persisted = tokio::task::spawn_blocking(move || persister.process(&candidate)).await;
    match persisted {
        Ok(Ok(ProcessOutcome::Appended(record))) => TickOutcome::Appended { id: record.id },
        Ok(Ok(ProcessOutcome::Unchanged)) => TickOutcome::Unchanged,
        Ok(Err(e)) => {
            warn!("cannot persist candidate, skipping tick: {e}");
            TickOutcome::StorageUnavailable {
                reason: stage_reason(e),
            }
        }
        Err(e) => {
            error!("persist task aborted: {e}");
            TickOutcome::Aborted {
                reason: e.to_string(),
            }
        }
    }
}

/// Unwrap the message of a stage error; other variants keep their display form.
fn stage_reason(e: PollError) -> String {
    match e {
        PollError::FetchFailed(msg) | PollError::StorageUnavailable(msg) => msg,
        other => other.to_string(),
    }
}

/// Drives fetch → dedup-and-persist on a fixed period until stopped.
pub struct Scheduler {
    ctx: Arc<TickContext>,
    interval: Duration,
    state: SchedulerState,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        persister: Arc<Persister>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(TickContext {
                source,
                persister,
                stats: TickStats::default(),
                history: TickHistory::new(config.history_limit),
                tick_lock: tokio::sync::Mutex::new(()),
            }),
            interval: config.interval(),
            state: SchedulerState::Idle,
            cancel: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> TickStatsSnapshot {
        self.ctx.stats.snapshot()
    }

    /// Recent tick reports, oldest first.
    pub fn history(&self) -> Vec<TickReport> {
        self.ctx.history.entries()
    }

    /// Start the background loop. The first tick fires immediately.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Scheduler`] unless the scheduler is `Idle`, the
    /// interval is zero, or there is no tokio runtime to spawn on.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SchedulerState::Idle {
            return Err(PollError::Scheduler(format!(
                "cannot start scheduler in state {:?}",
                self.state
            )));
        }
        if self.interval.is_zero() {
            return Err(PollError::Scheduler("tick interval must be > 0".into()));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PollError::Scheduler(format!("no tokio runtime: {e}")))?;

        let ctx = Arc::clone(&self.ctx);
        let cancel = self.cancel.clone();
        let period = self.interval;

        self.handle = Some(runtime.spawn(async move {
            info!(
                interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
                "scheduler started"
            );
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let outcome = ctx.run_tick().await;
                debug!(?outcome, "tick finished");
            }
            info!("scheduler stopped");
        }));
        self.state = SchedulerState::Running;
        Ok(())
    }

    /// Cancel the timer. An in-flight tick finishes; no new tick starts.
    ///
    /// Idempotent. The scheduler cannot be restarted afterwards.
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Cancelled {
            return;
        }
        self.cancel.cancel();
        self.state = SchedulerState::Cancelled;
        debug!("scheduler cancellation requested");
    }

    /// [`stop`](Self::stop), then wait for the worker task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("scheduler worker ended abnormally: {e}");
            }
        }
    }

    /// Run one tick now, serialized with the background loop.
    pub async fn run_once(&self) -> TickOutcome {
        self.ctx.run_tick().await
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
