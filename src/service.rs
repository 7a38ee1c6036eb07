//! Host-facing wiring for the poll loop.
//!
//! [`PollService::start`] opens the record store, runs the one-shot
//! connectivity check, and starts the scheduler. None of those steps can
//! stop the others: a store that fails to initialize is logged, and ticks
//! report `StorageUnavailable` until the store can be opened; being offline
//! only produces a notification.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::TracklogConfig;
use crate::connectivity::{ConnectivityMonitor, ConnectivityProbe, TcpProbe};
use crate::error::Result;
use crate::fetcher::{CandidateSource, HttpFetcher};
use crate::persist::Persister;
use crate::runtime::EventSink;
use crate::scheduler::Scheduler;
use crate::store::{RecordStore, SqliteRecordStore};

/// A running poller and the handles the presentation layer needs.
pub struct PollService {
    store: Arc<dyn RecordStore>,
    scheduler: Scheduler,
    connected_at_startup: bool,
    watch_cancel: CancellationToken,
    watch_handle: Option<JoinHandle<()>>,
}

impl PollService {
    /// Start polling with the SQLite store, HTTP fetcher, and TCP probe
    /// described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PollError::Config`](crate::PollError::Config) for an invalid
    /// config, or a scheduler error if no tokio runtime is available.
    pub async fn start(config: &TracklogConfig, events: EventSink) -> Result<Self> {
        config.validate()?;
        let store: Arc<dyn RecordStore> =
            Arc::new(SqliteRecordStore::new(config.store.db_path.clone()));
        let source: Arc<dyn CandidateSource> = Arc::new(HttpFetcher::new(config.fetcher.clone())?);
        let probe: Arc<dyn ConnectivityProbe> = Arc::new(TcpProbe::for_endpoint(
            &config.fetcher.endpoint,
            config.connectivity.probe_timeout(),
        ));
        Self::start_with(config, store, source, probe, events).await
    }

    /// Start polling with caller-supplied components.
    pub async fn start_with(
        config: &TracklogConfig,
        store: Arc<dyn RecordStore>,
        source: Arc<dyn CandidateSource>,
        probe: Arc<dyn ConnectivityProbe>,
        events: EventSink,
    ) -> Result<Self> {
        if let Err(e) = store.initialize() {
            error!("record store unavailable, polling anyway: {e}");
        }

        let monitor = Arc::new(ConnectivityMonitor::new(
            probe,
            &config.connectivity,
            events.clone(),
        ));
        let connected_at_startup = monitor.is_connected().await;

        let persister = Arc::new(Persister::new(Arc::clone(&store), events));
        let mut scheduler = Scheduler::new(source, persister, &config.scheduler);
        scheduler.start()?;

        let watch_cancel = CancellationToken::new();
        let watch_handle = (config.connectivity.watch_interval_ms > 0).then(|| {
            tokio::spawn(Arc::clone(&monitor).watch(connected_at_startup, watch_cancel.clone()))
        });

        info!(connected = connected_at_startup, "poll service started");
        Ok(Self {
            store,
            scheduler,
            connected_at_startup,
            watch_cancel,
            watch_handle,
        })
    }

    /// Shared store handle for presentation reads.
    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.store)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Result of the startup reachability check.
    pub fn connected_at_startup(&self) -> bool {
        self.connected_at_startup
    }

    /// Stop the scheduler and watcher and wait for both to exit.
    pub async fn shutdown(self) {
        self.watch_cancel.cancel();
        if let Some(handle) = self.watch_handle {
            if let Err(e) = handle.await {
                error!("connectivity watcher ended abnormally: {e}");
            }
        }
        self.scheduler.shutdown().await;
        info!("poll service stopped");
    }
}
