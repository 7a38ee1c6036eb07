//! Network reachability checks.
//!
//! The poll loop never waits on this module. [`ConnectivityMonitor`] answers
//! a one-shot "are we online?" at startup, emits a single
//! [`PollEvent::Offline`] when not, and can optionally keep watching for
//! transitions in a background task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConnectivityConfig;
use crate::runtime::{EventSink, PollEvent};

/// Result of one reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Online,
    Offline,
    /// The probe could not decide, e.g. the endpoint has no host.
    Unknown,
}

impl Reachability {
    /// Fail-open view: anything but a definite `Offline` counts as connected.
    pub fn is_connected(self) -> bool {
        !matches!(self, Self::Offline)
    }
}

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self) -> Reachability;
}

/// Probes by opening a TCP connection to the remote source's host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: Option<(String, u16)>,
    timeout: Duration,
}

impl TcpProbe {
    /// Derive the probe target from an endpoint URL.
    ///
    /// An unparseable URL, or one without a host or known port, yields a
    /// probe that always answers [`Reachability::Unknown`].
    pub fn for_endpoint(endpoint: &str, timeout: Duration) -> Self {
        let target = url::Url::parse(endpoint).ok().and_then(|url| {
            let host = url.host_str()?.to_owned();
            let port = url.port_or_known_default()?;
            Some((host, port))
        });
        Self { target, timeout }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn probe(&self) -> Reachability {
        let Some((host, port)) = &self.target else {
            return Reachability::Unknown;
        };
        let connect = tokio::net::TcpStream::connect((host.as_str(), *port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_stream)) => Reachability::Online,
            Ok(Err(e)) => {
                debug!(host = %host, port, "connectivity probe failed: {e}");
                Reachability::Offline
            }
            Err(_) => {
                debug!(host = %host, port, "connectivity probe timed out");
                Reachability::Offline
            }
        }
    }
}

pub struct ConnectivityMonitor {
    probe: Arc<dyn ConnectivityProbe>,
    events: EventSink,
    offline_message: String,
    watch_interval: Duration,
    offline_notified: AtomicBool,
}

impl ConnectivityMonitor {
    pub fn new(
        probe: Arc<dyn ConnectivityProbe>,
        config: &ConnectivityConfig,
        events: EventSink,
    ) -> Self {
        Self {
            probe,
            events,
            offline_message: config.offline_message.clone(),
            watch_interval: Duration::from_millis(config.watch_interval_ms),
            offline_notified: AtomicBool::new(false),
        }
    }

    /// Best-effort reachability snapshot. Never fails; unknown means connected.
    ///
    /// The first time this observes `Offline` it emits one
    /// [`PollEvent::Offline`]; later calls stay silent.
    pub async fn is_connected(&self) -> bool {
        let reachability = self.probe.probe().await;
        match reachability {
            Reachability::Online => info!("network reachable"),
            Reachability::Unknown => warn!("network reachability unknown, assuming connected"),
            Reachability::Offline => {
                warn!("network unreachable, running offline");
                if !self.offline_notified.swap(true, Ordering::SeqCst) {
                    self.events.emit(PollEvent::Offline {
                        message: self.offline_message.clone(),
                    });
                }
            }
        }
        reachability.is_connected()
    }

    /// Poll the probe until `cancel` fires, emitting
    /// [`PollEvent::ConnectivityChanged`] on each transition.
    ///
    /// `initial` is the state reported by the startup check. Returns at
    /// once if the configured watch interval is zero.
    pub async fn watch(self: Arc<Self>, initial: bool, cancel: CancellationToken) {
        if self.watch_interval.is_zero() {
            return;
        }
        let mut connected = initial;
        info!(
            interval_ms = u64::try_from(self.watch_interval.as_millis()).unwrap_or(u64::MAX),
            "connectivity watcher started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("connectivity watcher cancelled");
                    break;
                }
                _ = tokio::time::sleep(self.watch_interval) => {
                    let now = tokio::select! {
                        _ = cancel.cancelled() => {
                            info!("connectivity watcher cancelled mid-check");
                            break;
                        }
                        reachability = self.probe.probe() => reachability.is_connected(),
                    };
                    if now != connected {
                        info!(connected = now, "connectivity changed");
                        self.events.emit(PollEvent::ConnectivityChanged { connected: now });
                        connected = now;
                    }
                }
            }
        }
    }
}
