//! Events emitted by the poller for the presentation layer.
//!
//! These are lightweight notifications. The display layer is expected to
//! re-read the store via [`RecordStore::list_all`](crate::store::RecordStore::list_all)
//! when it sees [`PollEvent::RecordAppended`].

use crate::store::Record;
use tokio::sync::mpsc;
use tracing::debug;

/// Things the presentation layer may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// A new record was persisted; refresh the list view.
    RecordAppended(Record),
    /// The startup reachability check found no network.
    ///
    /// Emitted at most once per process, for a user-facing notification.
    Offline { message: String },
    /// Reachability changed while watching.
    ConnectivityChanged { connected: bool },
}

/// Optional event sink shared by the components that emit [`PollEvent`]s.
///
/// A closed or absent receiver never affects the poll loop.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<PollEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<PollEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: PollEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(event).is_err() {
            debug!("poll event receiver closed, dropping event");
        }
    }
}
