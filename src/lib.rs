//! Tracklog: poll a remote source, dedup, and keep an append-only local log.
//!
//! Each tick the [`Scheduler`] asks a [`CandidateSource`] for the current
//! observation and hands it to the [`Persister`], which appends it to the
//! [`RecordStore`] only if its dedup key differs from the latest record.
//!
//! # Architecture
//!
//! - **Store**: SQLite in WAL mode, append-only, auto-increment ids
//! - **Connectivity**: one-shot startup reachability check (fail open)
//! - **Fetcher**: one HTTP `GET` per tick, JSON mapped to a [`Candidate`]
//! - **Persist**: compare with latest, append on change
//! - **Scheduler**: fixed-period ticks, serialized, cancellable
//!
//! Presentation layers hold the shared store for reads and receive
//! [`PollEvent`]s over a channel.

pub mod config;
pub mod connectivity;
pub mod diagnostics;
pub mod error;
pub mod fetcher;
pub mod persist;
pub mod runtime;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod test_utils;
pub mod tracklog_dirs;

pub use config::TracklogConfig;
pub use connectivity::{ConnectivityMonitor, ConnectivityProbe, Reachability, TcpProbe};
pub use error::{PollError, Result};
pub use fetcher::{CandidateSource, HttpFetcher};
pub use persist::{Persister, ProcessOutcome};
pub use runtime::{EventSink, PollEvent};
pub use scheduler::{Scheduler, SchedulerState, TickOutcome};
pub use service::PollService;
pub use store::{Candidate, ListOrder, Record, RecordStore, SqliteRecordStore};
