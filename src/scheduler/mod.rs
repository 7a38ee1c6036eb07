//! Fixed-cadence poll loop.
//!
//! Drives [`CandidateSource`](crate::fetcher::CandidateSource) →
//! [`Persister`](crate::persist::Persister) every tick until stopped, and
//! records what each tick did.

pub mod runner;
pub mod ticks;

pub use runner::{Scheduler, SchedulerState};
pub use ticks::{TickOutcome, TickReport, TickStatsSnapshot};
