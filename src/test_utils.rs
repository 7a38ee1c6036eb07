//! Test doubles shared by unit tests and the integration suites.
//!
//! - [`UnavailableStore`]: a [`RecordStore`] whose every operation fails.
//! - [`ScriptedSource`]: a [`CandidateSource`] that replays a fixed script.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{PollError, Result};
use crate::fetcher::CandidateSource;
use crate::store::{Candidate, ListOrder, Record, RecordStore};

/// A store whose medium can never be opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn err() -> PollError {
        PollError::StorageUnavailable("simulated unavailable medium".into())
    }
}

impl RecordStore for UnavailableStore {
    fn initialize(&self) -> Result<()> {
        Err(Self::err())
    }

    fn append(&self, _primary_label: &str, _secondary_label: &str) -> Result<Record> {
        Err(Self::err())
    }

    fn latest(&self) -> Result<Option<Record>> {
        Err(Self::err())
    }

    fn list_all(&self, _order: ListOrder) -> Result<Vec<Record>> {
        Err(Self::err())
    }
}

/// One scripted fetch step.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Candidate(Candidate),
    Fail(String),
}

/// Replays a script of fetch results, then repeats the last step forever.
///
/// An optional per-call delay simulates a slow network.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<ScriptStep>>,
    last: Mutex<Option<ScriptStep>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            last: Mutex::new(None),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Script of successful fetches with the given secondary labels.
    pub fn labels(primary: &str, secondaries: &[&str]) -> Self {
        Self::new(
            secondaries
                .iter()
                .map(|s| ScriptStep::Candidate(Candidate::new(primary, *s))),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `fetch_candidate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<ScriptStep> {
        let mut steps = self.steps.lock().ok()?;
        let mut last = self.last.lock().ok()?;
        if let Some(step) = steps.pop_front() {
            *last = Some(step);
        }
        last.clone()
    }
}

#[async_trait]
impl CandidateSource for ScriptedSource {
    async fn fetch_candidate(&self) -> Result<Candidate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.next_step() {
            Some(ScriptStep::Candidate(c)) => Ok(c),
            Some(ScriptStep::Fail(msg)) => Err(PollError::FetchFailed(msg)),
            None => Err(PollError::FetchFailed("script is empty".into())),
        }
    }
}
