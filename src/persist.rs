//! Dedup-and-persist stage.
//!
//! Compares each candidate with the most recently stored record and appends
//! only when the dedup key (`secondary_label`) changed. The read-compare-write
//! sequence is not transactional; it relies on the scheduler running one
//! tick at a time.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::runtime::{EventSink, PollEvent};
use crate::store::{Candidate, Record, RecordStore};

/// Result of processing one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The candidate was new and has been stored.
    Appended(Record),
    /// The latest record already carries the same dedup key.
    Unchanged,
}

impl ProcessOutcome {
    pub fn appended(&self) -> Option<&Record> {
        match self {
            Self::Appended(record) => Some(record),
            Self::Unchanged => None,
        }
    }
}

pub struct Persister {
    store: Arc<dyn RecordStore>,
    events: EventSink,
}

impl Persister {
    pub fn new(store: Arc<dyn RecordStore>, events: EventSink) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Append `candidate` unless it repeats the latest record.
    ///
    /// On append, emits [`PollEvent::RecordAppended`]. Storage errors
    /// propagate unchanged and nothing is emitted.
    pub fn process(&self, candidate: &Candidate) -> Result<ProcessOutcome> {
        if let Some(latest) = self.store.latest()? {
            if candidate.same_key_as(&latest) {
                debug!(
                    id = latest.id,
                    secondary = %candidate.secondary_label,
                    "candidate unchanged, skipping write"
                );
                return Ok(ProcessOutcome::Unchanged);
            }
        }

        let record = self
            .store
            .append(&candidate.primary_label, &candidate.secondary_label)?;
        info!(
            id = record.id,
            primary = %record.primary_label,
            secondary = %record.secondary_label,
            "record appended"
        );
        self.events.emit(PollEvent::RecordAppended(record.clone()));
        Ok(ProcessOutcome::Appended(record))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::PollError;
    use crate::store::{ListOrder, SqliteRecordStore};
    use crate::test_utils::UnavailableStore;
    use tokio::sync::mpsc;

    fn persister() -> (Persister, mpsc::UnboundedReceiver<PollEvent>) {
        let store: Arc<dyn RecordStore> =
            Arc::new(SqliteRecordStore::in_memory().expect("in-memory store"));
        let (tx, rx) = mpsc::unbounded_channel();
        (Persister::new(store, EventSink::new(tx)), rx)
    }

    fn stored_keys(p: &Persister) -> Vec<String> {
        p.store()
            .list_all(ListOrder::Ascending)
            .expect("list")
            .into_iter()
            .map(|r| r.secondary_label)
            .collect()
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let (p, _rx) = persister();
        for key in ["a", "a", "b", "b", "b", "a"] {
            p.process(&Candidate::new("artist", key)).expect("process");
        }
        assert_eq!(stored_keys(&p), ["a", "b", "a"]);
    }

    #[test]
    fn repeat_then_change_scenario() {
        let (p, mut rx) = persister();

        let first = p.process(&Candidate::new("X", "Y")).expect("first");
        assert!(first.appended().is_some());
        assert_eq!(p.store().count().expect("count"), 1);

        let second = p.process(&Candidate::new("X", "Y")).expect("second");
        assert_eq!(second, ProcessOutcome::Unchanged);
        assert_eq!(p.store().count().expect("count"), 1);

        let third = p.process(&Candidate::new("X", "Z")).expect("third");
        let appended = third.appended().expect("appended").clone();
        assert_eq!(appended.secondary_label, "Z");
        assert_eq!(stored_keys(&p), ["Y", "Z"]);

        let events: Vec<PollEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 2, "one event per append: {events:?}");
        assert_eq!(events[1], PollEvent::RecordAppended(appended));
    }

    #[test]
    fn primary_label_change_alone_is_not_appended() {
        let (p, _rx) = persister();
        p.process(&Candidate::new("Luke", "male")).expect("first");
        let outcome = p.process(&Candidate::new("Han", "male")).expect("second");
        assert_eq!(outcome, ProcessOutcome::Unchanged);
        assert_eq!(p.store().count().expect("count"), 1);
    }

    #[test]
    fn storage_failure_propagates_without_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let p = Persister::new(Arc::new(UnavailableStore), EventSink::new(tx));
        let err = p.process(&Candidate::new("X", "Y")).unwrap_err();
        assert!(matches!(err, PollError::StorageUnavailable(_)));
        assert!(rx.try_recv().is_err());
    }
}
