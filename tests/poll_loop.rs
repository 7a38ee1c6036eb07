//! End-to-end poll loop behaviour against an on-disk store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracklog::config::SchedulerConfig;
use tracklog::store::{ListOrder, RecordStore, SqliteRecordStore};
use tracklog::test_utils::{ScriptStep, ScriptedSource};
use tracklog::{Candidate, EventSink, Persister, PollError, PollEvent, Scheduler, TickOutcome};

fn open_store(dir: &tempfile::TempDir) -> Arc<dyn RecordStore> {
    Arc::new(SqliteRecordStore::open(dir.path().join("records.db")).expect("open store"))
}

fn scheduler_for(
    store: &Arc<dyn RecordStore>,
    source: ScriptedSource,
    events: EventSink,
) -> Scheduler {
    let persister = Arc::new(Persister::new(Arc::clone(store), events));
    Scheduler::new(Arc::new(source), persister, &SchedulerConfig::default())
}

fn secondary_labels(store: &Arc<dyn RecordStore>) -> Vec<String> {
    store
        .list_all(ListOrder::Ascending)
        .expect("list")
        .into_iter()
        .map(|r| r.secondary_label)
        .collect()
}

#[tokio::test]
async fn consecutive_duplicates_collapse_through_ticks() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let store = open_store(&dir);
    let scheduler = scheduler_for(
        &store,
        ScriptedSource::labels("artist", &["a", "a", "b", "b", "b", "a"]),
        EventSink::disabled(),
    );

    for _ in 0..6 {
        scheduler.run_once().await;
    }

    assert_eq!(secondary_labels(&store), ["a", "b", "a"]);
    let stats = scheduler.stats();
    assert_eq!(stats.appended, 3);
    assert_eq!(stats.unchanged, 3);
}

#[tokio::test]
async fn refresh_event_only_on_append() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let store = open_store(&dir);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = scheduler_for(
        &store,
        ScriptedSource::labels("X", &["Y", "Y", "Z"]),
        EventSink::new(tx),
    );

    for _ in 0..3 {
        scheduler.run_once().await;
    }

    let events: Vec<PollEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    let appended: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            PollEvent::RecordAppended(r) => Some(r.secondary_label.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(appended, ["Y", "Z"]);
}

#[tokio::test]
async fn ids_keep_increasing_across_restart() {
    let dir = tempfile::TempDir::new().expect("temp dir");

    let first_ids: Vec<i64> = {
        let store = open_store(&dir);
        let scheduler = scheduler_for(
            &store,
            ScriptedSource::labels("X", &["a", "b"]),
            EventSink::disabled(),
        );
        scheduler.run_once().await;
        scheduler.run_once().await;
        store
            .list_all(ListOrder::Ascending)
            .expect("list")
            .iter()
            .map(|r| r.id)
            .collect()
    };

    let store = open_store(&dir);
    // The latest stored key is "b", so a first "b" after restart is a repeat.
    let scheduler = scheduler_for(
        &store,
        ScriptedSource::labels("X", &["b", "c"]),
        EventSink::disabled(),
    );
    assert_eq!(scheduler.run_once().await, TickOutcome::Unchanged);
    let TickOutcome::Appended { id } = scheduler.run_once().await else {
        panic!("expected append after restart");
    };

    assert!(first_ids.iter().all(|old| *old < id));
    assert_eq!(secondary_labels(&store), ["a", "b", "c"]);
}

#[tokio::test]
async fn list_len_never_decreases_while_polling() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let store = open_store(&dir);
    let labels: Vec<String> = (0..30).map(|i| format!("title {i}")).collect();
    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let persister = Arc::new(Persister::new(Arc::clone(&store), EventSink::disabled()));
    let mut scheduler = Scheduler::new(
        Arc::new(ScriptedSource::labels("X", &label_refs)),
        persister,
        &SchedulerConfig {
            interval_ms: 2,
            history_limit: 10,
        },
    );
    scheduler.start().expect("start");

    // A separate reader connection, as a display layer would hold.
    let reader = SqliteRecordStore::open(dir.path().join("records.db")).expect("reader");
    let mut last = 0;
    for _ in 0..50 {
        let len = reader.list_all(ListOrder::Descending).expect("read").len();
        assert!(len >= last, "list shrank from {last} to {len}");
        last = len;
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    scheduler.shutdown().await;
    let total = store.count().expect("count");
    assert!(total as usize >= last && total <= 30, "total {total}, last seen {last}");
}

#[tokio::test]
async fn failed_initialize_yields_storage_errors_and_ticks_continue() {
    let dir = tempfile::TempDir::new().expect("temp dir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file, not a directory").expect("write blocker");

    let store: Arc<dyn RecordStore> =
        Arc::new(SqliteRecordStore::new(blocker.join("records.db")));
    assert!(matches!(
        store.initialize(),
        Err(PollError::StorageUnavailable(_))
    ));
    assert!(matches!(
        store.append("X", "Y"),
        Err(PollError::StorageUnavailable(_))
    ));

    let persister = Arc::new(Persister::new(Arc::clone(&store), EventSink::disabled()));
    let mut scheduler = Scheduler::new(
        Arc::new(ScriptedSource::new([
            ScriptStep::Fail("offline".into()),
            ScriptStep::Candidate(Candidate::new("X", "Y")),
        ])),
        persister,
        &SchedulerConfig {
            interval_ms: 5,
            history_limit: 100,
        },
    );
    scheduler.start().expect("start");

    tokio::time::timeout(Duration::from_secs(5), async {
        while scheduler.stats().storage_failures < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("scheduler keeps ticking");

    let history = scheduler.history();
    assert!(matches!(history[0].outcome, TickOutcome::FetchFailed { .. }));
    assert!(
        history[1..]
            .iter()
            .all(|r| matches!(r.outcome, TickOutcome::StorageUnavailable { .. }))
    );
    scheduler.shutdown().await;
}
