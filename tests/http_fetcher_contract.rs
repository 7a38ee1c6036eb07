//! HTTP fetcher contract tests.
//!
//! Verify that one `fetch_candidate` call issues exactly one `GET`, that the
//! configured JSON fields are mapped, and that every failure mode surfaces
//! as `PollError::FetchFailed`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracklog::config::FetcherConfig;
use tracklog::runtime::EventSink;
use tracklog::store::{ListOrder, RecordStore, SqliteRecordStore};
use tracklog::{CandidateSource, HttpFetcher, Persister, PollError, Scheduler, TickOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher_for(server: &MockServer, timeout_ms: u64) -> HttpFetcher {
    HttpFetcher::new(FetcherConfig {
        endpoint: format!("{}/api/people/1/", server.uri()),
        timeout_ms,
        ..FetcherConfig::default()
    })
    .expect("build fetcher")
}

#[tokio::test]
async fn maps_name_and_gender() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/people/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Luke Skywalker",
            "gender": "male",
            "height": "172"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candidate = fetcher_for(&server, 2_000)
        .fetch_candidate()
        .await
        .expect("fetch");
    assert_eq!(candidate.primary_label, "Luke Skywalker");
    assert_eq!(candidate.secondary_label, "male");
}

#[tokio::test]
async fn custom_field_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artist": "Kino",
            "title": "Gruppa krovi"
        })))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetcherConfig {
        endpoint: format!("{}/now-playing", server.uri()),
        primary_field: "artist".into(),
        secondary_field: "title".into(),
        ..FetcherConfig::default()
    })
    .expect("build fetcher");

    let candidate = fetcher.fetch_candidate().await.expect("fetch");
    assert_eq!(candidate.primary_label, "Kino");
    assert_eq!(candidate.secondary_label, "Gruppa krovi");
}

#[tokio::test]
async fn server_error_is_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher_for(&server, 2_000).fetch_candidate().await.unwrap_err();
    match err {
        PollError::FetchFailed(msg) => assert!(msg.contains("503"), "message: {msg}"),
        other => panic!("expected FetchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let result = fetcher_for(&server, 2_000).fetch_candidate().await;
    assert!(matches!(result, Err(PollError::FetchFailed(_))));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "Luke", "gender": "male"}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let result = fetcher_for(&server, 50).fetch_candidate().await;
    assert!(matches!(result, Err(PollError::FetchFailed(_))));
}

#[tokio::test]
async fn unreachable_host_is_fetch_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    let fetcher = HttpFetcher::new(FetcherConfig {
        endpoint: format!("http://127.0.0.1:{port}/"),
        timeout_ms: 1_000,
        ..FetcherConfig::default()
    })
    .expect("build fetcher");

    let result = fetcher.fetch_candidate().await;
    assert!(matches!(result, Err(PollError::FetchFailed(_))));
}

#[tokio::test]
async fn scheduler_recovers_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Luke Skywalker",
            "gender": "male"
        })))
        .mount(&server)
        .await;

    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::in_memory().expect("store"));
    let persister = Arc::new(Persister::new(Arc::clone(&store), EventSink::disabled()));
    let scheduler = Scheduler::new(
        Arc::new(fetcher_for(&server, 2_000)),
        persister,
        &tracklog::config::SchedulerConfig::default(),
    );

    assert!(matches!(
        scheduler.run_once().await,
        TickOutcome::FetchFailed { .. }
    ));
    assert!(matches!(
        scheduler.run_once().await,
        TickOutcome::Appended { .. }
    ));
    assert_eq!(scheduler.run_once().await, TickOutcome::Unchanged);

    let records = store.list_all(ListOrder::Ascending).expect("list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].primary_label, "Luke Skywalker");
}
