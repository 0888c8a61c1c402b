use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use petstore_loadtest::LoadTest;
use petstore_loadtest::events::EventBus;
use petstore_loadtest::http::HttpRemote;
use petstore_loadtest::listeners;
use petstore_loadtest::outcome::FailureKind;
use petstore_test::axum::Router;
use petstore_test::axum::http::StatusCode;
use petstore_test::axum::routing::get;
use petstore_test::server::TestServer;

const FETCH: &str = "GET /pet/{id}";
const FIND: &str = "GET /pet/findByStatus";
const HEALTH: &str = "Health Check";

fn quick_test(remote: HttpRemote) -> LoadTest {
    LoadTest::builder(remote)
        .users(4)
        .spawn_rate(100.0)
        .run_time(Duration::from_secs(2))
        .wait_time(Duration::from_millis(5), Duration::from_millis(15))
        .headless(true)
        .build()
}

#[tokio::test]
async fn healthy_petstore_has_no_failures() {
    petstore_test::tracing::init();
    let server = TestServer::new().await;

    let stats = quick_test(HttpRemote::new(server.url("/")))
        .run()
        .await
        .unwrap();

    assert!(stats.total_requests() > 0);
    assert_eq!(stats.total_failures(), 0, "{stats:?}");
    for name in [FETCH, FIND, HEALTH] {
        let endpoint = stats.endpoint(name).unwrap();
        assert!(endpoint.requests > 0, "no requests for {name}");
    }
}

#[tokio::test]
async fn reports_failure_reasons() {
    petstore_test::tracing::init();
    let router = Router::new()
        .route("/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/pet/1", get(|| async { StatusCode::NOT_FOUND }))
        .route("/pet/findByStatus", get(|| async { StatusCode::BAD_REQUEST }));
    let server = TestServer::with_router(router).await;

    let stats = quick_test(HttpRemote::new(server.url("/")))
        .run()
        .await
        .unwrap();

    assert_eq!(stats.total_failures(), stats.total_requests() as u64);

    let expected = [
        (FETCH, "Pet not found"),
        (FIND, "Invalid status value"),
        (HEALTH, "Health check failed: 500"),
    ];
    for (name, reason) in expected {
        let endpoint = stats.endpoint(name).unwrap();
        assert_eq!(endpoint.failures.len(), 1, "{endpoint:?}");
        assert_eq!(endpoint.failures[reason], endpoint.requests as u64);
    }
}

#[tokio::test]
async fn malformed_bodies_are_protocol_failures() {
    petstore_test::tracing::init();
    let router = Router::new()
        .route("/", get(|| async { StatusCode::METHOD_NOT_ALLOWED }))
        .route("/pet/1", get(|| async { "not json" }))
        .route("/pet/findByStatus", get(|| async { r#"[{"name":"Fido"}]"# }));
    let server = TestServer::with_router(router).await;

    let stats = quick_test(HttpRemote::new(server.url("/")))
        .run()
        .await
        .unwrap();

    let fetch = stats.endpoint(FETCH).unwrap();
    assert_eq!(fetch.failures["Invalid JSON response"], fetch.requests as u64);

    // A list whose first pet lacks fields counts as a single failure, not a success.
    let find = stats.endpoint(FIND).unwrap();
    assert_eq!(
        find.failures["Pet objects missing required fields"],
        find.requests as u64
    );

    let health = stats.endpoint(HEALTH).unwrap();
    assert_eq!(health.failure_count(), 0);
}

#[tokio::test]
async fn connection_errors_are_transport_failures() {
    petstore_test::tracing::init();

    // Reserve a port and release it again, so nothing is listening there.
    let addr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let transport_failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&transport_failures);
    let mut events = EventBus::default();
    events.on_request(move |event| {
        if let Err(failure) = &event.outcome {
            if failure.kind() == FailureKind::Transport {
                assert_eq!(event.status, None);
                counter.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    let remote = HttpRemote::with_timeout(format!("http://{addr}"), Duration::from_secs(1)).unwrap();
    let stats = LoadTest::builder(remote)
        .users(2)
        .spawn_rate(100.0)
        .run_time(Duration::from_secs(1))
        .wait_time(Duration::from_millis(5), Duration::from_millis(10))
        .headless(true)
        .events(events)
        .build()
        .run()
        .await
        .unwrap();

    assert!(stats.total_requests() > 0);
    assert_eq!(stats.total_failures(), stats.total_requests() as u64);
    assert_eq!(
        transport_failures.load(Ordering::Relaxed),
        stats.total_requests()
    );
}

#[tokio::test]
async fn lifecycle_hooks_fire() {
    petstore_test::tracing::init();
    let server = TestServer::new().await;

    let test_starts = Arc::new(AtomicUsize::new(0));
    let test_stops = Arc::new(AtomicUsize::new(0));
    let user_starts = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(AtomicUsize::new(0));

    let mut events = EventBus::default();
    listeners::register(&mut events);
    {
        let test_starts = Arc::clone(&test_starts);
        let test_stops = Arc::clone(&test_stops);
        let user_starts = Arc::clone(&user_starts);
        let requests = Arc::clone(&requests);
        events
            .on_test_start(move |env| {
                assert_eq!(env.users, 3);
                test_starts.fetch_add(1, Ordering::Relaxed);
            })
            .on_test_stop(move |_| {
                test_stops.fetch_add(1, Ordering::Relaxed);
            })
            .on_user_start(move |_| {
                user_starts.fetch_add(1, Ordering::Relaxed);
            })
            .on_request(move |_| {
                requests.fetch_add(1, Ordering::Relaxed);
            });
    }

    let stats = LoadTest::builder(HttpRemote::new(server.url("/")))
        .users(3)
        .spawn_rate(50.0)
        .run_time(Duration::from_secs(1))
        .wait_time(Duration::from_millis(5), Duration::from_millis(10))
        .headless(true)
        .events(events)
        .build()
        .run()
        .await
        .unwrap();

    assert_eq!(test_starts.load(Ordering::Relaxed), 1);
    assert_eq!(test_stops.load(Ordering::Relaxed), 1);
    assert_eq!(user_starts.load(Ordering::Relaxed), 3);
    assert_eq!(requests.load(Ordering::Relaxed), stats.total_requests());
}

#[tokio::test]
async fn ramp_up_respects_spawn_rate() {
    petstore_test::tracing::init();
    let server = TestServer::new().await;

    let user_starts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&user_starts);
    let mut events = EventBus::default();
    events.on_user_start(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    // At 2 users per second, only the first few of 10 users start within one second.
    LoadTest::builder(HttpRemote::new(server.url("/")))
        .users(10)
        .spawn_rate(2.0)
        .run_time(Duration::from_secs(1))
        .headless(true)
        .events(events)
        .build()
        .run()
        .await
        .unwrap();

    let started = user_starts.load(Ordering::Relaxed);
    assert!((1..=4).contains(&started), "{started} users started");
}

#[tokio::test]
async fn rejects_unrepresentable_spawn_rate() {
    let test_starts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&test_starts);
    let mut events = EventBus::default();
    events.on_test_start(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    // One user per tenth of a nanosecond rounds down to a zero spawn interval.
    let result = LoadTest::builder(HttpRemote::new("http://127.0.0.1:1"))
        .spawn_rate(1e10)
        .run_time(Duration::from_secs(1))
        .headless(true)
        .events(events)
        .build()
        .run()
        .await;

    let error = result.unwrap_err();
    assert!(error.to_string().contains("invalid spawn rate"), "{error:#}");
    assert_eq!(test_starts.load(Ordering::Relaxed), 0);
}
