use std::process::{Command, Output, Stdio};

use petstore_test::axum::Router;
use petstore_test::axum::http::StatusCode;
use petstore_test::axum::routing::get;
use petstore_test::server::TestServer;

const LOADTEST_EXE: &str = env!("CARGO_BIN_EXE_petstore-loadtest");

async fn run_against(server: &TestServer) -> Output {
    let host = server.url("/");
    tokio::task::spawn_blocking(move || {
        Command::new(LOADTEST_EXE)
            .args(["run", "--host", host.as_str(), "-u", "2", "-r", "10", "-t", "1s"])
            .arg("--headless")
            .env("PETSTORE__WAIT_TIME__MIN", "10ms")
            .env("PETSTORE__WAIT_TIME__MAX", "20ms")
            .env("PETSTORE__LOGGING__FORMAT", "simplified")
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .output()
            .expect("Failed to spawn subprocess")
    })
    .await
    .unwrap()
}

#[test]
fn prints_version() {
    let output = Command::new(LOADTEST_EXE).arg("version").output().unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        env!("CARGO_PKG_VERSION")
    );
}

#[test]
fn rejects_invalid_config() {
    let output = Command::new(LOADTEST_EXE)
        .args(["run", "--host", "not a url", "-t", "1s"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid host"), "{stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn succeeds_against_healthy_petstore() {
    let server = TestServer::new().await;
    let output = run_against(&server).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "{stdout}\n{stderr}");

    assert!(stdout.contains("GET /pet/{id}"), "{stdout}");
    assert!(stdout.contains("TOTALS"), "{stdout}");
    assert!(!stdout.contains("FAILURES"), "{stdout}");
    assert!(stderr.contains("Starting Petstore API Load Test"), "{stderr}");
    assert!(stderr.contains("Petstore API Load Test Completed"), "{stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn fails_when_requests_fail() {
    let router = Router::new().route("/", get(|| async { StatusCode::BAD_GATEWAY }));
    let server = TestServer::with_router(router).await;
    let output = run_against(&server).await;

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "{stdout}");
    assert!(stdout.contains("FAILURES"), "{stdout}");
    assert!(stdout.contains("Pet not found"), "{stdout}");
}
