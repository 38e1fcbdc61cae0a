use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::Server;
use predicates::prelude::*;
use reqwest::{Method, Request, StatusCode, Url};
use retry_transport::http::{CompletionMode, HttpError, ReqwestTransport, ServiceError, Transport};
use retry_transport::retry::{RetriesExhausted, RetryPolicy, RetryingTransport};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(10)).unwrap()
}

fn get(url: &str) -> Request {
    Request::new(Method::GET, Url::parse(url).unwrap())
}

#[tokio::test]
async fn test_retries_throttled_request_against_server() {
    let mut server = Server::new_async().await;
    let throttled = server
        .mock("GET", "/items")
        .with_status(429)
        .expect(2)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/items")
        .with_status(200)
        .with_body(r#"{"value": []}"#)
        .expect(1)
        .create_async()
        .await;

    let transport = RetryingTransport::new(ReqwestTransport::default(), fast_policy(3));
    let start = Instant::now();
    let response = transport
        .send(
            &get(&format!("{}/items", server.url())),
            CompletionMode::ResponseContentRead,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    throttled.assert_async().await;
    ok.assert_async().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), r#"{"value": []}"#);
    // 10ms + 20ms of backoff
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[tokio::test]
async fn test_gives_up_after_budget_against_server() {
    let mut server = Server::new_async().await;
    let unavailable = server
        .mock("GET", "/items")
        .with_status(503)
        .expect(4)
        .create_async()
        .await;

    let transport = RetryingTransport::new(ReqwestTransport::default(), fast_policy(4));
    let err = transport
        .send(
            &get(&format!("{}/items", server.url())),
            CompletionMode::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    unavailable.assert_async().await;
    assert_eq!(
        err.downcast_ref::<RetriesExhausted>(),
        Some(&RetriesExhausted { max_attempts: 4 })
    );
}

#[tokio::test]
async fn test_does_not_retry_client_error_against_server() {
    let mut server = Server::new_async().await;
    let not_found = server
        .mock("GET", "/missing")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let transport = RetryingTransport::new(ReqwestTransport::default(), fast_policy(5));
    let err = transport
        .send(
            &get(&format!("{}/missing", server.url())),
            CompletionMode::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    not_found.assert_async().await;
    let service = err.downcast_ref::<ServiceError>().unwrap();
    assert_eq!(
        service.inner().and_then(HttpError::status),
        Some(StatusCode::NOT_FOUND)
    );
}

#[tokio::test]
async fn test_does_not_retry_server_error_other_than_unavailable() {
    let mut server = Server::new_async().await;
    let internal = server
        .mock("GET", "/")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let transport = RetryingTransport::new(ReqwestTransport::default(), fast_policy(5));
    let result = transport
        .send(
            &get(&server.url()),
            CompletionMode::default(),
            &CancellationToken::new(),
        )
        .await;

    internal.assert_async().await;
    assert!(result.is_err());
}

#[test]
fn test_cli_prints_body_after_retry() {
    let mut server = Server::new();
    let _throttled = server
        .mock("GET", "/items")
        .with_status(429)
        .expect(1)
        .create();
    let _ok = server
        .mock("GET", "/items")
        .with_status(200)
        .with_body("hello")
        .create();

    Command::new(cargo::cargo_bin!("retry-transport"))
        .arg("--initial-delay-ms")
        .arg("10")
        .arg(format!("{}/items", server.url()))
        .assert()
        .success()
        .stdout("hello")
        .stderr(predicate::str::contains("200 OK"));
}

#[test]
fn test_cli_reports_exhausted_budget() {
    let mut server = Server::new();
    let _throttled = server.mock("GET", "/items").with_status(429).create();

    Command::new(cargo::cargo_bin!("retry-transport"))
        .args(["--max-attempts", "2", "--initial-delay-ms", "10"])
        .arg(format!("{}/items", server.url()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Maximum retry attempts 2"));
}

#[test]
fn test_cli_rejects_zero_attempts() {
    Command::new(cargo::cargo_bin!("retry-transport"))
        .args(["--max-attempts", "0", "http://127.0.0.1:1/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retry count greater than zero"));
}

#[test]
fn test_cli_sends_method_headers_and_body() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/items")
        .match_header("content-type", "application/json")
        .match_body(r#"{"name":"a"}"#)
        .with_status(201)
        .with_body("created")
        .create();

    Command::new(cargo::cargo_bin!("retry-transport"))
        .args(["-X", "POST", "-H", "Content-Type: application/json"])
        .args(["-d", r#"{"name":"a"}"#])
        .arg(format!("{}/items", server.url()))
        .assert()
        .success()
        .stdout("created");

    mock.assert();
}

#[test]
fn test_cli_version_is_stamped() {
    Command::new(cargo::cargo_bin!("retry-transport"))
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("retry-transport "))
        // Cargo's placeholder version is replaced by the build-time stamp.
        .stdout(predicate::str::ends_with("0.0.0-dev\n").not());
}
