//! End-to-end tests of the ureq transport against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then sends real requests through
//! `Client::with_runtime`. Completions run on a dedicated callback thread and
//! forward their result through a channel the test awaits with a deadline.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use api_request::{
    ApiResult, CallbackQueue, Client, ClientConfig, RequestError, RequestSpec, TransportError,
};
use chrono::{DateTime, FixedOffset, Timelike};
use serde::Deserialize;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
struct Token {
    access_token: String,
    token_type: String,
    expires_in: u64,
    #[serde(with = "api_request::decoder::timestamp")]
    issued_at: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize)]
struct OAuthError {
    error: String,
}

#[derive(Debug, Deserialize)]
struct Echo {
    method: String,
    path: String,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: Option<serde_json::Value>,
}

async fn start_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    addr
}

fn client() -> Client {
    let queue = CallbackQueue::spawn("integration-callbacks").unwrap();
    Client::with_runtime(tokio::runtime::Handle::current(), queue)
}

/// Send `spec` and wait for its completion.
async fn fetch<T, E>(client: &Client, spec: RequestSpec) -> ApiResult<T, E>
where
    T: serde::de::DeserializeOwned + Send + 'static,
    E: serde::de::DeserializeOwned + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let request = client.request::<T, E>(spec, move |_, result| {
        let _ = tx.send(result);
    });
    request.run();
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("completion did not arrive in time")
        .expect("completion dropped without result")
}

fn token_spec(addr: SocketAddr, password: &str) -> RequestSpec {
    RequestSpec::post(format!("http://{addr}"))
        .with_path("/token")
        .with_body_param("grant_type", "password")
        .with_body_param("username", mock_server::USERNAME)
        .with_body_param("password", password)
}

#[tokio::test(flavor = "multi_thread")]
async fn password_grant_returns_token() {
    let addr = start_server().await;
    let client = client();

    let payload = fetch::<Token, OAuthError>(&client, token_spec(addr, mock_server::PASSWORD))
        .await
        .unwrap();

    assert_eq!(payload.value.token_type, "Bearer");
    assert_eq!(payload.value.expires_in, 3600);
    assert!(!payload.value.access_token.is_empty());
    assert_eq!(payload.value.issued_at.nanosecond(), 123_000_000);
    let raw: serde_json::Value = serde_json::from_slice(&payload.raw).unwrap();
    assert_eq!(raw["access_token"], payload.value.access_token.as_str());
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_password_is_server_error() {
    let addr = start_server().await;
    let client = client();

    let result = fetch::<Token, OAuthError>(&client, token_spec(addr, "wrong")).await;

    match result {
        Err(RequestError::ServerError { status, payload }) => {
            assert_eq!(status, 400);
            assert_eq!(payload.error, "invalid_grant");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn echo_sees_what_was_built() {
    let addr = start_server().await;
    let client = client().with_config(ClientConfig::default().with_user_agent("echo-test/1"));

    let spec = RequestSpec::put(format!("http://{addr}/ignored?dropped=1"))
        .with_path("/echo")
        .with_url_param("page", "2")
        .with_url_param("q", "a b")
        .with_header("X-Trace", "t-1")
        .with_body_param("n", vec![1, 2, 3]);
    let echo = fetch::<Echo, serde_json::Value>(&client, spec).await.unwrap().value;

    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.query.get("page").map(String::as_str), Some("2"));
    assert_eq!(echo.query.get("q").map(String::as_str), Some("a b"));
    assert!(!echo.query.contains_key("dropped"));
    assert_eq!(echo.headers["x-trace"], "t-1");
    assert_eq!(echo.headers["user-agent"], "echo-test/1");
    assert_eq!(echo.headers["accept"], "application/json");
    assert_eq!(echo.headers["content-type"], "application/json");
    assert_eq!(echo.headers["cache-control"], "no-cache");
    assert_eq!(echo.body, Some(serde_json::json!({"n": [1, 2, 3]})));
}

#[tokio::test(flavor = "multi_thread")]
async fn options_request_has_no_body() {
    let addr = start_server().await;
    let client = client();

    let spec = RequestSpec::options(format!("http://{addr}")).with_path("/echo");
    let echo = fetch::<Echo, serde_json::Value>(&client, spec).await.unwrap().value;

    assert_eq!(echo.method, "OPTIONS");
    assert!(echo.body.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn non_json_body_is_decode_error() {
    let addr = start_server().await;
    let client = client();

    let spec = RequestSpec::get(format!("http://{addr}")).with_path("/broken");
    let result = fetch::<Token, OAuthError>(&client, spec).await;

    match result {
        Err(RequestError::DecodeError { raw, .. }) => assert_eq!(raw, b"this is not json"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn refused_connection_is_connection_error() {
    // Bind and drop to get a port nobody listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = client();

    let result = fetch::<Token, OAuthError>(&client, token_spec(addr, "x")).await;

    assert!(
        matches!(result, Err(RequestError::ConnectionError(_))),
        "got {result:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_server_hits_configured_timeout() {
    let addr = start_server().await;
    let client =
        client().with_config(ClientConfig::default().with_timeout(Duration::from_millis(200)));

    let spec = RequestSpec::get(format!("http://{addr}"))
        .with_path("/slow")
        .with_url_param("ms", "3000");
    let result = fetch::<serde_json::Value, serde_json::Value>(&client, spec).await;

    assert!(
        matches!(
            result,
            Err(RequestError::ConnectionError(TransportError::Timeout))
        ),
        "got {result:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_in_flight_suppresses_completion() {
    let addr = start_server().await;
    let client = client();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let spec = RequestSpec::get(format!("http://{addr}"))
        .with_path("/slow")
        .with_url_param("ms", "500");
    let request = client.request::<serde_json::Value, serde_json::Value>(spec, move |_, result| {
        let _ = tx.send(result);
    });
    request.run();
    tokio::time::sleep(Duration::from_millis(50)).await;
    request.cancel();

    let waited = tokio::time::timeout(Duration::from_millis(1500), rx.recv()).await;
    match waited {
        Err(_) | Ok(None) => {}
        Ok(Some(result)) => panic!("cancelled request completed with {result:?}"),
    }
    assert!(request.is_cancelled());
}
