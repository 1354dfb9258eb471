// Integration tests for `OpenSprinklerClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use opensprinkler2mqtt::opensprinkler::{
    ControllerApiError, OpenSprinklerClient, RunRequest, StationController,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(password_hash: Option<&str>) -> (MockServer, OpenSprinklerClient) {
    let server = MockServer::start().await;
    let client =
        OpenSprinklerClient::new(&server.uri(), password_hash.map(str::to_string), None).unwrap();
    (server, client)
}

fn run(station: usize, enable: bool, duration: Option<&str>) -> RunRequest {
    RunRequest {
        station,
        enable,
        duration: duration.map(str::to_string),
    }
}

// ── Status tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_station_status() {
    let (server, client) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/js"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "sn": [0, 1, 0, 0], "nstations": 4 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let status = client.station_status().await.unwrap();

    assert_eq!(status.stations, vec![0, 1, 0, 0]);
    assert_eq!(status.nstations, Some(4));
}

#[tokio::test]
async fn test_station_status_sends_password() {
    let (server, client) = setup(Some("a6d82bced638de3def1e9bbb4983225c")).await;

    Mock::given(method("GET"))
        .and(path("/js"))
        .and(query_param("pw", "a6d82bced638de3def1e9bbb4983225c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sn": [1] })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.station_status().await.unwrap().stations, vec![1]);
}

#[tokio::test]
async fn test_station_status_bad_json() {
    let (server, client) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"result\":2}"))
        .mount(&server)
        .await;

    let result = client.station_status().await;

    match result {
        Err(ControllerApiError::Deserialization { body, .. }) => {
            assert_eq!(body, "{\"result\":2}");
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_station_status_http_error() {
    let (server, client) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/js"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client.station_status().await;

    assert!(
        matches!(result, Err(ControllerApiError::Status { status: 500, .. })),
        "expected Status error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_station_status_unreachable() {
    // nothing listens on the discard port
    let client = OpenSprinklerClient::new(
        "http://127.0.0.1:9",
        None,
        Some(Duration::from_secs(2)),
    )
    .unwrap();

    let err = client.station_status().await.unwrap_err();
    assert!(matches!(err, ControllerApiError::Transport(_)), "got: {err:?}");
}

#[tokio::test]
async fn test_transport_error_hides_password() {
    let client = OpenSprinklerClient::new(
        "http://127.0.0.1:9",
        Some("a6d82bced638de3def1e9bbb4983225c".to_string()),
        Some(Duration::from_secs(2)),
    )
    .unwrap();

    let err = client.station_status().await.unwrap_err();
    assert!(matches!(err, ControllerApiError::Transport(_)), "got: {err:?}");
    assert!(!err.to_string().contains("a6d82bced638de3def1e9bbb4983225c"), "got: {err}");
    assert!(!format!("{err:?}").contains("a6d82bced638de3def1e9bbb4983225c"), "got: {err:?}");

    let err = client.run_station(&run(2, true, Some("60"))).await.unwrap_err();
    assert!(!err.to_string().contains("a6d82bced638de3def1e9bbb4983225c"), "got: {err}");
}

// ── Command tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_run_station_off() {
    let (server, client) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/cm"))
        .and(query_param("sid", "3"))
        .and(query_param("en", "0"))
        .and(query_param("t", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    client.run_station(&run(3, false, None)).await.unwrap();
}

#[tokio::test]
async fn test_run_station_with_duration() {
    let (server, client) = setup(Some("hash")).await;

    Mock::given(method("GET"))
        .and(path("/cm"))
        .and(query_param("pw", "hash"))
        .and(query_param("sid", "0"))
        .and(query_param("en", "1"))
        .and(query_param("t", "45"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.run_station(&run(0, true, Some("45"))).await.unwrap();
}

#[tokio::test]
async fn test_run_station_ignores_response_body() {
    let (server, client) = setup(None).await;

    // the controller reports its own errors inside a 200 response
    Mock::given(method("GET"))
        .and(path("/cm"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 17 })))
        .mount(&server)
        .await;

    client.run_station(&run(1, true, Some("60"))).await.unwrap();
}

#[tokio::test]
async fn test_run_station_http_error() {
    let (server, client) = setup(None).await;

    Mock::given(method("GET"))
        .and(path("/cm"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client.run_station(&run(1, true, Some("60"))).await;

    match result {
        Err(ControllerApiError::Status { status, path }) => {
            assert_eq!(status, 404);
            assert_eq!(path, "/cm");
        }
        other => panic!("expected Status error, got: {other:?}"),
    }
}
