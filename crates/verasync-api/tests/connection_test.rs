#![allow(clippy::unwrap_used)]
// Integration tests for `Connection` using wiremock.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use verasync_api::{Connection, ConnectionKind, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Connection) {
    let server = MockServer::start().await;
    let kind = ConnectionKind::Local {
        host: server.address().ip().to_string(),
        port: server.address().port(),
    };
    let conn = Connection::with_client(kind, reqwest::Client::new()).unwrap();
    (server, conn)
}

// ── Request tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_data_request_returns_body_and_relative_path() {
    let (server, conn) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "lu_alive"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let resp = conn.data_request(&[("id", "lu_alive")]).await.unwrap();
    assert_eq!(resp.body, "OK");
    assert_eq!(resp.path, "data_request?id=lu_alive");
    assert_eq!(resp.length(), 2);
    assert!(conn.is_local());
}

#[tokio::test]
async fn test_parameters_are_encoded() {
    let (server, conn) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data_request"))
        .and(query_param("id", "room"))
        .and(query_param("action", "create"))
        .and(query_param("name", "Living Room"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let resp = conn
        .data_request(&[("id", "room"), ("action", "create"), ("name", "Living Room")])
        .await
        .unwrap();
    assert_eq!(resp.path, "data_request?id=room&action=create&name=Living%20Room");
}

#[tokio::test]
async fn test_error_status_is_surfaced() {
    let (server, conn) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data_request"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let err = conn.data_request(&[("id", "lu_sdata")]).await.unwrap_err();
    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "busy");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_hub_is_a_transport_error() {
    // Nothing listens on the discard port of the loopback address.
    let conn = Connection::with_client(
        ConnectionKind::Local {
            host: "127.0.0.1".into(),
            port: 9,
        },
        reqwest::Client::new(),
    )
    .unwrap();

    let err = conn.data_request(&[("id", "lu_alive")]).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_transient());
}
