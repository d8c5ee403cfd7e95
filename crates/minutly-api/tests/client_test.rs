// Integration tests for `MinutClient` using wiremock.

use std::time::Duration;

use chrono::{SecondsFormat, TimeDelta, Utc};
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use minutly_api::{ClientConfig, Endpoints, Error, ErrorKind, LatestValues, MinutClient, Tokens};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, MinutClient) {
    setup_with(|config| config).await
}

async fn setup_with(tweak: impl FnOnce(ClientConfig) -> ClientConfig) -> (MockServer, MinutClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let config = tweak(ClientConfig::default().with_endpoints(Endpoints::with_base_url(base)));
    let client = MinutClient::new(reqwest::Client::new(), config);
    (server, client)
}

fn tokens() -> Tokens {
    Tokens::new("access-1").with_refresh_token("refresh-1")
}

fn ago(delta: TimeDelta) -> String {
    (Utc::now() - delta).to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_password_login_returns_tokens() {
    let (server, client) = setup_with(|c| c.with_client_id("dash-client")).await;

    Mock::given(method("POST"))
        .and(path("/v1/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=me%40example.com"))
        .and(body_string_contains("client_id=dash-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "acc",
            "refresh_token": "ref",
            "user_id": 1234,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let password = SecretString::from("hunter2".to_owned());
    let tokens = client
        .password_login("me@example.com", &password)
        .await
        .unwrap();

    assert_eq!(tokens.access_token.expose_secret(), "acc");
    assert!(tokens.has_refresh_token());
    assert_eq!(tokens.user_id.as_deref(), Some("1234"));
}

#[tokio::test]
async fn test_password_login_error_classification() {
    let cases = [
        (401, ErrorKind::Auth),
        (403, ErrorKind::Auth),
        (429, ErrorKind::RateLimit),
        (503, ErrorKind::Connect),
        (400, ErrorKind::Other),
    ];

    for (status, expected) in cases {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth/token"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let password = SecretString::from("pw".to_owned());
        let err = client.password_login("user", &password).await.unwrap_err();
        assert_eq!(err.kind(), expected, "HTTP {status}");
    }
}

#[tokio::test]
async fn test_password_login_without_access_token_is_auth_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": ""})))
        .mount(&server)
        .await;

    let password = SecretString::from("pw".to_owned());
    let err = client.password_login("user", &password).await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[tokio::test]
async fn test_password_login_connection_refused_is_connect_error() {
    // Bind then release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let base = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();

    let config = ClientConfig::default().with_endpoints(Endpoints::with_base_url(base));
    let client = MinutClient::new(reqwest::Client::new(), config);

    let password = SecretString::from("pw".to_owned());
    let err = client.password_login("user", &password).await.unwrap_err();
    assert!(err.is_connect_error());
    assert!(err.is_network_failure());
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/devices"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "42"))
        .mount(&server)
        .await;

    let err = client.get_devices(&tokens()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_secs: Some(42)
        }
    ));
}

// ── Refresh ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refreshed_token_is_used_on_next_request() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draft1/devices"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "d1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let original = tokens();
    let refreshed = client.refresh_tokens(&original).await.unwrap();

    assert_eq!(refreshed.access_token.expose_secret(), "access-2");
    // Not rotated by the server: the previous refresh token carries over.
    assert_eq!(
        refreshed
            .refresh_token
            .as_ref()
            .map(|t| t.expose_secret().to_owned())
            .as_deref(),
        Some("refresh-1")
    );
    // The original value is untouched.
    assert_eq!(original.access_token.expose_secret(), "access-1");

    let devices = client.get_devices(&refreshed).await.unwrap();
    assert_eq!(devices.len(), 1);
}

#[tokio::test]
async fn test_refresh_without_refresh_token_makes_no_request() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/oauth/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client
        .refresh_tokens(&Tokens::new("only-access"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingRefreshToken));
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_devices_unwraps_devices_object() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/devices"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "devices": [{"id": "d1", "description": "Bedroom"}]
        })))
        .mount(&server)
        .await;

    let devices = client.get_devices(&tokens()).await.unwrap();
    let as_json = serde_json::to_value(&devices).unwrap();
    assert_eq!(as_json, json!([{"id": "d1", "description": "Bedroom"}]));
}

#[tokio::test]
async fn test_get_devices_accepts_bare_and_empty_lists() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let devices = client.get_devices(&tokens()).await.unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_get_devices_unauthorized_never_retries() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/devices"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/oauth/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.get_devices(&tokens()).await.unwrap_err();
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_get_devices_garbage_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client.get_devices(&tokens()).await.unwrap_err();
    match err {
        Error::Deserialization { message, body } => {
            assert!(message.contains("body preview"));
            assert_eq!(body, "<html>maintenance</html>");
        }
        other => panic!("expected deserialization error, got {other:?}"),
    }
}

// ── Latest values ───────────────────────────────────────────────────

#[tokio::test]
async fn test_latest_values_degrade_per_kind() {
    let (server, client) =
        setup_with(|c| c.with_request_timeout(Duration::from_millis(300))).await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/temperature/values"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"value": 21.5, "datetime": "2024-01-01T00:00:00Z"}
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/humidity/values"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/sound/avg_levels"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"value": 40.0}]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let values = client.get_latest_values(&tokens(), "d1").await.unwrap();
    assert_eq!(
        values,
        LatestValues {
            temperature: Some(21.5),
            humidity: None,
            noise: None,
        }
    );
}

#[tokio::test]
async fn test_latest_values_wrapped_shapes() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/temperature/values"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"value": 19.0}, {"value": 19.5}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/humidity/values"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"value": "48.5"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/sound/avg_levels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": []})))
        .mount(&server)
        .await;

    let values = client.get_latest_values(&tokens(), "d1").await.unwrap();
    assert_eq!(values.temperature, Some(19.5));
    assert_eq!(values.humidity, Some(48.5));
    assert_eq!(values.noise, None);
}

#[tokio::test]
async fn test_latest_values_forbidden_aborts() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/temperature/values"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"value": 20}])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/humidity/values"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/sound/avg_levels"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.get_latest_values(&tokens(), "d1").await.unwrap_err();
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_latest_values_rate_limit_propagates() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/temperature/values"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.get_latest_values(&tokens(), "d1").await.unwrap_err();
    assert!(err.is_rate_limited());
}

// ── Timeline ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_recent_events_filters_by_window() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/timeline"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"type": "activity_detected", "timestamp": ago(TimeDelta::seconds(30))},
            {"type": "battery_low", "timestamp": ago(TimeDelta::minutes(10))},
            {"type": "alarm_heard", "timestamp": "not a date"},
        ])))
        .mount(&server)
        .await;

    let events = client
        .get_recent_events(&tokens(), "d1", TimeDelta::minutes(2))
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "activity_detected");
    assert_eq!(events[0].device_id, "d1");
}

#[tokio::test]
async fn test_recent_events_wrapped_shape() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"type": "alarm_heard", "device_id": "d1", "created_at": ago(TimeDelta::seconds(5))},
            ]
        })))
        .mount(&server)
        .await;

    let events = client
        .get_recent_events(&tokens(), "d1", TimeDelta::minutes(2))
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "alarm_heard");
}

#[tokio::test]
async fn test_recent_events_not_found_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/timeline"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let events = client
        .get_recent_events(&tokens(), "d1", TimeDelta::minutes(2))
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_recent_events_timeout_is_empty() {
    let (server, client) =
        setup_with(|c| c.with_request_timeout(Duration::from_millis(200))).await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/timeline"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let events = client
        .get_recent_events(&tokens(), "d1", TimeDelta::minutes(2))
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_recent_events_unauthorized_propagates() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/device/d1/timeline"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client
        .get_recent_events(&tokens(), "d1", TimeDelta::minutes(2))
        .await
        .unwrap_err();
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_account_events_keep_device_attribution() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/draft1/timelines/me"))
        .and(query_param("limit", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"type": "activity_detected", "device_id": "d1", "time": ago(TimeDelta::seconds(10))},
                {"type": "alarm_heard", "device": {"id": "d2"}, "timestamp": ago(TimeDelta::seconds(20))},
                {"type": "alarm_heard", "timestamp": ago(TimeDelta::seconds(20))},
            ]
        })))
        .mount(&server)
        .await;

    let events = client
        .get_account_events(&tokens(), TimeDelta::minutes(2))
        .await
        .unwrap();

    let pairs: Vec<(&str, &str)> = events
        .iter()
        .map(|e| (e.device_id.as_str(), e.event_type.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("d1", "activity_detected"), ("d2", "alarm_heard")]
    );
}
