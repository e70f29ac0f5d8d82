mod common;

use common::{ANSWER_SDP, OFFER_SDP};
use realtime_rtc_lib::config::SignalingConfig;
use realtime_rtc_lib::credentials::{ApiKey, EphemeralCredential};
use realtime_rtc_lib::error::SignalingError;
use realtime_rtc_lib::signaling::{HttpSignaling, SignalingTransport};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gpt-4o-realtime-preview";

fn client(base: &str, timeout: Duration) -> HttpSignaling {
    HttpSignaling::new(SignalingConfig {
        api_key: ApiKey::new("sk-test"),
        model: MODEL.into(),
        sessions_url: format!("{base}/v1/realtime/sessions"),
        realtime_url: format!("{base}/v1/realtime"),
        request_timeout: timeout,
    })
    .unwrap()
}

#[tokio::test]
async fn credential_is_extracted_from_nested_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/realtime/sessions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "model": MODEL })))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(
                r#"{"client_secret":{"value":"ek_abc123","expires_at":1700000000}}"#,
            ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let cred = client(&server.uri(), Duration::from_secs(5))
        .fetch_credential()
        .await
        .unwrap();

    assert_eq!(cred.expose(), "ek_abc123");
    assert!(cred.expires_at().is_some());
}

#[tokio::test]
async fn error_payload_yields_no_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/realtime/sessions"))
        .respond_with(ResponseTemplate::new(429).set_body_string(r#"{"error":"rate_limited"}"#))
        .mount(&server)
        .await;

    let err = client(&server.uri(), Duration::from_secs(5))
        .fetch_credential()
        .await
        .unwrap_err();

    assert!(matches!(err, SignalingError::MissingField("client_secret")));
}

#[tokio::test]
async fn offer_is_posted_as_sdp_with_ephemeral_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/realtime"))
        .and(query_param("model", MODEL))
        .and(header("authorization", "Bearer ek_abc123"))
        .and(header("content-type", "application/sdp"))
        .and(header("accept", "application/sdp"))
        .and(body_string(OFFER_SDP))
        .respond_with(ResponseTemplate::new(201).set_body_string(ANSWER_SDP))
        .expect(1)
        .mount(&server)
        .await;

    let credential = EphemeralCredential::new("ek_abc123", None);
    let answer = client(&server.uri(), Duration::from_secs(5))
        .exchange_description(OFFER_SDP, &credential)
        .await
        .unwrap();

    assert_eq!(answer, ANSWER_SDP);
}

#[tokio::test]
async fn empty_exchange_body_is_returned_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/realtime"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let credential = EphemeralCredential::new("ek_abc123", None);
    let answer = client(&server.uri(), Duration::from_secs(5))
        .exchange_description(OFFER_SDP, &credential)
        .await
        .unwrap();

    assert!(answer.is_empty());
}

#[tokio::test]
async fn slow_endpoint_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/realtime/sessions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"client_secret":{"value":"ek_late"}}"#)
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client(&server.uri(), Duration::from_millis(200))
        .fetch_credential()
        .await
        .unwrap_err();

    match err {
        SignalingError::Transport(e) => assert!(e.is_timeout()),
        other => panic!("expected transport timeout, got {other:?}"),
    }
}
