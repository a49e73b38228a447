mod support;

use std::{
    sync::{Arc, Mutex, atomic::Ordering},
    time::Duration,
};

use axum::http::StatusCode;
use futures::future::BoxFuture;
use haunted_house_back::dao::{
    models::{StoredTokens, TokenRecord},
    storage::StorageResult,
    token_store::TokenStore,
};
use serde_json::json;

use support::{FakeUpstream, TestApp, accept_grant, directive, json_request};

async fn linked_app() -> (FakeUpstream, TestApp) {
    let upstream = FakeUpstream::spawn().await;
    let app = TestApp::new(upstream.config());
    let (status, body) = app
        .post_json("/alexa/smarthome", accept_grant("good-code", "grantee-1"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["header"]["name"], "AcceptGrant.Response");
    (upstream, app)
}

#[tokio::test]
async fn accept_grant_stores_event_gateway_tokens() {
    let (upstream, app) = linked_app().await;

    assert_eq!(upstream.calls.token_calls(), 1);
    assert_eq!(
        app.state.tokens().get_all_event_gateway_tokens().await,
        vec!["access-1".to_string()]
    );
    let (_, body) = app.get("/debug/tokens").await;
    assert_eq!(body["totalSessions"], 1);
    assert_eq!(body["totalRefreshTokens"], 1);
}

#[tokio::test]
async fn failed_grant_exchange_returns_alexa_error_event() {
    let upstream = FakeUpstream::spawn().await;
    let app = TestApp::new(upstream.config());

    let (status, body) = app
        .post_json("/api/alexa/handle-grant", accept_grant("bad-code", "grantee-1"))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["event"]["header"]["namespace"], "Alexa.Authorization");
    assert_eq!(body["event"]["header"]["name"], "ErrorResponse");
    assert_eq!(body["event"]["header"]["messageId"], "message-1");
    assert_eq!(body["event"]["payload"]["type"], "ACCEPT_GRANT_FAILED");
    assert!(app.state.tokens().get_event_gateway_token().await.is_none());
}

fn report_state(endpoint_id: &str, token: Option<&str>) -> serde_json::Value {
    let mut endpoint = json!({ "endpointId": endpoint_id });
    if let Some(token) = token {
        endpoint["scope"] = json!({ "type": "BearerToken", "token": token });
    }
    directive("Alexa", "ReportState", Some(endpoint), json!({}))
}

#[tokio::test]
async fn report_state_validates_the_bearer_through_tokeninfo() {
    let upstream = FakeUpstream::spawn().await;
    let app = TestApp::new(upstream.config());

    let (status, _) = app
        .post_json(
            "/alexa/smarthome",
            report_state("haunted-blackout-sensor", Some("stolen-token")),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post_json(
            "/alexa/smarthome",
            report_state("haunted-blackout-sensor", Some("foreign-token")),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post_json(
            "/alexa/smarthome",
            report_state("haunted-blackout-sensor", Some("valid-token")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["event"]["header"]["name"], "StateReport");
    assert_eq!(body["event"]["header"]["correlationToken"], "correlation-1");
    assert_eq!(body["event"]["endpoint"]["endpointId"], "haunted-blackout-sensor");
    let properties = body["context"]["properties"].as_array().unwrap();
    assert_eq!(properties[0]["name"], "detectionState");
    assert_eq!(properties[0]["value"], "NOT_DETECTED");
    assert_eq!(properties[1]["namespace"], "Alexa.EndpointHealth");
    assert_eq!(properties[1]["value"]["value"], "OK");
}

#[tokio::test]
async fn report_state_accepts_the_authorization_header_and_unknown_endpoints() {
    let upstream = FakeUpstream::spawn().await;
    let app = TestApp::new(upstream.config());

    let request = json_request(
        "POST",
        "/alexa/smarthome",
        &report_state("haunted-fog-sensor", None),
        &[("Authorization", "Bearer valid-token")],
    );
    let (status, _, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context"]["properties"][0]["value"], "NOT_DETECTED");
}

#[tokio::test]
async fn report_state_reflects_a_fresh_trigger() {
    let (_upstream, app) = linked_app().await;
    let (status, _) = app
        .post_json("/api/trigger-direct", json!({ "effect": "blackout" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .post_json(
            "/alexa/smarthome",
            report_state("haunted-blackout-sensor", Some("valid-token")),
        )
        .await;
    assert_eq!(body["context"]["properties"][0]["value"], "DETECTED");
}

#[tokio::test]
async fn trigger_direct_reaches_every_channel() {
    let (upstream, app) = linked_app().await;
    let request = json_request(
        "PUT",
        "/api/lights/session-1",
        &json!({ "lights": [{ "type": "tapo", "address": "192.168.1.40", "name": "Porch" }] }),
        &[],
    );
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post_json(
            "/api/trigger-direct",
            json!({ "effect": "flash_red", "sessionId": "session-1" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["sensor"]["success"], true);
    assert_eq!(body["sensor"]["usersTriggered"], 1);
    assert_eq!(body["sensor"]["totalUsers"], 1);
    assert_eq!(body["ifttt"]["success"], true);
    assert_eq!(body["lights"]["success"], true);
    assert_eq!(body["lights"]["message"], "Controlled 1/1 lights");

    let events = upstream.calls.events();
    let (token, event) = &events[0];
    assert_eq!(token, "access-1");
    assert_eq!(event["event"]["header"]["name"], "ChangeReport");
    assert_eq!(event["event"]["endpoint"]["endpointId"], "haunted-flash-red-sensor");
    assert_eq!(event["event"]["endpoint"]["scope"]["token"], "access-1");
    assert_eq!(
        event["event"]["payload"]["change"]["properties"][0]["value"],
        "DETECTED"
    );

    let maker = upstream.calls.maker();
    assert_eq!(maker[0].0, "haunted_flash_red");
    assert_eq!(maker[0].1["value1"], "flash_red");
    assert_eq!(maker[0].1["value2"], "haunted_trigger");

    let lights = upstream.calls.lights();
    assert_eq!(lights[0]["address"], "192.168.1.40");
    assert_eq!(lights[0]["type"], "tapo");
    assert_eq!(lights[0]["action"], "flash_red");

    assert_eq!(app.sensor_state("haunted-flash-red-sensor").await, "DETECTED");
}

#[tokio::test]
async fn reset_report_waits_for_a_slow_detected_report() {
    let (upstream, app) = linked_app().await;
    upstream.calls.detected_delay_ms.store(3_000, Ordering::SeqCst);

    let (status, body) = app
        .post_json("/api/trigger-direct", json!({ "effect": "blackout" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sensor"]["usersTriggered"], 1);
    // The local state already flipped back while the gateway was stalling.
    assert_eq!(app.sensor_state("haunted-blackout-sensor").await, "NOT_DETECTED");

    tokio::time::sleep(Duration::from_millis(500)).await;
    let values: Vec<String> = upstream
        .calls
        .events()
        .iter()
        .map(|(_, event)| {
            event["event"]["payload"]["change"]["properties"][0]["value"]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .collect();
    assert_eq!(values, vec!["DETECTED", "NOT_DETECTED"]);
}

#[tokio::test]
async fn expired_token_is_refreshed_once_and_retried() {
    let upstream = FakeUpstream::spawn().await;
    let app = TestApp::new(upstream.config());
    app.state
        .tokens()
        .store_event_gateway_token("grantee-1", "expired", Some("refresh-1".into()))
        .await;

    let (_, body) = app
        .post_json("/api/trigger-direct", json!({ "effect": "reset" }))
        .await;

    assert_eq!(body["sensor"]["success"], true);
    assert_eq!(body["sensor"]["usersTriggered"], 1);
    assert_eq!(body["sensor"]["reconnectRequired"], 0);
    assert_eq!(upstream.calls.token_calls(), 1);
    assert_eq!(upstream.calls.events()[0].0, "access-2");
    assert_eq!(
        app.state.tokens().get_all_event_gateway_tokens().await,
        vec!["access-2".to_string()]
    );
}

#[tokio::test]
async fn unrefreshable_token_requires_reconnect() {
    let upstream = FakeUpstream::spawn().await;
    let app = TestApp::new(upstream.config());
    let tokens = app.state.tokens();
    tokens
        .store_event_gateway_token("grantee-1", "access-stale", Some("revoked".into()))
        .await;
    tokens
        .store_event_gateway_token("grantee-2", "expired", None)
        .await;

    let (status, body) = app
        .post_json("/api/trigger-direct", json!({ "effect": "blackout" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sensor"]["success"], false);
    assert_eq!(body["sensor"]["totalUsers"], 2);
    assert_eq!(body["sensor"]["usersTriggered"], 0);
    assert_eq!(body["sensor"]["reconnectRequired"], 2);
    // Only the user with a refresh token on file reaches the token endpoint.
    assert_eq!(upstream.calls.token_calls(), 1);
    assert!(upstream.calls.events().is_empty());
}

/// Durable store whose access keys have all expired, leaving only refresh tokens behind.
#[derive(Clone, Default)]
struct ExpiredAccessStore {
    stored: Arc<Mutex<Vec<StoredTokens>>>,
    saved: Arc<Mutex<Vec<TokenRecord>>>,
}

impl TokenStore for ExpiredAccessStore {
    fn save_tokens(&self, record: TokenRecord) -> BoxFuture<'static, StorageResult<()>> {
        self.saved.lock().unwrap().push(record);
        Box::pin(async { Ok(()) })
    }

    fn list_tokens(&self) -> BoxFuture<'static, StorageResult<Vec<StoredTokens>>> {
        let stored = self.stored.lock().unwrap().clone();
        Box::pin(async move { Ok(stored) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[tokio::test]
async fn refresh_only_grantee_in_store_is_revived() {
    let upstream = FakeUpstream::spawn().await;
    let app = TestApp::new(upstream.config());
    let store = ExpiredAccessStore::default();
    store.stored.lock().unwrap().push(StoredTokens {
        grantee_token: "grantee-1".into(),
        access_token: None,
        refresh_token: Some("refresh-1".into()),
    });

    app.state.tokens().install_store(Arc::new(store.clone())).await;

    assert_eq!(upstream.calls.token_calls(), 1);
    assert_eq!(
        app.state.tokens().get_all_event_gateway_tokens().await,
        vec!["access-2".to_string()]
    );
    assert_eq!(
        store.saved.lock().unwrap().clone(),
        vec![TokenRecord::new("grantee-1", "access-2", Some("refresh-2".into()))]
    );

    let (_, body) = app
        .post_json("/api/trigger-direct", json!({ "effect": "blackout" }))
        .await;
    assert_eq!(body["sensor"]["usersTriggered"], 1);
    assert_eq!(upstream.calls.events()[0].0, "access-2");
    // Already revived; hydration does not exchange the refresh token again.
    assert_eq!(upstream.calls.token_calls(), 1);
}

#[tokio::test]
async fn refresh_without_refresh_token_makes_no_network_call() {
    let upstream = FakeUpstream::spawn().await;
    let app = TestApp::new(upstream.config());
    app.state
        .tokens()
        .store_event_gateway_token("grantee-1", "access-1", None)
        .await;

    assert_eq!(app.state.tokens().refresh_access_token("access-1").await, None);
    assert_eq!(upstream.calls.token_calls(), 0);
}

#[tokio::test]
async fn fallback_trigger_forwards_events_and_effects_to_maker() {
    let upstream = FakeUpstream::spawn().await;
    let app = TestApp::new(upstream.config());

    let (status, body) = app
        .post_json(
            "/api/trigger",
            json!({ "event": "porch_scream", "payload": { "volume": 11 } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["via"], "maker_event");

    let (status, body) = app
        .post_json("/api/trigger", json!({ "effect": "plug-on" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["via"], "maker");

    let maker = upstream.calls.maker();
    assert_eq!(maker[0].0, "porch_scream");
    assert_eq!(maker[0].1["volume"], 11);
    assert_eq!(maker[1].0, "haunted_plug_on");
    assert_eq!(app.state.effect_feed().len().await, 1);
}
