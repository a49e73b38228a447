#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    body::{Body, to_bytes},
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use haunted_house_back::{
    build_router,
    config::{AlexaConfig, AppConfig, IftttConfig},
    state::{AppState, SharedState},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const SERVICE_KEY: &str = "service-key";
pub const IFTTT_CLIENT_ID: &str = "ifttt";
pub const IFTTT_CLIENT_SECRET: &str = "ifttt-secret";
pub const REDIRECT_URI: &str = "https://ifttt.com/channels/haunted/authorize";

/// Requests observed by the fake upstream.
#[derive(Default)]
pub struct Calls {
    pub token: AtomicUsize,
    /// Milliseconds the gateway stalls before acknowledging a `DETECTED` report.
    pub detected_delay_ms: AtomicU64,
    pub tokeninfo: AtomicUsize,
    pub events: Mutex<Vec<(String, Value)>>,
    pub maker: Mutex<Vec<(String, Value)>>,
    pub lights: Mutex<Vec<Value>>,
}

impl Calls {
    pub fn token_calls(&self) -> usize {
        self.token.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn maker(&self) -> Vec<(String, Value)> {
        self.maker.lock().unwrap().clone()
    }

    pub fn lights(&self) -> Vec<Value> {
        self.lights.lock().unwrap().clone()
    }
}

/// Stand-in for Amazon (LWA + Event Gateway), IFTTT Maker and the light bridge.
pub struct FakeUpstream {
    pub base_url: String,
    pub calls: Arc<Calls>,
}

impl FakeUpstream {
    pub async fn spawn() -> Self {
        let calls = Arc::new(Calls::default());
        let app = Router::new()
            .route("/auth/o2/token", post(lwa_token))
            .route("/auth/o2/tokeninfo", get(lwa_tokeninfo))
            .route("/v3/events", post(gateway_event))
            .route("/trigger/{event}/with/key/{key}", post(maker_trigger))
            .route("/trigger/{event}/json/with/key/{key}", post(maker_trigger))
            .route("/lights/effect", post(light_effect))
            .with_state(calls.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            calls,
        }
    }

    /// Configuration with every integration pointed at this upstream.
    pub fn config(&self) -> AppConfig {
        AppConfig {
            alexa: AlexaConfig {
                client_id: Some("alexa-client".into()),
                client_secret: Some("alexa-secret".into()),
                lwa_client_id: Some("lwa-client".into()),
                lwa_client_secret: None,
                event_gateway_url: format!("{}/v3/events", self.base_url),
                token_url: format!("{}/auth/o2/token", self.base_url),
                tokeninfo_url: format!("{}/auth/o2/tokeninfo", self.base_url),
            },
            ifttt: IftttConfig {
                webhook_key: Some("maker-key".into()),
                maker_url: self.base_url.clone(),
                ..ifttt_config()
            },
            light_bridge_url: Some(self.base_url.clone()),
            ..AppConfig::default()
        }
    }
}

async fn lwa_token(
    State(calls): State<Arc<Calls>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    calls.token.fetch_add(1, Ordering::SeqCst);
    let field = |name: &str| form.get(name).map(String::as_str);

    match (field("grant_type"), field("code"), field("refresh_token")) {
        (Some("authorization_code"), Some("good-code"), _) => (
            StatusCode::OK,
            Json(json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "token_type": "bearer",
                "expires_in": 3600
            })),
        ),
        (Some("refresh_token"), _, Some("refresh-1")) => (
            StatusCode::OK,
            Json(json!({
                "access_token": "access-2",
                "refresh_token": "refresh-2",
                "token_type": "bearer",
                "expires_in": 3600
            })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        ),
    }
}

async fn lwa_tokeninfo(
    State(calls): State<Arc<Calls>>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    calls.tokeninfo.fetch_add(1, Ordering::SeqCst);
    match query.get("access_token").map(String::as_str) {
        Some("valid-token") => (
            StatusCode::OK,
            Json(json!({ "aud": "lwa-client", "user_id": "amzn1.account.demo" })),
        ),
        Some("foreign-token") => (
            StatusCode::OK,
            Json(json!({ "aud": "another-client", "user_id": "amzn1.account.other" })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_token" })),
        ),
    }
}

async fn gateway_event(
    State(calls): State<Arc<Calls>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    if token == "expired" || token == "access-stale" {
        return StatusCode::UNAUTHORIZED;
    }
    let detected = body["event"]["payload"]["change"]["properties"][0]["value"] == "DETECTED";
    let delay = calls.detected_delay_ms.load(Ordering::SeqCst);
    if detected && delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    calls.events.lock().unwrap().push((token, body));
    StatusCode::ACCEPTED
}

async fn maker_trigger(
    State(calls): State<Arc<Calls>>,
    Path((event, _key)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> &'static str {
    calls.maker.lock().unwrap().push((event, body));
    "Congratulations! You've fired the event"
}

async fn light_effect(State(calls): State<Arc<Calls>>, Json(body): Json<Value>) -> StatusCode {
    calls.lights.lock().unwrap().push(body);
    StatusCode::OK
}

fn ifttt_config() -> IftttConfig {
    IftttConfig {
        service_key: Some(SERVICE_KEY.into()),
        client_id: Some(IFTTT_CLIENT_ID.into()),
        client_secret: Some(IFTTT_CLIENT_SECRET.into()),
        ..IftttConfig::default()
    }
}

/// Configuration with no Alexa users, no Maker key and no light bridge: nothing leaves the process.
pub fn offline_config() -> AppConfig {
    AppConfig {
        ifttt: ifttt_config(),
        ..AppConfig::default()
    }
}

pub struct TestApp {
    pub state: SharedState,
    pub router: Router,
}

impl TestApp {
    pub fn new(config: AppConfig) -> Self {
        let state = AppState::new(config).unwrap();
        let router = build_router(state.clone());
        Self { state, router }
    }

    pub fn offline() -> Self {
        Self::new(offline_config())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, body)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let (status, _, body) = self.send(json_request("POST", uri, &body, &[])).await;
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _, body) = self.send(request).await;
        (status, body)
    }

    pub async fn sensor_state(&self, endpoint_id: &str) -> String {
        let (_, body) = self.get("/api/sensor-states").await;
        body["states"][endpoint_id].as_str().unwrap_or_default().to_string()
    }

    /// Token handed out by `/ifttt/v1/test/setup`.
    pub async fn ifttt_test_token(&self) -> String {
        let request = json_request(
            "POST",
            "/ifttt/v1/test/setup",
            &json!({}),
            &[("IFTTT-Service-Key", SERVICE_KEY)],
        );
        let (status, _, body) = self.send(request).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    body: &Value,
    headers: &[(&str, &str)],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn form_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencode(value)))
        .collect::<Vec<_>>()
        .join("&");
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn urlencode(value: &str) -> String {
    value
        .bytes()
        .map(|byte| match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (byte as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect()
}

/// Alexa directive envelope.
pub fn directive(namespace: &str, name: &str, endpoint: Option<Value>, payload: Value) -> Value {
    let mut directive = json!({
        "directive": {
            "header": {
                "namespace": namespace,
                "name": name,
                "payloadVersion": "3",
                "messageId": "message-1",
                "correlationToken": "correlation-1"
            },
            "payload": payload
        }
    });
    if let Some(endpoint) = endpoint {
        directive["directive"]["endpoint"] = endpoint;
    }
    directive
}

pub fn accept_grant(code: &str, grantee: &str) -> Value {
    directive(
        "Alexa.Authorization",
        "AcceptGrant",
        None,
        json!({
            "grant": { "type": "OAuth2.AuthorizationCode", "code": code },
            "grantee": { "type": "BearerToken", "token": grantee }
        }),
    )
}
