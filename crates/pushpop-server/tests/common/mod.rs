#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use pushpop_core::config::{Config, WizardCredentials};
use pushpop_duckdb::DuckDbBackend;
use pushpop_server::app::build_app;
use pushpop_server::push::PushSender;
use pushpop_server::state::AppState;

pub const TEST_PASSWORD: &str = "correct horse battery";
pub const WIZARD_EMAIL: &str = "wizard@pushpop.test";
pub const WIZARD_PASSWORD: &str = "abracadabra";

/// Config with low argon2 memory, no `Secure` cookies and wizard credentials.
pub fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/pushpop-test".to_string(),
        duckdb_memory_limit: "1GB".to_string(),
        https: false,
        session_days: 7,
        session_secret: Some("test-session-secret".to_string()),
        argon2_memory_kb: 1024,
        public_url: "http://localhost:3000".to_string(),
        wizard: Some(WizardCredentials {
            email: WIZARD_EMAIL.to_string(),
            password: WIZARD_PASSWORD.to_string(),
        }),
        fcm_service_account: None,
        verify_timeout_secs: 5,
    }
}

pub async fn setup_with(
    config: Config,
    push: Option<Arc<dyn PushSender>>,
) -> (Arc<AppState>, axum::Router) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let mut state = AppState::new(db, config).await.expect("app state");
    if let Some(sender) = push {
        state = state.with_push_sender(sender);
    }
    let state = Arc::new(state);
    let app = build_app(Arc::clone(&state));
    (state, app)
}

pub async fn setup() -> (Arc<AppState>, axum::Router) {
    setup_with(test_config(), None).await
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

pub async fn text_body(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("build request")
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).expect("build request")
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("request")
}

/// `name=value` part of the response's `Set-Cookie` header.
pub fn cookie_from(response: &Response<Body>) -> String {
    response
        .headers()
        .get("set-cookie")
        .expect("Set-Cookie header must be present")
        .to_str()
        .expect("valid header string")
        .split(';')
        .next()
        .expect("cookie value")
        .to_string()
}

pub async fn register(app: &axum::Router, email: &str) -> Value {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/register",
            json!({ "name": "Test User", "email": email, "password": TEST_PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["data"].clone()
}

pub async fn login(app: &axum::Router, email: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            json!({ "email": email, "password": TEST_PASSWORD }),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    cookie_from(&response)
}

/// Register a fresh account and return its session cookie.
pub async fn register_and_login(app: &axum::Router, email: &str) -> String {
    register(app, email).await;
    login(app, email).await
}

pub async fn create_site(app: &axum::Router, cookie: &str, domain: &str) -> String {
    let response = send(
        app,
        json_request("POST", "/api/sites", json!({ "domain": domain }), Some(cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["data"]["id"]
        .as_str()
        .expect("site id")
        .to_string()
}

/// Create a popup on `site_id`; `extra` fields are merged into the body.
pub async fn create_popup(app: &axum::Router, cookie: &str, site_id: &str, extra: Value) -> Value {
    let mut body = json!({ "siteId": site_id, "title": "Join us" });
    if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            obj.insert(k.clone(), v.clone());
        }
    }
    let response = send(app, json_request("POST", "/api/popups", body, Some(cookie))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["data"].clone()
}
