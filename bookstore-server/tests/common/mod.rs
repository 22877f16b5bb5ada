//! Shared helpers for integration tests: in-memory app + tiny HTTP client
#![allow(dead_code)]

use axum::body::Body;
use axum::Router;
use http::{header, HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use bookstore_server::auth::hash_password;
use bookstore_server::db::repository::user;
use bookstore_server::db::DbService;
use bookstore_server::{Config, Server, ServerState};

pub const SESSION_HEADER: &str = "x-session-token";

pub async fn test_state() -> ServerState {
    let config = Config {
        database_path: ":memory:".into(),
        http_port: 0,
        environment: "test".into(),
        session_ttl_minutes: 30,
        log_dir: None,
        smtp_server: String::new(),
        smtp_port: 587,
        smtp_sender: String::new(),
        smtp_password: String::new(),
        smtp_sender_name: "Test".into(),
        sms_api_url: String::new(),
        sms_api_key: String::new(),
        sms_secret_key: String::new(),
        sms_brand_name: "TEST".into(),
    };
    let db = DbService::in_memory().await.expect("in-memory db");
    ServerState::with_db(config, db)
}

pub async fn test_app() -> (Router, ServerState) {
    let state = test_state().await;
    (Server::build_app(state.clone()), state)
}

/// One request against the app; returns status, headers and parsed JSON body
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, HeaderMap, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, headers, json)
}

/// Open a fresh anonymous session and return its token
pub async fn open_session(app: &Router) -> String {
    let (status, headers, _) = send(app, Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::OK);
    headers
        .get(SESSION_HEADER)
        .expect("new session token")
        .to_str()
        .unwrap()
        .to_string()
}

/// Create a user with the given role and log them in; returns the
/// session token.
pub async fn login_as(
    app: &Router,
    state: &ServerState,
    email: &str,
    role_name: &str,
) -> String {
    let hash = hash_password("password123").unwrap();
    let u = user::create(&state.pool, "Test User", email, None, &hash, true)
        .await
        .unwrap();
    user::assign_role_by_name(&state.pool, u.id, role_name)
        .await
        .unwrap();

    let token = open_session(app).await;
    let (status, _, _) = send(
        app,
        Method::POST,
        "/api/account/login",
        Some(&token),
        Some(serde_json::json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed for {email}");
    token
}
