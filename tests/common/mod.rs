//! Shared test utilities

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use larder::api::ApiServerBuilder;
use larder::{DbPool, db};
use serde_json::Value;
use tower::ServiceExt;

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Build the full API router without voice providers
#[must_use]
pub fn build_test_router(db: DbPool) -> Router {
    ApiServerBuilder::new(db).build().router()
}

/// Sign in through the API, returning the bearer token
pub async fn login(app: &Router, email: &str) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "email": email, "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["token"].as_str().expect("token in response").to_string()
}

/// Send a request with an optional bearer token and JSON body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Selected kitchen ID of the signed-in user
pub async fn selected_kitchen(app: &Router, token: &str) -> String {
    let (status, json) = send(app, "GET", "/api/kitchens/selected", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    json["id"].as_str().expect("kitchen id").to_string()
}
