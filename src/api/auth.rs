//! Mock authentication endpoints and bearer-token middleware

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;

use super::ApiState;
use super::error::ApiError;
use crate::db::{AuthSession, User};

/// Build auth router
pub fn router(state: Arc<ApiState>) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/google", post(google))
        .merge(protected)
        .with_state(state)
}

/// Extract bearer token from Authorization header
fn extract_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Token presented with the request, available to handlers behind the middleware
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Middleware resolving the bearer token to a [`User`] extension
pub async fn require_session(
    State(state): State<Arc<ApiState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_token(&req).map(str::to_string) else {
        tracing::debug!("no session token provided");
        return Err(ApiError::Unauthorized("missing session token".to_string()));
    };

    let Some(user) = state.users.find_by_token(&token)? else {
        tracing::warn!("invalid session token provided");
        return Err(ApiError::Unauthorized("invalid session token".to_string()));
    };

    req.extensions_mut().insert(user);
    req.extensions_mut().insert(SessionToken(token));
    Ok(next.run(req).await)
}

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

async fn register(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthSession>), ApiError> {
    let session = state
        .users
        .register(&request.name, &request.email, &request.password)?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn login(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthSession>, ApiError> {
    Ok(Json(state.users.login(&request.email, &request.password)?))
}

async fn google(State(state): State<Arc<ApiState>>) -> Result<Json<AuthSession>, ApiError> {
    Ok(Json(state.users.login_with_google()?))
}

async fn logout(
    State(state): State<Arc<ApiState>>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<StatusCode, ApiError> {
    state.users.logout(&token)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}
