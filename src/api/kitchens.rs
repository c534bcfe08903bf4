//! Kitchen endpoints
//!
//! Every route requires a session; kitchens and their items are only visible
//! to their owner.

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::{ApiState, auth, inventory, shopping};
use crate::db::{Kitchen, User};

/// Build kitchens router, including inventory and shopping routes
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(list).post(add))
        .route("/selected", get(selected))
        .route("/{id}", put(rename).delete(remove))
        .route("/{id}/select", post(select))
        .route("/{id}/inventory", get(inventory::list).post(inventory::add))
        .route(
            "/{id}/inventory/{item}",
            put(inventory::update).delete(inventory::remove),
        )
        .route("/{id}/inventory/{item}/decrease", post(inventory::decrease))
        .route("/{id}/shopping", get(shopping::list).post(shopping::add))
        .route("/{id}/shopping/checked", delete(shopping::clear_checked))
        .route(
            "/{id}/shopping/{item}",
            put(shopping::update).delete(shopping::remove),
        )
        .route("/{id}/shopping/{item}/toggle", post(shopping::toggle))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ))
        .with_state(state)
}

/// Kitchen name payload
#[derive(Debug, Deserialize)]
pub struct KitchenName {
    #[serde(default)]
    pub name: String,
}

/// Kitchens with the current selection
#[derive(Debug, Serialize)]
pub struct KitchenList {
    pub kitchens: Vec<Kitchen>,
    pub selected_id: Option<String>,
}

async fn list(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
) -> Result<Json<KitchenList>, ApiError> {
    let kitchens = state.kitchens.list(&user.id)?;
    let selected = state.kitchens.selected(&user.id)?;

    Ok(Json(KitchenList {
        kitchens,
        selected_id: Some(selected.id),
    }))
}

async fn add(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Json(request): Json<KitchenName>,
) -> Result<(StatusCode, Json<Kitchen>), ApiError> {
    let kitchen = state.kitchens.add(&user.id, &request.name)?;
    Ok((StatusCode::CREATED, Json(kitchen)))
}

async fn selected(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Kitchen>, ApiError> {
    Ok(Json(state.kitchens.selected(&user.id)?))
}

async fn rename(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Json(request): Json<KitchenName>,
) -> Result<Json<Kitchen>, ApiError> {
    Ok(Json(state.kitchens.rename(&user.id, &id, &request.name)?))
}

async fn remove(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.kitchens.remove(&user.id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn select(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Kitchen>, ApiError> {
    Ok(Json(state.kitchens.select(&user.id, &id)?))
}
