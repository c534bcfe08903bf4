//! Shopping list endpoints, nested under a kitchen

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;

use super::ApiState;
use super::error::ApiError;
use crate::db::{NewShoppingItem, ShoppingFilter, ShoppingItem, ShoppingPatch, User};

/// Result of clearing checked items
#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub removed: usize,
}

pub(super) async fn list(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path(kitchen_id): Path<String>,
    Query(filter): Query<ShoppingFilter>,
) -> Result<Json<Vec<ShoppingItem>>, ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    Ok(Json(state.shopping.list(&kitchen_id, &filter)?))
}

/// Add an item, merging with an entry of the same name and unit
pub(super) async fn add(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path(kitchen_id): Path<String>,
    Json(item): Json<NewShoppingItem>,
) -> Result<(StatusCode, Json<ShoppingItem>), ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    let item = state.shopping.add(&kitchen_id, item)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub(super) async fn update(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path((kitchen_id, item_id)): Path<(String, String)>,
    Json(patch): Json<ShoppingPatch>,
) -> Result<Json<ShoppingItem>, ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    Ok(Json(state.shopping.update(&kitchen_id, &item_id, patch)?))
}

pub(super) async fn remove(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path((kitchen_id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    state.shopping.remove(&kitchen_id, &item_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn toggle(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path((kitchen_id, item_id)): Path<(String, String)>,
) -> Result<Json<ShoppingItem>, ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    Ok(Json(state.shopping.toggle_checked(&kitchen_id, &item_id)?))
}

pub(super) async fn clear_checked(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path(kitchen_id): Path<String>,
) -> Result<Json<ClearedResponse>, ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    let removed = state.shopping.clear_checked(&kitchen_id)?;
    Ok(Json(ClearedResponse { removed }))
}
