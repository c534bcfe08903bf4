//! Inventory endpoints, nested under a kitchen

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use super::ApiState;
use super::error::ApiError;
use crate::db::{InventoryFilter, InventoryItem, InventoryPatch, NewInventoryItem, User};
use crate::store::Depletion;

/// Amount consumed from an inventory item
#[derive(Debug, Deserialize)]
pub struct DecreaseRequest {
    pub amount: f64,
}

pub(super) async fn list(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path(kitchen_id): Path<String>,
    Query(filter): Query<InventoryFilter>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    Ok(Json(state.inventory.list(&kitchen_id, &filter)?))
}

pub(super) async fn add(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path(kitchen_id): Path<String>,
    Json(item): Json<NewInventoryItem>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    let item = state.inventory.add(&kitchen_id, item)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub(super) async fn update(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path((kitchen_id, item_id)): Path<(String, String)>,
    Json(patch): Json<InventoryPatch>,
) -> Result<Json<InventoryItem>, ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    Ok(Json(state.inventory.update(&kitchen_id, &item_id, patch)?))
}

pub(super) async fn remove(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path((kitchen_id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.kitchens.get(&user.id, &kitchen_id)?;
    state.inventory.remove(&kitchen_id, &item_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Consume inventory, queueing a restock when it runs low
pub(super) async fn decrease(
    State(state): State<Arc<ApiState>>,
    Extension(user): Extension<User>,
    Path((kitchen_id, item_id)): Path<(String, String)>,
    Json(request): Json<DecreaseRequest>,
) -> Result<Json<Depletion>, ApiError> {
    let kitchen = state.kitchens.get(&user.id, &kitchen_id)?;
    let depletion = state
        .store(&kitchen.id)
        .decrease_quantity(&item_id, request.amount)?;
    Ok(Json(depletion))
}
