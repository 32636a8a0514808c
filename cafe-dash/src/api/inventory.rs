//! Stock endpoints

use axum::{extract::State, http::StatusCode};
use cafe_common::db::{InventoryItem, INVENTORY_CATEGORIES, INVENTORY_UNITS};
use serde::Serialize;
use uuid::Uuid;

use super::extract::{Json, Path};
use crate::db::inventory::{self, InventoryInput};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct InventoryEntry {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub low_stock: bool,
}

impl From<InventoryItem> for InventoryEntry {
    fn from(item: InventoryItem) -> Self {
        Self {
            low_stock: item.is_low_stock(),
            item,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InventoryList {
    pub items: Vec<InventoryEntry>,
    pub low_stock_count: usize,
    pub categories: &'static [&'static str],
    pub units: &'static [&'static str],
}

/// GET /api/inventory
pub async fn list_inventory(State(state): State<AppState>) -> ApiResult<Json<InventoryList>> {
    let items: Vec<InventoryEntry> = inventory::list_inventory(&state.db)
        .await?
        .into_iter()
        .map(InventoryEntry::from)
        .collect();
    let low_stock_count = items.iter().filter(|e| e.low_stock).count();
    Ok(Json(InventoryList {
        items,
        low_stock_count,
        categories: &INVENTORY_CATEGORIES,
        units: &INVENTORY_UNITS,
    }))
}

/// POST /api/inventory
pub async fn create_inventory_item(
    State(state): State<AppState>,
    Json(req): Json<InventoryInput>,
) -> ApiResult<(StatusCode, Json<InventoryEntry>)> {
    let item = inventory::create_inventory_item(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// PUT /api/inventory/:id
pub async fn update_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<InventoryInput>,
) -> ApiResult<Json<InventoryEntry>> {
    let item = inventory::update_inventory_item(&state.db, id, &req).await?;
    Ok(Json(item.into()))
}

/// DELETE /api/inventory/:id
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    inventory::delete_inventory_item(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
