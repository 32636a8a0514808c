//! Wholesale catalog and restock endpoints

use axum::{extract::State, http::StatusCode};
use cafe_common::db::{WholesaleProduct, WHOLESALE_UNITS};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::{Json, Path};
use crate::db::wholesale::{self, RestockReceipt, WholesaleInput};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct WholesaleEntry {
    #[serde(flatten)]
    pub product: WholesaleProduct,
    pub cost_per_unit: f64,
}

impl From<WholesaleProduct> for WholesaleEntry {
    fn from(product: WholesaleProduct) -> Self {
        Self {
            cost_per_unit: product.cost_per_unit(),
            product,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WholesaleList {
    pub products: Vec<WholesaleEntry>,
    pub units: &'static [&'static str],
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
}

/// GET /api/wholesale
pub async fn list_wholesale(State(state): State<AppState>) -> ApiResult<Json<WholesaleList>> {
    let products = wholesale::list_wholesale(&state.db)
        .await?
        .into_iter()
        .map(WholesaleEntry::from)
        .collect();
    Ok(Json(WholesaleList {
        products,
        units: &WHOLESALE_UNITS,
    }))
}

/// POST /api/wholesale
pub async fn create_wholesale(
    State(state): State<AppState>,
    Json(req): Json<WholesaleInput>,
) -> ApiResult<(StatusCode, Json<WholesaleEntry>)> {
    let product = wholesale::create_wholesale(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// DELETE /api/wholesale/:id
pub async fn delete_wholesale(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    wholesale::delete_wholesale(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/wholesale/restock
pub async fn restock(
    State(state): State<AppState>,
    Json(req): Json<RestockRequest>,
) -> ApiResult<Json<RestockReceipt>> {
    Ok(Json(wholesale::restock(&state.db, &req.product_ids).await?))
}
