//! Menu endpoints

use axum::{extract::State, http::StatusCode};
use cafe_common::db::{Product, PRODUCT_CATEGORIES};
use cafe_common::pricing::{self, margin_for_price, recipe_cost, round2, Quote};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use crate::db::products::{self, IngredientInput, ProductInput, RecipeLine};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub categories: &'static [&'static str],
}

/// Product with its recipe and what it costs to make
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub ingredients: Vec<RecipeLine>,
    pub total_cost: f64,
    /// `null` when the recipe costs nothing
    pub margin_percent: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
    pub price: Option<f64>,
    pub margin_percent: Option<f64>,
}

async fn detail(state: &AppState, product: Product) -> ApiResult<ProductDetail> {
    let ingredients = products::get_recipe(&state.db, product.id).await?;
    let lines: Vec<_> = ingredients.iter().map(RecipeLine::cost_line).collect();
    let total_cost = round2(recipe_cost(&lines));
    Ok(ProductDetail {
        margin_percent: margin_for_price(total_cost, product.price),
        product,
        ingredients,
        total_cost,
    })
}

/// GET /api/products
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<ProductList>> {
    Ok(Json(ProductList {
        products: products::list_products(&state.db).await?,
        categories: &PRODUCT_CATEGORIES,
    }))
}

/// GET /api/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProductDetail>> {
    let product = products::get_product(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {}", id)))?;
    Ok(Json(detail(&state, product).await?))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<ProductInput>,
) -> ApiResult<(StatusCode, Json<ProductDetail>)> {
    let product = products::save_product(&state.db, None, &req).await?;
    Ok((StatusCode::CREATED, Json(detail(&state, product).await?)))
}

/// PUT /api/products/:id
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ProductInput>,
) -> ApiResult<Json<ProductDetail>> {
    let product = products::save_product(&state.db, Some(id), &req).await?;
    Ok(Json(detail(&state, product).await?))
}

/// DELETE /api/products/:id?force=true
///
/// Without `force`, a product that appears in orders is refused.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<StatusCode> {
    products::delete_product(&state.db, id, params.force).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/products/quote
///
/// Cost, price and margin of a draft recipe without saving anything.
pub async fn quote_product(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> ApiResult<Json<Quote>> {
    if matches!(req.price, Some(p) if p <= 0.0) {
        return Err(ApiError::BadRequest("El precio debe ser mayor a cero".to_string()));
    }
    let lines = products::draft_cost_lines(&state.db, &req.ingredients).await?;
    Ok(Json(pricing::quote(
        &lines,
        req.price,
        req.margin_percent,
        state.config.pricing.default_margin_percent,
    )))
}
