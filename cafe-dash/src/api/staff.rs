//! Staff roster endpoints

use axum::{extract::State, http::StatusCode};
use cafe_common::db::StaffMember;
use uuid::Uuid;

use super::extract::{Json, Path};
use crate::db::staff::{self, StaffInput};
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/staff
pub async fn list_staff(State(state): State<AppState>) -> ApiResult<Json<Vec<StaffMember>>> {
    Ok(Json(staff::list_staff(&state.db).await?))
}

/// POST /api/staff
pub async fn create_staff(
    State(state): State<AppState>,
    Json(req): Json<StaffInput>,
) -> ApiResult<(StatusCode, Json<StaffMember>)> {
    let member = staff::create_staff(&state.db, &req).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// PUT /api/staff/:id
pub async fn update_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StaffInput>,
) -> ApiResult<Json<StaffMember>> {
    Ok(Json(staff::update_staff(&state.db, id, &req).await?))
}

/// DELETE /api/staff/:id
pub async fn delete_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    staff::delete_staff(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
