//! Dashboard, daily history and weekly report endpoints

use axum::extract::State;
use cafe_common::time::{parse_day, today};
use serde::{Deserialize, Serialize};

use super::extract::{Json, Query};
use crate::db::reports::{self, DailyHistory, DashboardCounts, WeeklyReport};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// `YYYY-MM-DD`; today (UTC) when absent
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    /// `connected` or `error`
    pub database: &'static str,
    #[serde(flatten)]
    pub counts: DashboardCounts,
}

/// GET / and GET /api/dashboard
///
/// An unreachable database shows as `error` with zeroed counters.
pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    if !reports::ping(&state.db).await {
        return Ok(Json(Dashboard {
            database: "error",
            counts: DashboardCounts::default(),
        }));
    }
    let counts = reports::dashboard_counts(&state.db, today()).await?;
    Ok(Json(Dashboard {
        database: "connected",
        counts,
    }))
}

/// GET /api/history?date=YYYY-MM-DD
pub async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<DailyHistory>> {
    let day = match params.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => parse_day(d)?,
        None => today(),
    };
    Ok(Json(reports::daily_history(&state.db, day).await?))
}

/// GET /api/reports/weekly
pub async fn get_weekly_report(State(state): State<AppState>) -> ApiResult<Json<WeeklyReport>> {
    Ok(Json(reports::weekly_report(&state.db, today()).await?))
}
