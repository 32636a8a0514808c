//! Order board endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{sse::Event, Sse},
};
use cafe_common::events::CafeEvent;
use cafe_common::sse::create_event_sse_stream;
use cafe_common::time::now;
use cafe_common::OrderStatus;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::debug;
use uuid::Uuid;

use super::extract::{Json, Path, Query};
use crate::db::orders::{self, NewOrder, OrderWithItems};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Active orders grouped into the board's columns
#[derive(Debug, Serialize)]
pub struct OrderBoard {
    pub pending: Vec<OrderWithItems>,
    pub preparing: Vec<OrderWithItems>,
    pub ready: Vec<OrderWithItems>,
    pub total_active: usize,
}

impl OrderBoard {
    fn from_orders(orders: Vec<OrderWithItems>) -> Self {
        let total_active = orders.len();
        let mut board = OrderBoard {
            pending: Vec::new(),
            preparing: Vec::new(),
            ready: Vec::new(),
            total_active,
        };
        for order in orders {
            match order.order.status {
                OrderStatus::Pending => board.pending.push(order),
                OrderStatus::Preparing => board.preparing.push(order),
                OrderStatus::Ready => board.ready.push(order),
                OrderStatus::Completed => {}
            }
        }
        board
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdvanceParams {
    /// Status the card showed when it was clicked
    pub from: Option<OrderStatus>,
}

/// GET /api/orders
pub async fn list_active_orders(State(state): State<AppState>) -> ApiResult<Json<OrderBoard>> {
    let orders = orders::list_active_orders(&state.db).await?;
    Ok(Json(OrderBoard::from_orders(orders)))
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<OrderWithItems>)> {
    let created = orders::create_order(&state.db, &req).await?;

    state.events.emit_lossy(CafeEvent::OrderCreated {
        order_id: created.order.id,
        customer_name: created.order.customer_name.clone(),
        total: created.order.total,
        timestamp: now(),
    });

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderWithItems>> {
    orders::get_order(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Order {}", id)))
}

/// POST /api/orders/:id/advance[?from=<status>]
pub async fn advance_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<AdvanceParams>,
) -> ApiResult<Json<cafe_common::db::Order>> {
    let record_income = state.config.ledger.record_sales_income;
    let advanced = orders::advance_order(&state.db, id, params.from, record_income).await?;

    state.events.emit_lossy(CafeEvent::OrderStatusChanged {
        order_id: id,
        old_status: advanced.previous,
        new_status: advanced.order.status,
        timestamp: now(),
    });

    Ok(Json(advanced.order))
}

/// DELETE /api/orders/:id
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    orders::delete_order(&state.db, id).await?;

    state.events.emit_lossy(CafeEvent::OrderDeleted {
        order_id: id,
        timestamp: now(),
    });

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/orders/events
///
/// Server-Sent Events stream of board changes.
pub async fn order_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!(
        "Order board subscriber connected ({} already listening)",
        state.events.subscriber_count()
    );
    create_event_sse_stream(&state.events, "cafe-dash")
}
