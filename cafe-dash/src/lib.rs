//! cafe-dash library - café back office service
//!
//! Order board, menu and recipes, stock, cash register, staff, wholesale
//! restocking and sales reports over a JSON API.

use std::sync::Arc;

use axum::Router;
use cafe_common::config::CafeConfig;
use cafe_common::events::EventBus;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;

/// Capacity of the order event broadcast channel
const EVENT_CAPACITY: usize = 100;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Order board events for SSE subscribers
    pub events: EventBus,
    pub config: Arc<CafeConfig>,
    /// Value of the `auth` cookie that grants access for this process lifetime
    pub session_token: Arc<str>,
}

impl AppState {
    /// Create new application state with a fresh session token
    pub fn new(db: SqlitePool, config: CafeConfig) -> Self {
        let salt: [u8; 32] = rand::random();
        let session_token =
            api::auth::session_token(&salt, &config.auth.username, &config.auth.password);
        Self {
            db,
            events: EventBus::new(EVENT_CAPACITY),
            config: Arc::new(config),
            session_token: session_token.into(),
        }
    }
}

/// Build application router
///
/// Everything except `/health` and the login endpoints sits behind the
/// cookie check.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post, put};

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/", get(api::get_dashboard))
        .route("/api/dashboard", get(api::get_dashboard))
        .route("/api/buildinfo", get(api::get_build_info))
        // Orders
        .route("/api/orders", get(api::list_active_orders).post(api::create_order))
        .route("/api/orders/events", get(api::order_events))
        .route("/api/orders/:id", get(api::get_order).delete(api::delete_order))
        .route("/api/orders/:id/advance", post(api::advance_order))
        // Menu
        .route("/api/products", get(api::list_products).post(api::create_product))
        .route("/api/products/quote", post(api::quote_product))
        .route(
            "/api/products/:id",
            get(api::get_product)
                .put(api::update_product)
                .delete(api::delete_product),
        )
        // Stock
        .route("/api/inventory", get(api::list_inventory).post(api::create_inventory_item))
        .route(
            "/api/inventory/:id",
            put(api::update_inventory_item).delete(api::delete_inventory_item),
        )
        // Cash register
        .route("/api/cash-register", get(api::get_cash_register))
        .route("/api/cash-register/expenses", post(api::add_expense))
        .route("/api/cash-register/:id", delete(api::delete_transaction))
        // Staff
        .route("/api/staff", get(api::list_staff).post(api::create_staff))
        .route(
            "/api/staff/:id",
            put(api::update_staff).delete(api::delete_staff),
        )
        // Wholesale
        .route("/api/wholesale", get(api::list_wholesale).post(api::create_wholesale))
        .route("/api/wholesale/restock", post(api::restock))
        .route("/api/wholesale/:id", delete(api::delete_wholesale))
        // Reports
        .route("/api/history", get(api::get_history))
        .route("/api/reports/weekly", get(api::get_weekly_report))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/login", get(api::login_status).post(api::login))
        .route("/logout", post(api::logout))
        .merge(api::health_routes());

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
