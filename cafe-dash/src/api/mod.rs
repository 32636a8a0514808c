//! HTTP API handlers for cafe-dash

pub mod auth;
pub mod buildinfo;
pub mod cash_register;
pub mod extract;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod reports;
pub mod staff;
pub mod wholesale;

pub use auth::{auth_middleware, login, login_status, logout};
pub use buildinfo::get_build_info;
pub use cash_register::{add_expense, delete_transaction, get_cash_register};
pub use health::health_routes;
pub use inventory::{
    create_inventory_item, delete_inventory_item, list_inventory, update_inventory_item,
};
pub use orders::{
    advance_order, create_order, delete_order, get_order, list_active_orders, order_events,
};
pub use products::{
    create_product, delete_product, get_product, list_products, quote_product, update_product,
};
pub use reports::{get_dashboard, get_history, get_weekly_report};
pub use staff::{create_staff, delete_staff, list_staff, update_staff};
pub use wholesale::{create_wholesale, delete_wholesale, list_wholesale, restock};
