//! # Café Common Library
//!
//! Shared code for the café back office including:
//! - Database schema and row models
//! - Order lifecycle and event types
//! - Pricing and ledger arithmetic
//! - Configuration loading
//! - Timestamp and SSE utilities

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod ledger;
pub mod order_status;
pub mod pricing;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use order_status::OrderStatus;
