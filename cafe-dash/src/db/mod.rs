//! Database access layer for cafe-dash
//!
//! One module per table group. Functions that must run inside a larger
//! transaction take `&mut SqliteConnection`; the rest take the pool.

use cafe_common::{Error, Result};
use uuid::Uuid;

pub mod inventory;
pub mod orders;
pub mod products;
pub mod reports;
pub(crate) mod retry;
pub mod staff;
pub mod transactions;
pub mod wholesale;

/// Parse an id column
pub(crate) fn parse_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Corrupt id '{}': {}", s, e)))
}

/// Trimmed copy of a required text field
pub(crate) fn required_text(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(message.to_string()));
    }
    Ok(trimmed.to_string())
}
