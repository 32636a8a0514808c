//! Cash register ledger persistence

use cafe_common::db::Transaction;
use cafe_common::ledger::TransactionKind;
use cafe_common::time::{format_timestamp, now, parse_timestamp};
use cafe_common::{Error, Result};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::{parse_id, required_text};

/// Category of income recorded when an order is completed
pub const SALES_CATEGORY: &str = "Ventas";

/// Manual expense entry from the cash register screen
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseInput {
    #[serde(default)]
    pub description: String,
    pub amount: Option<f64>,
    #[serde(default)]
    pub category: String,
}

fn transaction_from_row(row: &SqliteRow) -> Result<Transaction> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    let kind: String = row.try_get("type")?;
    Ok(Transaction {
        id: parse_id(&id)?,
        created_at: parse_timestamp(&created_at)?,
        kind: kind.parse()?,
        amount: row.try_get("amount")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
    })
}

/// All movements, newest first
pub async fn list_transactions(pool: &SqlitePool) -> Result<Vec<Transaction>> {
    let rows = sqlx::query(
        r#"
        SELECT id, created_at, type, amount, description, category
        FROM transactions
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    rows.iter().map(transaction_from_row).collect()
}

/// Record a movement stamped with the current time
pub(crate) async fn insert_transaction(
    conn: &mut SqliteConnection,
    kind: TransactionKind,
    amount: f64,
    description: &str,
    category: &str,
) -> Result<Transaction> {
    let transaction = Transaction {
        id: Uuid::new_v4(),
        created_at: now(),
        kind,
        amount,
        description: description.to_string(),
        category: category.to_string(),
    };

    sqlx::query(
        r#"
        INSERT INTO transactions (id, created_at, type, amount, description, category)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(transaction.id.to_string())
    .bind(format_timestamp(transaction.created_at))
    .bind(kind.as_str())
    .bind(amount)
    .bind(&transaction.description)
    .bind(&transaction.category)
    .execute(&mut *conn)
    .await?;

    info!(
        "Recorded {} of {:.2} ({}) as {}",
        kind.as_str(),
        amount,
        transaction.category,
        transaction.id
    );
    Ok(transaction)
}

/// Add a manual expense; every field is required and the amount must be positive
pub async fn add_expense(pool: &SqlitePool, input: &ExpenseInput) -> Result<Transaction> {
    const INCOMPLETE: &str = "Por favor complete todos los campos";
    let description = required_text(&input.description, INCOMPLETE)?;
    let category = required_text(&input.category, INCOMPLETE)?;
    let amount = match input.amount {
        Some(a) if a > 0.0 => a,
        _ => return Err(Error::InvalidInput(INCOMPLETE.to_string())),
    };

    let mut conn = pool.acquire().await?;
    insert_transaction(&mut conn, TransactionKind::Expense, amount, &description, &category).await
}

pub async fn delete_transaction(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Transaction {}", id)));
    }

    info!("Deleted transaction {}", id);
    Ok(())
}
