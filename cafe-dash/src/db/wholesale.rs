//! Supplier catalog and restocking

use cafe_common::db::{
    WholesaleProduct, DEFAULT_WHOLESALE_UNIT, RESTOCK_CATEGORY, RESTOCK_MIN_STOCK,
};
use cafe_common::ledger::TransactionKind;
use cafe_common::pricing::round2;
use cafe_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::inventory::{find_by_name, insert_item, receive_stock};
use super::retry::{begin_immediate, retry_on_lock, MAX_LOCK_WAIT_MS};
use super::transactions::insert_transaction;
use super::{parse_id, required_text};

/// Expense category of a restock purchase
pub const RESTOCK_EXPENSE_CATEGORY: &str = "Compra Mayorista";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WholesaleInput {
    #[serde(default)]
    pub name: String,
    pub cost: Option<f64>,
    pub batch_quantity: Option<i64>,
    pub unit: Option<String>,
}

/// Result of a restock
#[derive(Debug, Clone, Serialize)]
pub struct RestockReceipt {
    /// Products received
    pub products: usize,
    /// Batch cost paid, also recorded as an expense
    pub total_cost: f64,
    /// Inventory items that did not exist before this restock
    pub created_items: Vec<Uuid>,
    pub updated_items: Vec<Uuid>,
    pub expense_id: Uuid,
}

fn wholesale_from_row(row: &SqliteRow) -> Result<WholesaleProduct> {
    let id: String = row.try_get("id")?;
    Ok(WholesaleProduct {
        id: parse_id(&id)?,
        name: row.try_get("name")?,
        cost: row.try_get("cost")?,
        batch_quantity: row.try_get("batch_quantity")?,
        unit: row.try_get("unit")?,
    })
}

pub async fn list_wholesale(pool: &SqlitePool) -> Result<Vec<WholesaleProduct>> {
    let rows = sqlx::query(
        "SELECT id, name, cost, batch_quantity, unit FROM wholesale_products ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    rows.iter().map(wholesale_from_row).collect()
}

async fn fetch_wholesale(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<WholesaleProduct>> {
    let row = sqlx::query(
        "SELECT id, name, cost, batch_quantity, unit FROM wholesale_products WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(wholesale_from_row).transpose()
}

pub async fn create_wholesale(pool: &SqlitePool, input: &WholesaleInput) -> Result<WholesaleProduct> {
    let name = required_text(&input.name, "El nombre es obligatorio")?;
    let cost = match input.cost {
        Some(c) if c > 0.0 => c,
        _ => return Err(Error::InvalidInput("El costo debe ser mayor a cero".to_string())),
    };
    let batch_quantity = match input.batch_quantity {
        Some(q) if q > 0 => q,
        _ => {
            return Err(Error::InvalidInput(
                "La cantidad por lote debe ser mayor a cero".to_string(),
            ))
        }
    };
    let unit = input
        .unit
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_WHOLESALE_UNIT)
        .to_string();

    let product = WholesaleProduct {
        id: Uuid::new_v4(),
        name,
        cost,
        batch_quantity,
        unit,
    };

    sqlx::query(
        "INSERT INTO wholesale_products (id, name, cost, batch_quantity, unit) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(product.id.to_string())
    .bind(&product.name)
    .bind(product.cost)
    .bind(product.batch_quantity)
    .bind(&product.unit)
    .execute(pool)
    .await?;

    info!("Added wholesale product {} ({})", product.name, product.id);
    Ok(product)
}

pub async fn delete_wholesale(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM wholesale_products WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Wholesale product {}", id)));
    }

    info!("Deleted wholesale product {}", id);
    Ok(())
}

/// Buy one batch of each selected product and put it into inventory
///
/// Stock is matched to inventory by exact name. The total batch cost is
/// booked as a single expense. All or nothing.
pub async fn restock(pool: &SqlitePool, ids: &[Uuid]) -> Result<RestockReceipt> {
    if ids.is_empty() {
        return Err(Error::InvalidInput(
            "Seleccione al menos un producto para reabastecer".to_string(),
        ));
    }

    let receipt = retry_on_lock("restock", MAX_LOCK_WAIT_MS, || receive_batches(pool, ids)).await?;

    info!(
        "Restocked {} product(s): {} new inventory item(s), {} updated, cost {:.2}",
        receipt.products,
        receipt.created_items.len(),
        receipt.updated_items.len(),
        receipt.total_cost
    );
    Ok(receipt)
}

async fn receive_batches(pool: &SqlitePool, ids: &[Uuid]) -> Result<RestockReceipt> {
    let mut tx = begin_immediate(pool).await?;

    let mut total_cost = 0.0;
    let mut created_items = Vec::new();
    let mut updated_items = Vec::new();

    for id in ids {
        let product = fetch_wholesale(&mut tx, *id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Wholesale product {}", id)))?;
        let quantity = product.batch_quantity as f64;
        let unit_cost = product.cost_per_unit();

        match find_by_name(&mut tx, &product.name).await? {
            Some(item) => {
                receive_stock(&mut tx, item.id, quantity, unit_cost).await?;
                updated_items.push(item.id);
            }
            None => {
                let item = insert_item(
                    &mut tx,
                    &product.name,
                    RESTOCK_CATEGORY,
                    quantity,
                    &product.unit,
                    RESTOCK_MIN_STOCK,
                    Some(unit_cost),
                )
                .await?;
                created_items.push(item.id);
            }
        }
        total_cost += product.cost;
    }

    let total_cost = round2(total_cost);
    let expense = insert_transaction(
        &mut tx,
        TransactionKind::Expense,
        total_cost,
        &format!("Pedido Mayorista ({} productos)", ids.len()),
        RESTOCK_EXPENSE_CATEGORY,
    )
    .await?;

    tx.commit().await?;

    Ok(RestockReceipt {
        products: ids.len(),
        total_cost,
        created_items,
        updated_items,
        expense_id: expense.id,
    })
}
