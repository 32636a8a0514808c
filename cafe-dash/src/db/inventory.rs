//! Inventory (stock) persistence

use cafe_common::db::{InventoryItem, DEFAULT_INVENTORY_UNIT, DEFAULT_MIN_STOCK};
use cafe_common::time::{format_timestamp, now, parse_timestamp};
use cafe_common::{Error, Result};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::{parse_id, required_text};

const SELECT_COLUMNS: &str =
    "SELECT id, name, category, quantity, unit, min_stock, cost, updated_at FROM inventory";

/// Fields accepted by the stock editor for create and update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub min_stock: Option<f64>,
    pub cost: Option<f64>,
}

/// Validated inventory fields
struct InventoryFields {
    name: String,
    category: String,
    quantity: f64,
    unit: String,
    min_stock: f64,
    cost: Option<f64>,
}

impl InventoryInput {
    fn validate(&self) -> Result<InventoryFields> {
        let name = required_text(&self.name, "El nombre es obligatorio")?;
        let quantity = self
            .quantity
            .ok_or_else(|| Error::InvalidInput("La cantidad es obligatoria".to_string()))?;
        if quantity < 0.0 {
            return Err(Error::InvalidInput("La cantidad no puede ser negativa".to_string()));
        }
        let min_stock = self.min_stock.unwrap_or(DEFAULT_MIN_STOCK);
        if min_stock < 0.0 {
            return Err(Error::InvalidInput("El stock mínimo no puede ser negativo".to_string()));
        }
        if matches!(self.cost, Some(c) if c < 0.0) {
            return Err(Error::InvalidInput("El costo no puede ser negativo".to_string()));
        }
        let unit = self
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_INVENTORY_UNIT)
            .to_string();

        Ok(InventoryFields {
            name,
            category: self.category.trim().to_string(),
            quantity,
            unit,
            min_stock,
            cost: self.cost,
        })
    }
}

pub(crate) fn inventory_from_row(row: &SqliteRow) -> Result<InventoryItem> {
    let id: String = row.try_get("id")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(InventoryItem {
        id: parse_id(&id)?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        quantity: row.try_get("quantity")?,
        unit: row.try_get("unit")?,
        min_stock: row.try_get("min_stock")?,
        cost: row.try_get("cost")?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// All inventory items ordered by name
pub async fn list_inventory(pool: &SqlitePool) -> Result<Vec<InventoryItem>> {
    let rows = sqlx::query(&format!("{} ORDER BY name", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;
    rows.iter().map(inventory_from_row).collect()
}

pub async fn get_inventory_item(pool: &SqlitePool, id: Uuid) -> Result<Option<InventoryItem>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(inventory_from_row).transpose()
}

/// Inventory item with exactly this name, used by restocks
pub(crate) async fn find_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<InventoryItem>> {
    let row = sqlx::query(&format!("{} WHERE name = ? LIMIT 1", SELECT_COLUMNS))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(inventory_from_row).transpose()
}

pub async fn create_inventory_item(pool: &SqlitePool, input: &InventoryInput) -> Result<InventoryItem> {
    let fields = input.validate()?;
    let mut conn = pool.acquire().await?;
    let item = insert_item(
        &mut conn,
        &fields.name,
        &fields.category,
        fields.quantity,
        &fields.unit,
        fields.min_stock,
        fields.cost,
    )
    .await?;
    info!("Created inventory item {} ({})", item.name, item.id);
    Ok(item)
}

/// Insert a row without input validation; callers have validated
pub(crate) async fn insert_item(
    conn: &mut SqliteConnection,
    name: &str,
    category: &str,
    quantity: f64,
    unit: &str,
    min_stock: f64,
    cost: Option<f64>,
) -> Result<InventoryItem> {
    let item = InventoryItem {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: category.to_string(),
        quantity,
        unit: unit.to_string(),
        min_stock,
        cost,
        updated_at: now(),
    };

    sqlx::query(
        r#"
        INSERT INTO inventory (id, name, category, quantity, unit, min_stock, cost, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(item.id.to_string())
    .bind(&item.name)
    .bind(&item.category)
    .bind(item.quantity)
    .bind(&item.unit)
    .bind(item.min_stock)
    .bind(item.cost)
    .bind(format_timestamp(item.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(item)
}

pub async fn update_inventory_item(
    pool: &SqlitePool,
    id: Uuid,
    input: &InventoryInput,
) -> Result<InventoryItem> {
    let fields = input.validate()?;
    let updated_at = now();

    let result = sqlx::query(
        r#"
        UPDATE inventory
        SET name = ?, category = ?, quantity = ?, unit = ?, min_stock = ?, cost = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.category)
    .bind(fields.quantity)
    .bind(&fields.unit)
    .bind(fields.min_stock)
    .bind(fields.cost)
    .bind(format_timestamp(updated_at))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Inventory item {}", id)));
    }

    info!("Updated inventory item {} ({})", fields.name, id);
    Ok(InventoryItem {
        id,
        name: fields.name,
        category: fields.category,
        quantity: fields.quantity,
        unit: fields.unit,
        min_stock: fields.min_stock,
        cost: fields.cost,
        updated_at,
    })
}

/// Add (or, with a negative delta, remove) stock and touch `updated_at`
///
/// Returns false when the row no longer exists.
pub(crate) async fn adjust_quantity(
    conn: &mut SqliteConnection,
    id: Uuid,
    delta: f64,
) -> Result<bool> {
    let result = sqlx::query("UPDATE inventory SET quantity = quantity + ?, updated_at = ? WHERE id = ?")
        .bind(delta)
        .bind(format_timestamp(now()))
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Receive a restock batch: add quantity and replace the unit cost
pub(crate) async fn receive_stock(
    conn: &mut SqliteConnection,
    id: Uuid,
    quantity: f64,
    unit_cost: f64,
) -> Result<()> {
    sqlx::query(
        "UPDATE inventory SET quantity = quantity + ?, cost = ?, updated_at = ? WHERE id = ?",
    )
    .bind(quantity)
    .bind(unit_cost)
    .bind(format_timestamp(now()))
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn delete_inventory_item(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM inventory WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(|e| {
            Error::from_write(e, "Este ítem se usa en la receta de uno o más productos")
        })?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Inventory item {}", id)));
    }

    info!("Deleted inventory item {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::fresh_pool;

    fn beans(quantity: f64) -> InventoryInput {
        InventoryInput {
            name: "Café en Grano Colombia".to_string(),
            category: "Grano".to_string(),
            quantity: Some(quantity),
            unit: Some("kg".to_string()),
            min_stock: None,
            cost: Some(12.0),
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let (_dir, pool) = fresh_pool().await;
        let input = InventoryInput {
            name: "Vasos".to_string(),
            quantity: Some(0.0),
            ..Default::default()
        };

        let item = create_inventory_item(&pool, &input).await.unwrap();

        assert_eq!(item.unit, DEFAULT_INVENTORY_UNIT);
        assert_eq!(item.min_stock, DEFAULT_MIN_STOCK);
        assert!(item.is_low_stock());
        let loaded = get_inventory_item(&pool, item.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Vasos");
        assert_eq!(loaded.cost, None);
    }

    #[tokio::test]
    async fn test_quantity_is_required() {
        let (_dir, pool) = fresh_pool().await;
        let input = InventoryInput {
            name: "Azúcar".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_inventory_item(&pool, &input).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found() {
        let (_dir, pool) = fresh_pool().await;
        let result = update_inventory_item(&pool, Uuid::new_v4(), &beans(1.0)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_adjust_quantity_moves_stock() {
        let (_dir, pool) = fresh_pool().await;
        let item = create_inventory_item(&pool, &beans(3.0)).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert!(adjust_quantity(&mut conn, item.id, -1.25).await.unwrap());
        assert!(!adjust_quantity(&mut conn, Uuid::new_v4(), 1.0).await.unwrap());
        drop(conn);

        let loaded = get_inventory_item(&pool, item.id).await.unwrap().unwrap();
        assert_eq!(loaded.quantity, 1.75);
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let (_dir, pool) = fresh_pool().await;
        for name in ["Leche", "Azúcar", "Canela"] {
            let input = InventoryInput {
                name: name.to_string(),
                quantity: Some(1.0),
                ..Default::default()
            };
            create_inventory_item(&pool, &input).await.unwrap();
        }
        let names: Vec<String> = list_inventory(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Azúcar", "Canela", "Leche"]);
    }
}
