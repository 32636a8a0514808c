//! Menu products and their ingredient recipes

use cafe_common::db::Product;
use cafe_common::pricing::CostLine;
use cafe_common::time::{format_timestamp, now, parse_timestamp};
use cafe_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::retry::{begin_immediate, retry_on_lock, MAX_LOCK_WAIT_MS};
use super::{parse_id, required_text};

const SELECT_COLUMNS: &str =
    "SELECT id, name, description, price, category, image_url, created_at FROM products";

/// One recipe line as submitted by the product editor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientInput {
    pub inventory_id: Uuid,
    pub quantity_required: f64,
}

/// Fields accepted by the product editor for create and update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Option<f64>,
    #[serde(default)]
    pub category: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
}

/// Recipe line joined with its inventory item
#[derive(Debug, Clone, Serialize)]
pub struct RecipeLine {
    pub inventory_id: Uuid,
    pub quantity_required: f64,
    pub inventory_name: String,
    pub unit: String,
    pub cost: Option<f64>,
}

impl RecipeLine {
    pub fn cost_line(&self) -> CostLine {
        CostLine {
            unit_cost: self.cost,
            quantity_required: self.quantity_required,
        }
    }
}

fn validate_ingredients(ingredients: &[IngredientInput]) -> Result<()> {
    if ingredients.iter().any(|i| !(i.quantity_required > 0.0)) {
        return Err(Error::InvalidInput(
            "Cada ingrediente necesita una cantidad mayor a cero".to_string(),
        ));
    }
    Ok(())
}

impl ProductInput {
    fn validate(&self) -> Result<(String, f64)> {
        let name = required_text(&self.name, "El nombre es obligatorio")?;
        let price = match self.price {
            Some(p) if p > 0.0 => p,
            _ => {
                return Err(Error::InvalidInput(
                    "El precio debe ser mayor a cero".to_string(),
                ))
            }
        };
        validate_ingredients(&self.ingredients)?;
        Ok((name, price))
    }
}

pub(crate) fn product_from_row(row: &SqliteRow) -> Result<Product> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Product {
        id: parse_id(&id)?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        category: row.try_get("category")?,
        image_url: row.try_get("image_url")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// All products ordered by name
pub async fn list_products(pool: &SqlitePool) -> Result<Vec<Product>> {
    let rows = sqlx::query(&format!("{} ORDER BY name", SELECT_COLUMNS))
        .fetch_all(pool)
        .await?;
    rows.iter().map(product_from_row).collect()
}

pub async fn get_product(pool: &SqlitePool, id: Uuid) -> Result<Option<Product>> {
    let mut conn = pool.acquire().await?;
    fetch_product(&mut conn, id).await
}

pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Product>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(product_from_row).transpose()
}

/// Recipe of one product with inventory names, units and unit costs
pub async fn get_recipe(pool: &SqlitePool, product_id: Uuid) -> Result<Vec<RecipeLine>> {
    let rows = sqlx::query(
        r#"
        SELECT pi.inventory_id, pi.quantity_required, inv.name, inv.unit, inv.cost
        FROM product_ingredients pi
        JOIN inventory inv ON inv.id = pi.inventory_id
        WHERE pi.product_id = ?
        ORDER BY inv.name
        "#,
    )
    .bind(product_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> Result<RecipeLine> {
            let inventory_id: String = row.try_get("inventory_id")?;
            Ok(RecipeLine {
                inventory_id: parse_id(&inventory_id)?,
                quantity_required: row.try_get("quantity_required")?,
                inventory_name: row.try_get("name")?,
                unit: row.try_get("unit")?,
                cost: row.try_get("cost")?,
            })
        })
        .collect()
}

/// Unit costs for a draft recipe, for quoting before the product is saved
pub async fn draft_cost_lines(
    pool: &SqlitePool,
    ingredients: &[IngredientInput],
) -> Result<Vec<CostLine>> {
    validate_ingredients(ingredients)?;
    let mut lines = Vec::with_capacity(ingredients.len());
    for ing in ingredients {
        let cost: Option<Option<f64>> = sqlx::query_scalar("SELECT cost FROM inventory WHERE id = ?")
            .bind(ing.inventory_id.to_string())
            .fetch_optional(pool)
            .await?;
        let unit_cost = cost.ok_or_else(|| {
            Error::NotFound(format!("Inventory item {}", ing.inventory_id))
        })?;
        lines.push(CostLine {
            unit_cost,
            quantity_required: ing.quantity_required,
        });
    }
    Ok(lines)
}

/// Create (`id = None`) or update a product and replace its recipe
///
/// Product row and recipe are written in one transaction.
pub async fn save_product(pool: &SqlitePool, id: Option<Uuid>, input: &ProductInput) -> Result<Product> {
    let (name, price) = input.validate()?;
    let image_url = input
        .image_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);

    let product = retry_on_lock("product save", MAX_LOCK_WAIT_MS, || {
        write_product(pool, id, input, &name, price, image_url.as_deref())
    })
    .await?;

    info!(
        "Saved product {} ({}) with {} ingredient(s)",
        product.name,
        product.id,
        input.ingredients.len()
    );
    Ok(product)
}

async fn write_product(
    pool: &SqlitePool,
    id: Option<Uuid>,
    input: &ProductInput,
    name: &str,
    price: f64,
    image_url: Option<&str>,
) -> Result<Product> {
    let mut tx = begin_immediate(pool).await?;

    let product = match id {
        Some(id) => {
            let existing = fetch_product(&mut tx, id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Product {}", id)))?;
            sqlx::query(
                r#"
                UPDATE products
                SET name = ?, description = ?, price = ?, category = ?, image_url = ?
                WHERE id = ?
                "#,
            )
            .bind(name)
            .bind(input.description.trim())
            .bind(price)
            .bind(input.category.trim())
            .bind(image_url)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

            Product {
                name: name.to_string(),
                description: input.description.trim().to_string(),
                price,
                category: input.category.trim().to_string(),
                image_url: image_url.map(str::to_string),
                ..existing
            }
        }
        None => {
            let product = Product {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: input.description.trim().to_string(),
                price,
                category: input.category.trim().to_string(),
                image_url: image_url.map(str::to_string),
                created_at: now(),
            };
            sqlx::query(
                r#"
                INSERT INTO products (id, name, description, price, category, image_url, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(product.id.to_string())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(&product.category)
            .bind(&product.image_url)
            .bind(format_timestamp(product.created_at))
            .execute(&mut *tx)
            .await?;
            product
        }
    };

    replace_recipe(&mut tx, product.id, &input.ingredients).await?;
    tx.commit().await?;
    Ok(product)
}

async fn replace_recipe(
    conn: &mut SqliteConnection,
    product_id: Uuid,
    ingredients: &[IngredientInput],
) -> Result<()> {
    sqlx::query("DELETE FROM product_ingredients WHERE product_id = ?")
        .bind(product_id.to_string())
        .execute(&mut *conn)
        .await?;

    for ing in ingredients {
        sqlx::query(
            r#"
            INSERT INTO product_ingredients (id, product_id, inventory_id, quantity_required)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(product_id.to_string())
        .bind(ing.inventory_id.to_string())
        .bind(ing.quantity_required)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::from_write(e, &format!("Ingrediente inexistente: {}", ing.inventory_id))
        })?;
    }
    Ok(())
}

/// Delete a product; recipe lines cascade
///
/// A product that appears in orders is refused unless `force` is set, in
/// which case its order lines are removed first. Order totals are left as
/// they were.
pub async fn delete_product(pool: &SqlitePool, id: Uuid, force: bool) -> Result<()> {
    retry_on_lock("product delete", MAX_LOCK_WAIT_MS, || remove_product(pool, id, force)).await?;
    info!("Deleted product {}", id);
    Ok(())
}

async fn remove_product(pool: &SqlitePool, id: Uuid, force: bool) -> Result<()> {
    let mut tx = begin_immediate(pool).await?;

    if force {
        let removed = sqlx::query("DELETE FROM order_items WHERE product_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed > 0 {
            info!("Removed product {} from {} order line(s)", id, removed);
        }
    }

    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            Error::from_write(
                e,
                "Este producto es parte de pedidos existentes; use force=true para eliminarlo de todos modos",
            )
        })?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Product {}", id)));
    }

    tx.commit().await?;
    Ok(())
}
