//! Orders, order lines, and the stock they consume

use cafe_common::db::{Order, OrderItem};
use cafe_common::ledger::TransactionKind;
use cafe_common::pricing::round2;
use cafe_common::time::{format_timestamp, now, parse_timestamp};
use cafe_common::{Error, OrderStatus, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::inventory::adjust_quantity;
use super::products::fetch_product;
use super::retry::{begin_immediate, retry_on_lock, MAX_LOCK_WAIT_MS};
use super::transactions::{insert_transaction, SALES_CATEGORY};
use super::{parse_id, required_text};

/// One cart line: a product and how many of it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub items: Vec<CartLine>,
}

/// Order together with its lines
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Outcome of moving an order one stage along
#[derive(Debug, Clone)]
pub struct Advanced {
    pub previous: OrderStatus,
    pub order: Order,
}

fn order_from_row(row: &SqliteRow) -> Result<Order> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: parse_id(&id)?,
        created_at: parse_timestamp(&created_at)?,
        customer_name: row.try_get("customer_name")?,
        status: status.parse()?,
        total: row.try_get("total")?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<OrderItem> {
    let id: String = row.try_get("id")?;
    let order_id: String = row.try_get("order_id")?;
    let product_id: String = row.try_get("product_id")?;
    Ok(OrderItem {
        id: parse_id(&id)?,
        order_id: parse_id(&order_id)?,
        product_id: parse_id(&product_id)?,
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
    })
}

async fn load_items(conn: &mut SqliteConnection, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let rows = sqlx::query(
        r#"
        SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, oi.quantity, oi.price
        FROM order_items oi
        LEFT JOIN products p ON p.id = oi.product_id
        WHERE oi.order_id = ?
        ORDER BY p.name
        "#,
    )
    .bind(order_id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(item_from_row).collect()
}

async fn with_items(conn: &mut SqliteConnection, orders: Vec<Order>) -> Result<Vec<OrderWithItems>> {
    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        let items = load_items(conn, order.id).await?;
        out.push(OrderWithItems { order, items });
    }
    Ok(out)
}

async fn fetch_order(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Order>> {
    let row = sqlx::query(
        "SELECT id, created_at, customer_name, status, total FROM orders WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(order_from_row).transpose()
}

/// Orders still on the board (not completed), oldest first
pub async fn list_active_orders(pool: &SqlitePool) -> Result<Vec<OrderWithItems>> {
    let mut conn = pool.acquire().await?;
    let rows = sqlx::query(
        r#"
        SELECT id, created_at, customer_name, status, total
        FROM orders
        WHERE status != 'completed'
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;
    let orders = rows.iter().map(order_from_row).collect::<Result<Vec<_>>>()?;
    with_items(&mut conn, orders).await
}

/// Orders created within `[start, end]` (storage-format timestamps), newest first
pub async fn list_orders_between(
    pool: &SqlitePool,
    start: &str,
    end: &str,
) -> Result<Vec<OrderWithItems>> {
    let mut conn = pool.acquire().await?;
    let rows = sqlx::query(
        r#"
        SELECT id, created_at, customer_name, status, total
        FROM orders
        WHERE created_at >= ? AND created_at <= ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;
    let orders = rows.iter().map(order_from_row).collect::<Result<Vec<_>>>()?;
    with_items(&mut conn, orders).await
}

pub async fn get_order(pool: &SqlitePool, id: Uuid) -> Result<Option<OrderWithItems>> {
    let mut conn = pool.acquire().await?;
    match fetch_order(&mut conn, id).await? {
        Some(order) => {
            let items = load_items(&mut conn, id).await?;
            Ok(Some(OrderWithItems { order, items }))
        }
        None => Ok(None),
    }
}

/// Recipe of a product as (inventory id, quantity per unit)
async fn recipe_requirements(
    conn: &mut SqliteConnection,
    product_id: Uuid,
) -> Result<Vec<(Uuid, f64)>> {
    let rows = sqlx::query(
        "SELECT inventory_id, quantity_required FROM product_ingredients WHERE product_id = ?",
    )
    .bind(product_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| -> Result<(Uuid, f64)> {
            let inventory_id: String = row.try_get("inventory_id")?;
            Ok((parse_id(&inventory_id)?, row.try_get("quantity_required")?))
        })
        .collect()
}

/// Place an order: check stock, record the order, deduct ingredients
///
/// Runs in one write transaction. Ingredient needs are summed per inventory
/// item across the whole cart before being compared with stock on hand.
pub async fn create_order(pool: &SqlitePool, new_order: &NewOrder) -> Result<OrderWithItems> {
    let customer_name = required_text(&new_order.customer_name, "El nombre del cliente es obligatorio")?;
    if new_order.items.is_empty() {
        return Err(Error::InvalidInput("El pedido no tiene productos".to_string()));
    }
    if new_order.items.iter().any(|l| l.quantity <= 0) {
        return Err(Error::InvalidInput("Las cantidades deben ser mayores a cero".to_string()));
    }

    let created = retry_on_lock("order create", MAX_LOCK_WAIT_MS, || {
        insert_order(pool, &customer_name, &new_order.items)
    })
    .await?;

    info!(
        "Created order {} for {} ({} line(s), total {:.2})",
        created.order.id,
        created.order.customer_name,
        created.items.len(),
        created.order.total
    );
    Ok(created)
}

async fn insert_order(
    pool: &SqlitePool,
    customer_name: &str,
    lines: &[CartLine],
) -> Result<OrderWithItems> {
    let mut tx = begin_immediate(pool).await?;

    // Price every line and total the ingredients the cart consumes
    let mut priced = Vec::with_capacity(lines.len());
    let mut needs: BTreeMap<Uuid, f64> = BTreeMap::new();
    for line in lines {
        let product = fetch_product(&mut tx, line.product_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Product {}", line.product_id)))?;
        for (inventory_id, per_unit) in recipe_requirements(&mut tx, product.id).await? {
            *needs.entry(inventory_id).or_insert(0.0) += per_unit * line.quantity as f64;
        }
        priced.push((line, product));
    }

    // Stock validation
    for (inventory_id, needed) in &needs {
        let row = sqlx::query("SELECT name, quantity FROM inventory WHERE id = ?")
            .bind(inventory_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            continue;
        };
        let available: f64 = row.try_get("quantity")?;
        if available < *needed {
            return Err(Error::InsufficientStock {
                item: row.try_get("name")?,
                needed: *needed,
                available,
            });
        }
    }

    let total = round2(
        priced
            .iter()
            .map(|(line, product)| product.price * line.quantity as f64)
            .sum(),
    );

    let order = Order {
        id: Uuid::new_v4(),
        created_at: now(),
        customer_name: customer_name.to_string(),
        status: OrderStatus::Pending,
        total,
    };

    sqlx::query(
        "INSERT INTO orders (id, created_at, customer_name, status, total) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(order.id.to_string())
    .bind(format_timestamp(order.created_at))
    .bind(&order.customer_name)
    .bind(order.status.as_str())
    .bind(order.total)
    .execute(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(priced.len());
    for (line, product) in &priced {
        let item = OrderItem {
            id: Uuid::new_v4(),
            order_id: order.id,
            product_id: product.id,
            product_name: Some(product.name.clone()),
            quantity: line.quantity,
            price: product.price,
        };
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(item.id.to_string())
        .bind(item.order_id.to_string())
        .bind(item.product_id.to_string())
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *tx)
        .await?;
        items.push(item);
    }

    // Deduct inventory
    for (inventory_id, needed) in &needs {
        if !adjust_quantity(&mut tx, *inventory_id, -needed).await? {
            warn!(
                "Order {}: recipe references missing inventory item {}, skipped",
                order.id, inventory_id
            );
        }
    }

    tx.commit().await?;
    Ok(OrderWithItems { order, items })
}

/// Move an order one stage forward
///
/// With `expected` set, the order must still be in that status; a second
/// click on a card that already moved gets `Conflict` instead of skipping a
/// stage. Reaching `completed` books the order total as income when
/// `record_income` is set.
pub async fn advance_order(
    pool: &SqlitePool,
    id: Uuid,
    expected: Option<OrderStatus>,
    record_income: bool,
) -> Result<Advanced> {
    let advanced = retry_on_lock("order advance", MAX_LOCK_WAIT_MS, || {
        advance_in_transaction(pool, id, expected, record_income)
    })
    .await?;

    info!(
        "Order {} advanced {} -> {}",
        id, advanced.previous, advanced.order.status
    );
    Ok(advanced)
}

async fn advance_in_transaction(
    pool: &SqlitePool,
    id: Uuid,
    expected: Option<OrderStatus>,
    record_income: bool,
) -> Result<Advanced> {
    let mut tx = begin_immediate(pool).await?;

    let order = fetch_order(&mut tx, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Order {}", id)))?;
    let previous = order.status;
    if let Some(expected) = expected {
        if previous != expected {
            return Err(Error::Conflict(format!(
                "El pedido {} ya está en estado {}",
                id, previous
            )));
        }
    }
    let next = previous.advance()?;

    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND status = ?")
        .bind(next.as_str())
        .bind(id.to_string())
        .bind(previous.as_str())
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::Conflict(format!(
            "El pedido {} cambió de estado mientras se actualizaba",
            id
        )));
    }

    if next == OrderStatus::Completed && record_income {
        insert_transaction(
            &mut tx,
            TransactionKind::Income,
            order.total,
            &format!("Pedido {}", order.customer_name),
            SALES_CATEGORY,
        )
        .await?;
    }

    tx.commit().await?;

    Ok(Advanced {
        previous,
        order: Order {
            status: next,
            ..order
        },
    })
}

/// Delete an order; its lines cascade. Inventory is not restored.
pub async fn delete_order(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Order {}", id)));
    }

    info!("Deleted order {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::inventory::{create_inventory_item, get_inventory_item, InventoryInput};
    use crate::db::products::{save_product, IngredientInput, ProductInput};
    use crate::db::test_support::fresh_pool;
    use crate::db::transactions::list_transactions;

    struct Menu {
        milk: Uuid,
        latte: Uuid,
        cookie: Uuid,
    }

    /// Milk stock of `milk_on_hand` litres; a latte uses 0.25 l, a cookie nothing
    async fn menu(pool: &SqlitePool, milk_on_hand: f64) -> Menu {
        let milk = create_inventory_item(
            pool,
            &InventoryInput {
                name: "Leche".to_string(),
                quantity: Some(milk_on_hand),
                unit: Some("lt".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .id;

        let latte = save_product(
            pool,
            None,
            &ProductInput {
                name: "Latte".to_string(),
                price: Some(3.5),
                ingredients: vec![IngredientInput {
                    inventory_id: milk,
                    quantity_required: 0.25,
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .id;

        let cookie = save_product(
            pool,
            None,
            &ProductInput {
                name: "Cookie".to_string(),
                price: Some(1.25),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .id;

        Menu { milk, latte, cookie }
    }

    fn cart(customer: &str, lines: &[(Uuid, i64)]) -> NewOrder {
        NewOrder {
            customer_name: customer.to_string(),
            items: lines
                .iter()
                .map(|(product_id, quantity)| CartLine {
                    product_id: *product_id,
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_order_totals_and_deducts() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 2.0).await;

        let created = create_order(&pool, &cart("Ana", &[(m.latte, 2), (m.cookie, 3)]))
            .await
            .unwrap();

        assert_eq!(created.order.status, OrderStatus::Pending);
        assert_eq!(created.order.total, 10.75);
        assert_eq!(created.items.len(), 2);

        let milk = get_inventory_item(&pool, m.milk).await.unwrap().unwrap();
        assert_eq!(milk.quantity, 1.5);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_nothing_behind() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 0.4).await;

        let err = create_order(&pool, &cart("Ana", &[(m.latte, 2)]))
            .await
            .unwrap_err();

        match err {
            Error::InsufficientStock { item, needed, available } => {
                assert_eq!(item, "Leche");
                assert_eq!(needed, 0.5);
                assert_eq!(available, 0.4);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(list_active_orders(&pool).await.unwrap().is_empty());
        let milk = get_inventory_item(&pool, m.milk).await.unwrap().unwrap();
        assert_eq!(milk.quantity, 0.4);
    }

    #[tokio::test]
    async fn test_needs_are_summed_across_lines() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 0.6).await;

        // Each line alone fits in 0.6 l; together they need 0.75 l
        let result = create_order(&pool, &cart("Ana", &[(m.latte, 2), (m.latte, 1)])).await;

        assert!(matches!(result, Err(Error::InsufficientStock { .. })));
    }

    #[tokio::test]
    async fn test_create_order_validation() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 1.0).await;

        assert!(matches!(
            create_order(&pool, &cart("  ", &[(m.cookie, 1)])).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            create_order(&pool, &cart("Ana", &[])).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            create_order(&pool, &cart("Ana", &[(m.cookie, 0)])).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            create_order(&pool, &cart("Ana", &[(Uuid::new_v4(), 1)])).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_advance_to_completion_books_income() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 1.0).await;
        let created = create_order(&pool, &cart("Ana", &[(m.cookie, 2)])).await.unwrap();
        let id = created.order.id;

        let step1 = advance_order(&pool, id, None, true).await.unwrap();
        assert_eq!(step1.previous, OrderStatus::Pending);
        assert_eq!(step1.order.status, OrderStatus::Preparing);
        advance_order(&pool, id, None, true).await.unwrap();
        let done = advance_order(&pool, id, None, true).await.unwrap();
        assert_eq!(done.order.status, OrderStatus::Completed);

        assert!(matches!(
            advance_order(&pool, id, None, true).await,
            Err(Error::Conflict(_))
        ));
        assert!(list_active_orders(&pool).await.unwrap().is_empty());

        let ledger = list_transactions(&pool).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, TransactionKind::Income);
        assert_eq!(ledger[0].amount, 2.5);
        assert_eq!(ledger[0].category, SALES_CATEGORY);
    }

    #[tokio::test]
    async fn test_completion_without_income_booking() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 1.0).await;
        let id = create_order(&pool, &cart("Ana", &[(m.cookie, 1)]))
            .await
            .unwrap()
            .order
            .id;

        for _ in 0..3 {
            advance_order(&pool, id, None, false).await.unwrap();
        }
        assert!(list_transactions(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_advance_with_stale_expected_status_conflicts() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 1.0).await;
        let id = create_order(&pool, &cart("Ana", &[(m.cookie, 1)]))
            .await
            .unwrap()
            .order
            .id;

        advance_order(&pool, id, Some(OrderStatus::Pending), true)
            .await
            .unwrap();
        assert!(matches!(
            advance_order(&pool, id, Some(OrderStatus::Pending), true).await,
            Err(Error::Conflict(_))
        ));

        let order = get_order(&pool, id).await.unwrap().unwrap();
        assert_eq!(order.order.status, OrderStatus::Preparing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_advances_move_one_stage() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 1.0).await;
        let id = create_order(&pool, &cart("Ana", &[(m.cookie, 1)]))
            .await
            .unwrap()
            .order
            .id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    advance_order(&pool, id, Some(OrderStatus::Pending), true).await
                })
            })
            .collect();

        let mut advanced = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(step) => {
                    assert_eq!(step.order.status, OrderStatus::Preparing);
                    advanced += 1;
                }
                Err(Error::Conflict(_)) => {}
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert_eq!(advanced, 1);

        let order = get_order(&pool, id).await.unwrap().unwrap();
        assert_eq!(order.order.status, OrderStatus::Preparing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_unconditional_advances_never_skip_or_fail() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 1.0).await;
        let id = create_order(&pool, &cart("Ana", &[(m.cookie, 2)]))
            .await
            .unwrap()
            .order
            .id;

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { advance_order(&pool, id, None, true).await })
            })
            .collect();

        let mut steps = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(step) => steps.push((step.previous, step.order.status)),
                Err(Error::Conflict(_)) => {}
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert_eq!(steps.len(), 3);
        assert!(steps.contains(&(OrderStatus::Pending, OrderStatus::Preparing)));
        assert!(steps.contains(&(OrderStatus::Preparing, OrderStatus::Ready)));
        assert!(steps.contains(&(OrderStatus::Ready, OrderStatus::Completed)));

        // Income booked exactly once
        let ledger = list_transactions(&pool).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].amount, 2.5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_all_succeed_and_deduct() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 4.0).await;

        let handles: Vec<_> = (0..12)
            .map(|n| {
                let pool = pool.clone();
                let new_order = cart(&format!("Cliente {}", n), &[(m.latte, 1)]);
                tokio::spawn(async move { create_order(&pool, &new_order).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(list_active_orders(&pool).await.unwrap().len(), 12);
        let milk = get_inventory_item(&pool, m.milk).await.unwrap().unwrap();
        assert!((milk.quantity - 1.0).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_never_oversell() {
        let (_dir, pool) = fresh_pool().await;
        // Stock for exactly four lattes
        let m = menu(&pool, 1.0).await;

        let handles: Vec<_> = (0..10)
            .map(|n| {
                let pool = pool.clone();
                let new_order = cart(&format!("Cliente {}", n), &[(m.latte, 1)]);
                tokio::spawn(async move { create_order(&pool, &new_order).await })
            })
            .collect();

        let mut placed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(Error::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert_eq!(placed, 4);
        let milk = get_inventory_item(&pool, m.milk).await.unwrap().unwrap();
        assert!(milk.quantity.abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_delete_order_removes_lines() {
        let (_dir, pool) = fresh_pool().await;
        let m = menu(&pool, 1.0).await;
        let id = create_order(&pool, &cart("Ana", &[(m.latte, 1)]))
            .await
            .unwrap()
            .order
            .id;

        delete_order(&pool, id).await.unwrap();

        assert!(get_order(&pool, id).await.unwrap().is_none());
        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(lines, 0);
        assert!(matches!(delete_order(&pool, id).await, Err(Error::NotFound(_))));
    }
}
