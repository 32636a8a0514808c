//! Read-only aggregates: daily history, weekly sales, dashboard counters

use cafe_common::db::{Order, OrderItem};
use cafe_common::pricing::round2;
use cafe_common::time::{day_bounds, trailing_days};
use cafe_common::Result;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use super::orders::list_orders_between;

/// Smallest chart scale of the weekly report
pub const MIN_CHART_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// One `name (xN)` entry per line
    pub summary: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyHistory {
    pub date: NaiveDate,
    pub orders: Vec<HistoryOrder>,
    pub total_sales: f64,
    pub total_orders: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub total_sales: f64,
    pub total_orders: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReport {
    pub days: Vec<DayTotal>,
    pub max_daily_total: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardCounts {
    pub active_orders: i64,
    pub low_stock_items: i64,
    pub today_sales: f64,
}

fn item_summary(item: &OrderItem) -> String {
    let name = item.product_name.as_deref().unwrap_or("Producto eliminado");
    format!("{} (x{})", name, item.quantity)
}

/// Every order placed on `day` (UTC), newest first
pub async fn daily_history(pool: &SqlitePool, day: NaiveDate) -> Result<DailyHistory> {
    let (start, end) = day_bounds(day);
    let orders: Vec<HistoryOrder> = list_orders_between(pool, &start, &end)
        .await?
        .into_iter()
        .map(|o| HistoryOrder {
            summary: o.items.iter().map(item_summary).collect(),
            order: o.order,
            items: o.items,
        })
        .collect();

    let total_sales = round2(orders.iter().map(|o| o.order.total).sum());
    Ok(DailyHistory {
        date: day,
        total_orders: orders.len(),
        total_sales,
        orders,
    })
}

async fn day_total(pool: &SqlitePool, day: NaiveDate) -> Result<DayTotal> {
    let (start, end) = day_bounds(day);
    let row = sqlx::query(
        r#"
        SELECT COALESCE(SUM(total), 0.0) AS total_sales, COUNT(*) AS total_orders
        FROM orders
        WHERE created_at >= ? AND created_at <= ?
        "#,
    )
    .bind(&start)
    .bind(&end)
    .fetch_one(pool)
    .await?;

    Ok(DayTotal {
        date: day,
        total_sales: round2(row.try_get("total_sales")?),
        total_orders: row.try_get("total_orders")?,
    })
}

/// Sales per day for the seven days ending with `last`, oldest first
pub async fn weekly_report(pool: &SqlitePool, last: NaiveDate) -> Result<WeeklyReport> {
    let mut days = Vec::with_capacity(7);
    for day in trailing_days(last, 7) {
        days.push(day_total(pool, day).await?);
    }
    let max_daily_total = days
        .iter()
        .map(|d| d.total_sales)
        .fold(MIN_CHART_SCALE, f64::max);

    Ok(WeeklyReport {
        days,
        max_daily_total,
    })
}

/// True when the database answers a trivial query
pub async fn ping(pool: &SqlitePool) -> bool {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Database ping failed: {}", e);
            false
        }
    }
}

pub async fn dashboard_counts(pool: &SqlitePool, today: NaiveDate) -> Result<DashboardCounts> {
    let active_orders: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status != 'completed'")
            .fetch_one(pool)
            .await?;
    let low_stock_items: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM inventory WHERE quantity <= min_stock")
            .fetch_one(pool)
            .await?;
    let today_sales = day_total(pool, today).await?.total_sales;

    Ok(DashboardCounts {
        active_orders,
        low_stock_items,
        today_sales,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::fresh_pool;
    use uuid::Uuid;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn seed_order(pool: &SqlitePool, created_at: &str, customer: &str, status: &str, total: f64) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO orders (id, created_at, customer_name, status, total) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(created_at)
        .bind(customer)
        .bind(status)
        .bind(total)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn seed_product(pool: &SqlitePool, name: &str, price: f64) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO products (id, name, description, price, category, created_at) VALUES (?, ?, '', ?, 'Café', '2025-01-01T00:00:00.000Z')",
        )
        .bind(id.to_string())
        .bind(name)
        .bind(price)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_history_covers_the_whole_day_only() {
        let (_dir, pool) = fresh_pool().await;
        seed_order(&pool, "2025-03-06T23:59:59.999Z", "Antes", "completed", 9.0).await;
        let first = seed_order(&pool, "2025-03-07T00:00:00.000Z", "Ana", "completed", 4.5).await;
        let last = seed_order(&pool, "2025-03-07T23:59:59.999Z", "Beto", "pending", 3.25).await;
        seed_order(&pool, "2025-03-08T00:00:00.000Z", "Después", "pending", 7.0).await;

        let history = daily_history(&pool, day("2025-03-07")).await.unwrap();

        assert_eq!(history.total_orders, 2);
        assert_eq!(history.total_sales, 7.75);
        assert_eq!(history.orders[0].order.id, last);
        assert_eq!(history.orders[1].order.id, first);
    }

    #[tokio::test]
    async fn test_history_summarizes_lines() {
        let (_dir, pool) = fresh_pool().await;
        let latte = seed_product(&pool, "Latte", 3.5).await;
        let order = seed_order(&pool, "2025-03-07T10:00:00.000Z", "Ana", "completed", 7.0).await;
        sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, price) VALUES (?, ?, ?, 2, 3.5)")
            .bind(Uuid::new_v4().to_string())
            .bind(order.to_string())
            .bind(latte.to_string())
            .execute(&pool)
            .await
            .unwrap();

        let history = daily_history(&pool, day("2025-03-07")).await.unwrap();

        assert_eq!(history.orders[0].summary, vec!["Latte (x2)".to_string()]);
    }

    #[tokio::test]
    async fn test_weekly_report_oldest_first_with_floor() {
        let (_dir, pool) = fresh_pool().await;
        seed_order(&pool, "2025-03-01T12:00:00.000Z", "Ana", "completed", 20.0).await;
        seed_order(&pool, "2025-03-07T12:00:00.000Z", "Beto", "completed", 30.0).await;
        seed_order(&pool, "2025-03-07T13:00:00.000Z", "Caro", "pending", 5.0).await;
        // Eight days back: outside the window
        seed_order(&pool, "2025-02-28T12:00:00.000Z", "Dani", "completed", 500.0).await;

        let report = weekly_report(&pool, day("2025-03-07")).await.unwrap();

        assert_eq!(report.days.len(), 7);
        assert_eq!(report.days[0].date, day("2025-03-01"));
        assert_eq!(report.days[0].total_sales, 20.0);
        assert_eq!(report.days[6].total_sales, 35.0);
        assert_eq!(report.days[6].total_orders, 2);
        assert_eq!(report.days[3].total_orders, 0);
        assert_eq!(report.max_daily_total, MIN_CHART_SCALE);
    }

    #[tokio::test]
    async fn test_weekly_scale_follows_best_day() {
        let (_dir, pool) = fresh_pool().await;
        seed_order(&pool, "2025-03-05T12:00:00.000Z", "Ana", "completed", 250.5).await;

        let report = weekly_report(&pool, day("2025-03-07")).await.unwrap();

        assert_eq!(report.max_daily_total, 250.5);
    }

    #[tokio::test]
    async fn test_dashboard_counts() {
        let (_dir, pool) = fresh_pool().await;
        seed_order(&pool, "2025-03-07T08:00:00.000Z", "Ana", "pending", 4.0).await;
        seed_order(&pool, "2025-03-07T09:00:00.000Z", "Beto", "completed", 6.0).await;
        sqlx::query("INSERT INTO inventory (id, name, category, quantity, unit, min_stock, updated_at) VALUES (?, 'Leche', 'Leche', 1.0, 'lt', 5.0, '2025-03-07T08:00:00.000Z')")
            .bind(Uuid::new_v4().to_string())
            .execute(&pool)
            .await
            .unwrap();

        let counts = dashboard_counts(&pool, day("2025-03-07")).await.unwrap();

        assert!(ping(&pool).await);
        assert_eq!(counts.active_orders, 1);
        assert_eq!(counts.low_stock_items, 1);
        assert_eq!(counts.today_sales, 10.0);
    }
}
