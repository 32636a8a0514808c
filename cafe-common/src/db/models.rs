//! Database models

use crate::ledger::TransactionKind;
use crate::order_status::OrderStatus;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Menu categories offered by the product editor
pub const PRODUCT_CATEGORIES: [&str; 5] = ["Café", "Pastelería", "Bebidas Frías", "Agregados", "Otro"];

/// Inventory categories offered by the stock editor
pub const INVENTORY_CATEGORIES: [&str; 6] = ["Grano", "Leche", "Jarabe", "Descartable", "Limpieza", "Otro"];

/// Inventory units: units, kilograms, litres, grams, millilitres
pub const INVENTORY_UNITS: [&str; 5] = ["unidades", "kg", "lt", "gr", "ml"];
pub const DEFAULT_INVENTORY_UNIT: &str = "unidades";
pub const DEFAULT_MIN_STOCK: f64 = 5.0;

/// Expense categories for manual cash register entries
pub const EXPENSE_CATEGORIES: [&str; 6] = ["Alquiler", "Servicios", "Mantenimiento", "Sueldos", "Insumos", "Otros"];

pub const WHOLESALE_UNITS: [&str; 7] = ["Unidad", "Kg", "L", "g", "ml", "Paquete", "Caja"];
pub const DEFAULT_WHOLESALE_UNIT: &str = "Unidad";

/// Category and alert threshold for inventory rows created by a restock
pub const RESTOCK_CATEGORY: &str = "Insumo";
pub const RESTOCK_MIN_STOCK: f64 = 10.0;

/// Menu item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub min_stock: f64,
    /// Cost per unit, set by restocks or by hand
    pub cost: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// At or below the alert threshold
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total: f64,
}

/// Order line with the unit price charged at order time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    /// Joined from products; `None` only for rows read without the join
    pub product_name: Option<String>,
    pub quantity: i64,
    pub price: f64,
}

/// Cash register movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StaffRole {
    Gerente,
    Barista,
    #[default]
    Camarero,
    Cajero,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Gerente => "Gerente",
            StaffRole::Barista => "Barista",
            StaffRole::Camarero => "Camarero",
            StaffRole::Cajero => "Cajero",
        }
    }
}

impl FromStr for StaffRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Gerente" => Ok(StaffRole::Gerente),
            "Barista" => Ok(StaffRole::Barista),
            "Camarero" => Ok(StaffRole::Camarero),
            "Cajero" => Ok(StaffRole::Cajero),
            other => Err(Error::Internal(format!("Unknown staff role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: Uuid,
    pub name: String,
    pub role: StaffRole,
}

/// Supplier product bought in batches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WholesaleProduct {
    pub id: Uuid,
    pub name: String,
    /// Price of one whole batch
    pub cost: f64,
    pub batch_quantity: i64,
    pub unit: String,
}

impl WholesaleProduct {
    pub fn cost_per_unit(&self) -> f64 {
        self.cost / self.batch_quantity as f64
    }
}
