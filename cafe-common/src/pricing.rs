//! Recipe cost and price/margin arithmetic for the product editor

use serde::Serialize;

/// Round a currency amount to cents
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One recipe line with the unit cost of its inventory item
#[derive(Debug, Clone, Copy)]
pub struct CostLine {
    /// Cost per inventory unit; items never restocked have none
    pub unit_cost: Option<f64>,
    pub quantity_required: f64,
}

/// Total ingredient cost of one product unit
pub fn recipe_cost(lines: &[CostLine]) -> f64 {
    lines
        .iter()
        .map(|l| l.unit_cost.unwrap_or(0.0) * l.quantity_required)
        .sum()
}

/// Price that yields `margin_percent` over `cost`
pub fn price_for_margin(cost: f64, margin_percent: f64) -> f64 {
    round2(cost * (1.0 + margin_percent / 100.0))
}

/// Margin of `price` over `cost`; undefined when the recipe costs nothing
pub fn margin_for_price(cost: f64, price: f64) -> Option<f64> {
    if cost > 0.0 {
        Some(round2((price - cost) / cost * 100.0))
    } else {
        None
    }
}

/// Result of pricing a recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub total_cost: f64,
    pub price: f64,
    pub margin_percent: Option<f64>,
}

/// Price a recipe the way the product editor does.
///
/// An explicit margin wins and derives the price. Otherwise an explicit price
/// derives the margin. With neither, `default_margin` is applied.
pub fn quote(
    lines: &[CostLine],
    price: Option<f64>,
    margin: Option<f64>,
    default_margin: f64,
) -> Quote {
    let total_cost = round2(recipe_cost(lines));
    match (margin, price) {
        (Some(m), _) => Quote {
            total_cost,
            price: price_for_margin(total_cost, m),
            margin_percent: Some(m),
        },
        (None, Some(p)) => Quote {
            total_cost,
            price: p,
            margin_percent: margin_for_price(total_cost, p),
        },
        (None, None) => Quote {
            total_cost,
            price: price_for_margin(total_cost, default_margin),
            margin_percent: Some(default_margin),
        },
    }
}
