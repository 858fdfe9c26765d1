//! # Stock Rules
//!
//! Alerts, valuation and the arithmetic behind stock entries and exits.
//! The database layer applies these inside a transaction together with the
//! movement record.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{MovementKind, Product, StockMovement};
use crate::validation::{validate_cents, validate_non_negative, validate_quantity};

// =============================================================================
// Alerts & Summary
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    OutOfStock,
    LowStock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAlert {
    pub product_id: String,
    pub product_name: String,
    pub stock: i64,
    pub min_stock: i64,
    pub level: AlertLevel,
}

/// Products that are out of stock or at/below their minimum.
///
/// Out-of-stock products come first, then the lowest stock.
pub fn stock_alerts(products: &[Product]) -> Vec<StockAlert> {
    let mut alerts: Vec<StockAlert> = products
        .iter()
        .filter(|p| p.is_active)
        .filter_map(|p| {
            let level = if p.is_out_of_stock() {
                AlertLevel::OutOfStock
            } else if p.is_low_stock() {
                AlertLevel::LowStock
            } else {
                return None;
            };
            Some(StockAlert {
                product_id: p.id.clone(),
                product_name: p.name.clone(),
                stock: p.stock,
                min_stock: p.min_stock_or_default(),
                level,
            })
        })
        .collect();

    alerts.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.product_name.cmp(&b.product_name)));
    alerts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockSummary {
    pub product_count: usize,
    pub total_units: i64,
    /// Σ stock × cost.
    pub total_value_cents: i64,
    pub out_of_stock: usize,
    pub low_stock: usize,
}

pub fn stock_summary(products: &[Product]) -> StockSummary {
    let active = products.iter().filter(|p| p.is_active);
    let mut summary = StockSummary {
        product_count: 0,
        total_units: 0,
        total_value_cents: 0,
        out_of_stock: 0,
        low_stock: 0,
    };
    for p in active {
        summary.product_count += 1;
        summary.total_units += p.stock.max(0);
        summary.total_value_cents += p.stock_value().cents().max(0);
        if p.is_out_of_stock() {
            summary.out_of_stock += 1;
        } else if p.is_low_stock() {
            summary.low_stock += 1;
        }
    }
    summary
}

// =============================================================================
// Entries & Exits
// =============================================================================

/// How a stock entry affects the product's unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "mode", content = "cents", rename_all = "lowercase")]
pub enum CostMode {
    /// Keep the current unit cost.
    Keep,
    /// New unit cost.
    Unit(i64),
    /// Total paid for the whole entry; unit cost = total ÷ quantity.
    Total(i64),
}

/// Result of planning a stock entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPlan {
    pub new_stock: i64,
    pub unit_cost_cents: i64,
    pub reason: String,
}

/// Computes the outcome of receiving `quantity` units.
///
/// ```rust,ignore
/// // 10 bags for R$ 350,00 total → unit cost R$ 35,00
/// let plan = plan_entry(&product, 10, CostMode::Total(35_000), None)?;
/// ```
pub fn plan_entry(
    product: &Product,
    quantity: i64,
    cost: CostMode,
    reason: Option<&str>,
) -> CoreResult<EntryPlan> {
    validate_quantity(quantity)?;

    let unit_cost_cents = match cost {
        CostMode::Keep => product.cost_cents,
        CostMode::Unit(cents) => {
            validate_cents("unit_cost_cents", cents)?;
            cents
        }
        CostMode::Total(cents) => {
            validate_non_negative("total_cost_cents", cents)?;
            Money::from_cents(cents).divide_rounded(quantity).cents()
        }
    };

    let reason = match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => r.to_string(),
        None => format!(
            "Entrada de estoque - Custo: {}",
            Money::from_cents(unit_cost_cents)
        ),
    };

    Ok(EntryPlan {
        new_stock: product.stock + quantity,
        unit_cost_cents,
        reason,
    })
}

/// Checks a stock exit and returns the stock left afterwards.
pub fn plan_exit(product: &Product, quantity: i64) -> CoreResult<i64> {
    validate_quantity(quantity)?;
    if product.stock < quantity {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.stock,
            requested: quantity,
        });
    }
    Ok(product.stock - quantity)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementTotals {
    pub entries: i64,
    pub exits: i64,
    pub entry_count: usize,
    pub exit_count: usize,
}

/// Units moved in and out across `movements`.
pub fn movement_totals(movements: &[StockMovement]) -> MovementTotals {
    movements
        .iter()
        .fold(MovementTotals::default(), |mut acc, m| {
            match m.kind {
                MovementKind::Entrada => {
                    acc.entries += m.quantity;
                    acc.entry_count += 1;
                }
                MovementKind::Saida => {
                    acc.exits += m.quantity;
                    acc.exit_count += 1;
                }
            }
            acc
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn product(id: &str, stock: i64, cost: i64, min: Option<i64>) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Peça {}", id),
            category: String::new(),
            description: None,
            barcode: None,
            price_cents: 5000,
            cost_cents: cost,
            stock,
            min_stock: min,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_alerts_sorted_and_filtered() {
        let products = vec![
            product("a", 50, 100, None),
            product("b", 7, 100, None),
            product("c", 0, 100, None),
            product("d", 4, 100, Some(3)),
        ];
        let alerts = stock_alerts(&products);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].product_id, "c");
        assert_eq!(alerts[0].level, AlertLevel::OutOfStock);
        assert_eq!(alerts[1].product_id, "b");
        assert_eq!(alerts[1].level, AlertLevel::LowStock);
    }

    #[test]
    fn test_inactive_products_are_ignored() {
        let mut p = product("x", 0, 100, None);
        p.is_active = false;
        assert!(stock_alerts(&[p.clone()]).is_empty());
        assert_eq!(stock_summary(&[p]).product_count, 0);
    }

    #[test]
    fn test_summary_value() {
        let summary = stock_summary(&[product("a", 10, 250, None), product("b", 0, 999, None)]);
        assert_eq!(summary.total_value_cents, 2500);
        assert_eq!(summary.total_units, 10);
        assert_eq!(summary.out_of_stock, 1);
        assert_eq!(summary.low_stock, 1);
    }

    #[test]
    fn test_plan_entry_cost_modes() {
        let p = product("a", 5, 1000, None);

        let keep = plan_entry(&p, 3, CostMode::Keep, None).unwrap();
        assert_eq!(keep.new_stock, 8);
        assert_eq!(keep.unit_cost_cents, 1000);
        assert_eq!(keep.reason, "Entrada de estoque - Custo: R$ 10,00");

        let unit = plan_entry(&p, 3, CostMode::Unit(1200), Some("Compra NF 12")).unwrap();
        assert_eq!(unit.unit_cost_cents, 1200);
        assert_eq!(unit.reason, "Compra NF 12");

        let total = plan_entry(&p, 3, CostMode::Total(1000), None).unwrap();
        assert_eq!(total.unit_cost_cents, 333);

        assert!(plan_entry(&p, 0, CostMode::Keep, None).is_err());
        assert!(plan_entry(&p, 1, CostMode::Unit(-5), None).is_err());
    }

    #[test]
    fn test_plan_exit() {
        let p = product("a", 5, 1000, None);
        assert_eq!(plan_exit(&p, 5).unwrap(), 0);
        assert!(matches!(
            plan_exit(&p, 6),
            Err(CoreError::InsufficientStock { available: 5, requested: 6, .. })
        ));
    }

    #[test]
    fn test_movement_totals() {
        let movement = |kind, quantity| StockMovement {
            id: "m".to_string(),
            product_id: "a".to_string(),
            product_name: "Peça a".to_string(),
            kind,
            quantity,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            reason: String::new(),
            unit_cost_cents: None,
            sale_id: None,
            created_at: Utc::now(),
        };
        let totals = movement_totals(&[
            movement(MovementKind::Entrada, 10),
            movement(MovementKind::Saida, 3),
            movement(MovementKind::Saida, 2),
        ]);
        assert_eq!(totals.entries, 10);
        assert_eq!(totals.exits, 5);
        assert_eq!(totals.exit_count, 2);
    }
}
