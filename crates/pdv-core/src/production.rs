//! # Production
//!
//! Pieces moulded in the workshop: how many, by whom, and how many bags of
//! plaster went into them. A production can be sent to stock once, which
//! adds its quantity to the catalog product with the same name.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;
use crate::validation::{validate_non_negative, validate_quantity, validate_required_text};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Production {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub piece_name: String,
    pub quantity: i64,
    /// Bags of plaster (gesso) used.
    pub plaster_bags: i64,
    /// Worker (colaborador / moldureiro). Empty when not informed.
    pub worker: String,
    pub sent_to_stock: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductionInput {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub piece_name: String,
    pub quantity: i64,
    #[serde(default)]
    pub plaster_bags: i64,
    #[serde(default)]
    pub worker: String,
}

impl Production {
    pub fn create(input: ProductionInput) -> CoreResult<Production> {
        validate_required_text("piece_name", &input.piece_name, 200)?;
        validate_quantity(input.quantity)?;
        validate_non_negative("plaster_bags", input.plaster_bags)?;
        Ok(Production {
            id: Uuid::new_v4().to_string(),
            date: input.date,
            piece_name: input.piece_name.trim().to_string(),
            quantity: input.quantity,
            plaster_bags: input.plaster_bags,
            worker: input.worker.trim().to_string(),
            sent_to_stock: false,
            created_at: Utc::now(),
        })
    }

    /// Marks the production as sent; fails if it already was.
    pub fn mark_sent(&mut self) -> CoreResult<()> {
        if self.sent_to_stock {
            return Err(CoreError::AlreadyProcessed {
                entity: "production",
                id: self.id.clone(),
            });
        }
        self.sent_to_stock = true;
        Ok(())
    }

    /// Catalog product this production feeds: same name, ignoring case and
    /// surrounding spaces.
    pub fn matching_product<'a>(&self, products: &'a [Product]) -> Option<&'a Product> {
        let key = piece_key(&self.piece_name);
        products.iter().find(|p| piece_key(&p.name) == key)
    }
}

fn piece_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductionSummary {
    /// Units per piece, keyed by lower-cased piece name.
    pub piece_totals: BTreeMap<String, i64>,
    pub total_plaster_bags: i64,
    /// Distinct non-empty worker names, sorted.
    pub workers: Vec<String>,
}

/// Summarises `productions`, optionally only those of one worker.
pub fn production_summary(productions: &[Production], worker: Option<&str>) -> ProductionSummary {
    let mut workers: Vec<String> = productions
        .iter()
        .map(|p| p.worker.clone())
        .filter(|w| !w.is_empty())
        .collect();
    workers.sort();
    workers.dedup();

    let mut summary = ProductionSummary {
        piece_totals: BTreeMap::new(),
        total_plaster_bags: 0,
        workers,
    };

    for p in productions
        .iter()
        .filter(|p| worker.map_or(true, |w| p.worker == w))
    {
        *summary.piece_totals.entry(piece_key(&p.piece_name)).or_insert(0) += p.quantity;
        summary.total_plaster_bags += p.plaster_bags;
    }
    summary
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make(piece: &str, qty: i64, bags: i64, worker: &str) -> Production {
        Production::create(ProductionInput {
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            piece_name: piece.to_string(),
            quantity: qty,
            plaster_bags: bags,
            worker: worker.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_create_validates() {
        assert!(Production::create(ProductionInput {
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            piece_name: " ".to_string(),
            quantity: 1,
            plaster_bags: 0,
            worker: String::new(),
        })
        .is_err());
    }

    #[test]
    fn test_summary_groups_case_insensitively() {
        let productions = vec![
            make("Moldura Reta", 10, 2, "João"),
            make("moldura reta ", 5, 1, "Pedro"),
            make("Roseta", 3, 1, "João"),
        ];
        let summary = production_summary(&productions, None);
        assert_eq!(summary.piece_totals["moldura reta"], 15);
        assert_eq!(summary.piece_totals["roseta"], 3);
        assert_eq!(summary.total_plaster_bags, 4);
        assert_eq!(summary.workers, vec!["João".to_string(), "Pedro".to_string()]);

        let joao = production_summary(&productions, Some("João"));
        assert_eq!(joao.piece_totals["moldura reta"], 10);
        assert_eq!(joao.total_plaster_bags, 3);
    }

    #[test]
    fn test_mark_sent_once() {
        let mut p = make("Roseta", 3, 1, "");
        p.mark_sent().unwrap();
        assert!(matches!(p.mark_sent(), Err(CoreError::AlreadyProcessed { .. })));
    }

    #[test]
    fn test_matching_product() {
        let product = Product {
            id: "p1".to_string(),
            name: "ROSETA".to_string(),
            category: String::new(),
            description: None,
            barcode: None,
            price_cents: 1000,
            cost_cents: 0,
            stock: 0,
            min_stock: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let p = make(" roseta", 3, 1, "");
        assert_eq!(p.matching_product(std::slice::from_ref(&product)).map(|p| p.id.as_str()), Some("p1"));
        assert!(make("Sanca", 1, 0, "").matching_product(&[product]).is_none());
    }
}
