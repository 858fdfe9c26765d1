//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two stores, one database                             │
//! │                                                                         │
//! │  Relational tables                  local_store (key → JSON document)  │
//! │  ─────────────────                  ─────────────────────────────────  │
//! │  ProductRepository                  BudgetRepository      "budget"     │
//! │  CustomerRepository                 ExpenseRepository     "expenses"   │
//! │  SupplierRepository (+ purchases)   ProductionRepository  "productions"│
//! │  SaleRepository     (checkout)      WithdrawalRepository  "withdrawals"│
//! │  StockRepository    (movements)     company info          "company"    │
//! │  AccountRepository                                                     │
//! │  CashFlowRepository                                                    │
//! │                                                                         │
//! │  Operations spanning both (budget → sale, production → stock) share    │
//! │  one SQLite transaction.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions taking `&mut SqliteConnection` are the transaction-scoped
//! building blocks; repositories compose them inside `pool.begin()`.

pub mod account;
pub mod budget;
pub mod cash_flow;
pub mod customer;
pub mod expense;
pub mod local_store;
pub mod product;
pub mod production;
pub mod sale;
pub mod stock;
pub mod supplier;
pub mod withdrawal;

/// Turns blank optional text into `None` and trims the rest.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use pdv_core::{Product, ProductInput};

    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn product(db: &Database, name: &str, price: i64, cost: i64, stock: i64) -> Product {
        db.products()
            .insert(ProductInput {
                name: name.to_string(),
                category: "Gesso".to_string(),
                price_cents: price,
                cost_cents: cost,
                stock,
                ..Default::default()
            })
            .await
            .unwrap()
    }

    pub fn today() -> chrono::NaiveDate {
        Utc::now().date_naive()
    }
}
