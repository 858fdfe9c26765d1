//! # Budget Repository
//!
//! Budgets (orçamentos) are JSON documents in the local store under
//! `"budget"`, newest first. Selling a budget writes to both stores:
//!
//! ```text
//! convert_to_sale(id, token, method)
//!      │
//!      ▼  BEGIN
//!  sale for token exists? ──yes──► return it (replayed)
//!      │ no
//!  load budgets ─► budget.to_checkout()   (status + validity checks)
//!      │
//!  product lines ─► cost_cents from the catalog
//!      │
//!  checkout_in()   sales, sale_items, stock exits, cash flow
//!      │
//!  budget.status = vendido, sale_id = sale.id ─► save budgets
//!      ▼  COMMIT
//! ```

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::local_store::{keys, load_in, save_in};
use super::sale::{checkout_in, find_by_token, CheckoutOutcome};
use crate::error::{DbError, DbResult};
use pdv_core::budget::{next_budget_number, Budget, BudgetInput, BudgetStatus};
use pdv_core::{CoreError, PaymentMethod};

#[derive(Debug, Clone)]
pub struct BudgetRepository {
    pool: SqlitePool,
}

impl BudgetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BudgetRepository { pool }
    }

    /// All budgets, newest first.
    pub async fn list(&self) -> DbResult<Vec<Budget>> {
        let mut conn = self.pool.acquire().await?;
        let budgets: Vec<Budget> = load_in(&mut conn, keys::BUDGETS).await?;
        debug!(count = budgets.len(), "Listed budgets");
        Ok(budgets)
    }

    pub async fn get(&self, id: &str) -> DbResult<Budget> {
        self.list()
            .await?
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| DbError::not_found("Budget", id))
    }

    /// Creates a budget with the next sequential number.
    pub async fn create(&self, input: BudgetInput, today: NaiveDate, validity_days: i64) -> DbResult<Budget> {
        let mut tx = self.pool.begin().await?;
        let mut budgets: Vec<Budget> = load_in(&mut tx, keys::BUDGETS).await?;

        let number = next_budget_number(&budgets);
        let input = with_catalog_costs(&mut tx, input).await?;
        let budget = Budget::build(input, number, today, validity_days)?;
        budgets.insert(0, budget.clone());

        save_in(&mut tx, keys::BUDGETS, &budgets).await?;
        tx.commit().await?;

        info!(
            id = %budget.id,
            number = %budget.budget_number,
            total = budget.total_cents,
            "Budget created"
        );
        Ok(budget)
    }

    /// Replaces the contents of an open budget, keeping its number and
    /// status. Sold and rejected budgets are frozen.
    pub async fn update(
        &self,
        id: &str,
        input: BudgetInput,
        today: NaiveDate,
        validity_days: i64,
    ) -> DbResult<Budget> {
        let mut tx = self.pool.begin().await?;
        let mut budgets: Vec<Budget> = load_in(&mut tx, keys::BUDGETS).await?;
        let slot = budgets
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| DbError::not_found("Budget", id))?;

        if matches!(slot.status, BudgetStatus::Vendido | BudgetStatus::Rejeitado) {
            return Err(CoreError::AlreadyProcessed {
                entity: "budget",
                id: id.to_string(),
            }
            .into());
        }

        let input = with_catalog_costs(&mut tx, input).await?;
        let mut rebuilt = Budget::build(input, slot.budget_number.clone(), today, validity_days)?;
        rebuilt.id = slot.id.clone();
        rebuilt.status = slot.status;
        rebuilt.created_at = slot.created_at;
        *slot = rebuilt.clone();

        save_in(&mut tx, keys::BUDGETS, &budgets).await?;
        tx.commit().await?;

        info!(id = %id, total = rebuilt.total_cents, "Budget updated");
        Ok(rebuilt)
    }

    /// Moves a budget along its lifecycle. `vendido` is only reachable
    /// through [`convert_to_sale`](Self::convert_to_sale).
    pub async fn update_status(&self, id: &str, next: BudgetStatus) -> DbResult<Budget> {
        let mut tx = self.pool.begin().await?;
        let mut budgets: Vec<Budget> = load_in(&mut tx, keys::BUDGETS).await?;
        let budget = budgets
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| DbError::not_found("Budget", id))?;

        if next == BudgetStatus::Vendido {
            return Err(CoreError::transition("budget", budget.status, next).into());
        }
        let from = budget.status;
        budget.transition(next)?;
        let updated = budget.clone();

        save_in(&mut tx, keys::BUDGETS, &budgets).await?;
        tx.commit().await?;

        info!(id = %id, from = %from, to = %next, "Budget status changed");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut budgets: Vec<Budget> = load_in(&mut tx, keys::BUDGETS).await?;
        let before = budgets.len();
        budgets.retain(|b| b.id != id);
        if budgets.len() == before {
            return Err(DbError::not_found("Budget", id));
        }
        save_in(&mut tx, keys::BUDGETS, &budgets).await?;
        tx.commit().await?;

        info!(id = %id, "Budget deleted");
        Ok(())
    }

    /// Sells a budget: checkout of its lines and `vendido` status in one
    /// transaction. Repeating a token returns the sale already written.
    ///
    /// ## Errors
    /// * `CoreError::BudgetExpired` - `valid_until` has passed
    /// * `CoreError::InvalidStatusTransition` - budget rejected or sold
    /// * `CoreError::InsufficientStock` - a product line exceeds stock
    pub async fn convert_to_sale(
        &self,
        id: &str,
        checkout_token: &str,
        payment_method: PaymentMethod,
        amount_paid_cents: Option<i64>,
        today: NaiveDate,
    ) -> DbResult<(Budget, CheckoutOutcome)> {
        let mut tx = self.pool.begin().await?;
        let mut budgets: Vec<Budget> = load_in(&mut tx, keys::BUDGETS).await?;
        let index = budgets
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| DbError::not_found("Budget", id))?;

        if let Some(sale) = find_by_token(&mut tx, checkout_token).await? {
            tx.commit().await?;
            info!(budget_id = %id, sale_id = %sale.sale.id, "Budget conversion replayed");
            return Ok((budgets.swap_remove(index), CheckoutOutcome { sale, replayed: true }));
        }

        let mut request = budgets[index].to_checkout(checkout_token, payment_method, amount_paid_cents, today)?;
        for line in &mut request.lines {
            if let Some(product_id) = &line.product_id {
                line.unit_cost_cents = catalog_cost(&mut tx, product_id).await?;
            }
        }
        let outcome = checkout_in(&mut tx, &request).await?;

        let budget = &mut budgets[index];
        budget.transition(BudgetStatus::Vendido)?;
        budget.sale_id = Some(outcome.sale.sale.id.clone());
        let sold = budget.clone();

        save_in(&mut tx, keys::BUDGETS, &budgets).await?;
        tx.commit().await?;

        info!(
            budget_id = %id,
            number = %sold.budget_number,
            sale_id = %outcome.sale.sale.id,
            sale_number = outcome.sale.sale.sale_number,
            "Budget sold"
        );
        Ok((sold, outcome))
    }
}

/// Cost of a product as the catalog has it right now.
async fn catalog_cost(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    sqlx::query_scalar("SELECT cost_cents FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))
}

/// Product-linked lines take their cost from the catalog; only manual
/// lines keep the cost typed into the form.
async fn with_catalog_costs(conn: &mut SqliteConnection, mut input: BudgetInput) -> DbResult<BudgetInput> {
    for item in &mut input.items {
        if let Some(product_id) = &item.product_id {
            item.unit_cost_cents = catalog_cost(conn, product_id).await?;
        }
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{product, test_db, today};
    use chrono::Duration;
    use pdv_core::budget::{BudgetCustomer, BudgetItemInput};
    use pdv_core::cart::Discount;
    use pdv_core::{ProductInput, SaleStatus};

    fn input(product_id: Option<String>, quantity: i64) -> BudgetInput {
        BudgetInput {
            date: None,
            valid_until: None,
            delivery_date: None,
            customer: BudgetCustomer {
                name: "Construtora Alfa".to_string(),
                document: "11.222.333/0001-81".to_string(),
                address: None,
                city: Some("Anápolis".to_string()),
                phone: None,
                kind: Default::default(),
            },
            items: vec![BudgetItemInput {
                product_id,
                name: "Placa de gesso 60x60".to_string(),
                quantity,
                unit: "un".to_string(),
                unit_price_cents: 1_500,
                unit_cost_cents: 900,
            }],
            discount: Discount::None,
            payment_terms: Some("50% entrada".to_string()),
            observations: None,
        }
    }

    #[tokio::test]
    async fn test_numbers_are_sequential() {
        let db = test_db().await;
        let first = db.budgets().create(input(None, 2), today(), 15).await.unwrap();
        let second = db.budgets().create(input(None, 3), today(), 15).await.unwrap();

        assert_eq!(first.budget_number, "0001");
        assert_eq!(second.budget_number, "0002");
        assert_eq!(first.valid_until, today() + Duration::days(15));

        let listed = db.budgets().list().await.unwrap();
        assert_eq!(listed[0].id, second.id);
    }

    #[tokio::test]
    async fn test_convert_to_sale_in_one_transaction() {
        let db = test_db().await;
        let placa = product(&db, "Placa de gesso 60x60", 1_500, 900, 50).await;
        let budget = db
            .budgets()
            .create(input(Some(placa.id.clone()), 10), today(), 15)
            .await
            .unwrap();

        let (sold, outcome) = db
            .budgets()
            .convert_to_sale(&budget.id, "tok-b1", PaymentMethod::Pix, None, today())
            .await
            .unwrap();

        assert_eq!(sold.status, BudgetStatus::Vendido);
        assert_eq!(sold.sale_id.as_deref(), Some(outcome.sale.sale.id.as_str()));
        assert_eq!(outcome.sale.sale.total_cents, 15_000);
        assert_eq!(outcome.sale.sale.status, SaleStatus::Pago);
        assert_eq!(outcome.sale.sale.budget_id.as_deref(), Some(budget.id.as_str()));
        assert_eq!(db.products().get(&placa.id).await.unwrap().stock, 40);

        let (_, replay) = db
            .budgets()
            .convert_to_sale(&budget.id, "tok-b1", PaymentMethod::Pix, None, today())
            .await
            .unwrap();
        assert!(replay.replayed);
        assert_eq!(db.sales().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_product_lines_use_catalog_cost() {
        let db = test_db().await;
        let placa = product(&db, "Placa de gesso 60x60", 1_000, 600, 50).await;
        let mut request = input(Some(placa.id.clone()), 2);
        request.items[0].unit_price_cents = 1_000;
        request.items[0].unit_cost_cents = 0;

        let budget = db.budgets().create(request, today(), 15).await.unwrap();
        assert_eq!(budget.items[0].unit_cost_cents, 600);
        assert_eq!(budget.profit_cents, 800);

        let (_, outcome) = db
            .budgets()
            .convert_to_sale(&budget.id, "tok-cost", PaymentMethod::Pix, None, today())
            .await
            .unwrap();
        assert_eq!(outcome.sale.sale.total_cents, 2_000);
        assert_eq!(outcome.sale.sale.profit_cents, 800);
        assert!(outcome.sale.items.iter().all(|i| i.unit_cost_cents == 600));
    }

    #[tokio::test]
    async fn test_conversion_uses_cost_at_sale_time() {
        let db = test_db().await;
        let placa = product(&db, "Placa de gesso 60x60", 1_000, 600, 50).await;
        let mut request = input(Some(placa.id.clone()), 2);
        request.items[0].unit_price_cents = 1_000;
        let budget = db.budgets().create(request, today(), 15).await.unwrap();

        db.products()
            .update(
                &placa.id,
                ProductInput {
                    name: placa.name.clone(),
                    category: placa.category.clone(),
                    price_cents: 1_000,
                    cost_cents: 700,
                    stock: 50,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let (_, outcome) = db
            .budgets()
            .convert_to_sale(&budget.id, "tok-cost2", PaymentMethod::Pix, None, today())
            .await
            .unwrap();
        assert_eq!(outcome.sale.sale.profit_cents, 600);
    }

    #[tokio::test]
    async fn test_budget_for_unknown_product_is_rejected() {
        let db = test_db().await;
        let err = db
            .budgets()
            .create(input(Some("missing".to_string()), 1), today(), 15)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(db.budgets().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_conversion_leaves_budget_open() {
        let db = test_db().await;
        let placa = product(&db, "Placa de gesso 60x60", 1_500, 900, 3).await;
        let budget = db
            .budgets()
            .create(input(Some(placa.id.clone()), 10), today(), 15)
            .await
            .unwrap();

        let err = db
            .budgets()
            .convert_to_sale(&budget.id, "tok-b2", PaymentMethod::Dinheiro, None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

        let reloaded = db.budgets().get(&budget.id).await.unwrap();
        assert_eq!(reloaded.status, BudgetStatus::Orcamento);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_budget_cannot_be_sold() {
        let db = test_db().await;
        let mut old = input(None, 1);
        old.date = Some(today() - Duration::days(30));
        old.valid_until = Some(today() - Duration::days(1));
        let budget = db.budgets().create(old, today(), 15).await.unwrap();

        let err = db
            .budgets()
            .convert_to_sale(&budget.id, "tok-b3", PaymentMethod::Dinheiro, None, today())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::BudgetExpired { .. })));
    }

    #[tokio::test]
    async fn test_status_changes_and_freeze() {
        let db = test_db().await;
        let budget = db.budgets().create(input(None, 1), today(), 15).await.unwrap();

        assert!(db.budgets().update_status(&budget.id, BudgetStatus::Vendido).await.is_err());
        let approved = db
            .budgets()
            .update_status(&budget.id, BudgetStatus::Aprovado)
            .await
            .unwrap();
        assert_eq!(approved.status, BudgetStatus::Aprovado);

        let edited = db.budgets().update(&budget.id, input(None, 4), today(), 15).await.unwrap();
        assert_eq!(edited.budget_number, "0001");
        assert_eq!(edited.total_cents, 6_000);
        assert_eq!(edited.status, BudgetStatus::Aprovado);

        db.budgets()
            .update_status(&budget.id, BudgetStatus::Rejeitado)
            .await
            .unwrap();
        assert!(matches!(
            db.budgets().update(&budget.id, input(None, 1), today(), 15).await,
            Err(DbError::Core(CoreError::AlreadyProcessed { .. }))
        ));

        db.budgets().delete(&budget.id).await.unwrap();
        assert!(db.budgets().list().await.unwrap().is_empty());
    }
}
