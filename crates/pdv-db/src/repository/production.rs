//! # Production Repository
//!
//! Workshop production (peças de gesso) in the local store under
//! `"productions"`, newest first.
//!
//! Sending a production to stock finds the catalog product with the same
//! name and records an `entrada` for it, in the same transaction that marks
//! the production as sent.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::local_store::{keys, load_in, save_in};
use super::product::list_products;
use super::stock::entry_in;
use crate::error::{DbError, DbResult};
use pdv_core::production::{production_summary, Production, ProductionInput, ProductionSummary};
use pdv_core::stock::CostMode;
use pdv_core::{CoreError, StockMovement};

#[derive(Debug, Clone)]
pub struct ProductionRepository {
    pool: SqlitePool,
}

impl ProductionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductionRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Production>> {
        let mut conn = self.pool.acquire().await?;
        let productions: Vec<Production> = load_in(&mut conn, keys::PRODUCTIONS).await?;
        debug!(count = productions.len(), "Listed productions");
        Ok(productions)
    }

    pub async fn create(&self, input: ProductionInput) -> DbResult<Production> {
        let production = Production::create(input)?;

        let mut tx = self.pool.begin().await?;
        let mut productions: Vec<Production> = load_in(&mut tx, keys::PRODUCTIONS).await?;
        productions.insert(0, production.clone());
        save_in(&mut tx, keys::PRODUCTIONS, &productions).await?;
        tx.commit().await?;

        info!(
            id = %production.id,
            piece = %production.piece_name,
            quantity = production.quantity,
            "Production recorded"
        );
        Ok(production)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut productions: Vec<Production> = load_in(&mut tx, keys::PRODUCTIONS).await?;
        let before = productions.len();
        productions.retain(|p| p.id != id);
        if productions.len() == before {
            return Err(DbError::not_found("Production", id));
        }
        save_in(&mut tx, keys::PRODUCTIONS, &productions).await?;
        tx.commit().await?;

        info!(id = %id, "Production deleted");
        Ok(())
    }

    /// Totals per piece and plaster bags, optionally for one worker.
    pub async fn summary(&self, worker: Option<&str>) -> DbResult<ProductionSummary> {
        let productions = self.list().await?;
        Ok(production_summary(&productions, worker))
    }

    /// Adds the produced quantity to the matching product.
    ///
    /// ## Errors
    /// * `CoreError::AlreadyProcessed` - production was already sent
    /// * `CoreError::ProductNotFound` - no product named like the piece
    pub async fn send_to_stock(&self, id: &str, date: NaiveDate) -> DbResult<(Production, StockMovement)> {
        let mut tx = self.pool.begin().await?;
        let mut productions: Vec<Production> = load_in(&mut tx, keys::PRODUCTIONS).await?;
        let production = productions
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DbError::not_found("Production", id))?;

        production.mark_sent()?;

        let products = list_products(&mut tx, false).await?;
        let product_id = production
            .matching_product(&products)
            .map(|p| p.id.clone())
            .ok_or_else(|| CoreError::ProductNotFound(production.piece_name.clone()))?;

        let reason = format!("Produção: {}", production.piece_name);
        let movement = entry_in(
            &mut tx,
            &product_id,
            production.quantity,
            CostMode::Keep,
            Some(&reason),
            date,
            None,
        )
        .await?;
        let sent = production.clone();

        save_in(&mut tx, keys::PRODUCTIONS, &productions).await?;
        tx.commit().await?;

        info!(
            id = %id,
            product_id = %product_id,
            quantity = sent.quantity,
            "Production sent to stock"
        );
        Ok((sent, movement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{product, test_db, today};

    fn input(piece: &str, quantity: i64, bags: i64, worker: &str) -> ProductionInput {
        ProductionInput {
            date: today(),
            piece_name: piece.to_string(),
            quantity,
            plaster_bags: bags,
            worker: worker.to_string(),
        }
    }

    #[tokio::test]
    async fn test_summary_by_worker() {
        let db = test_db().await;
        let repo = db.productions();
        repo.create(input("Sanca Aberta", 20, 2, "Carlos")).await.unwrap();
        repo.create(input("sanca aberta ", 10, 1, "José")).await.unwrap();
        repo.create(input("Moldura 5cm", 30, 3, "Carlos")).await.unwrap();

        let all = repo.summary(None).await.unwrap();
        assert_eq!(all.piece_totals.get("sanca aberta"), Some(&30));
        assert_eq!(all.total_plaster_bags, 6);
        assert_eq!(all.workers, vec!["Carlos".to_string(), "José".to_string()]);

        let carlos = repo.summary(Some("Carlos")).await.unwrap();
        assert_eq!(carlos.total_plaster_bags, 5);
    }

    #[tokio::test]
    async fn test_send_to_stock_once() {
        let db = test_db().await;
        let sanca = product(&db, "Sanca Aberta", 2_500, 800, 5).await;
        let made = db.productions().create(input("  sanca aberta", 12, 1, "")).await.unwrap();

        let (sent, movement) = db.productions().send_to_stock(&made.id, today()).await.unwrap();
        assert!(sent.sent_to_stock);
        assert_eq!(movement.quantity, 12);
        assert_eq!(movement.product_id, sanca.id);

        let reloaded = db.products().get(&sanca.id).await.unwrap();
        assert_eq!(reloaded.stock, 17);
        assert_eq!(reloaded.cost_cents, 800);

        assert!(matches!(
            db.productions().send_to_stock(&made.id, today()).await,
            Err(DbError::Core(CoreError::AlreadyProcessed { .. }))
        ));
        assert_eq!(db.products().get(&sanca.id).await.unwrap().stock, 17);
    }

    #[tokio::test]
    async fn test_send_without_product_rolls_back() {
        let db = test_db().await;
        let made = db.productions().create(input("Roseta", 4, 1, "")).await.unwrap();

        assert!(matches!(
            db.productions().send_to_stock(&made.id, today()).await,
            Err(DbError::Core(CoreError::ProductNotFound(_)))
        ));
        let stored = db.productions().list().await.unwrap();
        assert!(!stored[0].sent_to_stock);
    }
}
