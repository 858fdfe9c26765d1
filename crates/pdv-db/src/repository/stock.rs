//! # Stock Repository
//!
//! Stock entries and exits with their movement records.
//!
//! ## One Transaction per Change
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  entry(product, 10, CostMode::Total(35000))                            │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  fetch product ──► plan_entry (pdv-core) ──► new stock / unit cost     │
//! │       │                                                                 │
//! │       ├── UPDATE products SET stock, cost_cents                        │
//! │       └── INSERT stock_movements (entrada)                             │
//! │       ▼  COMMIT                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_in` functions are reused by checkout, sale cancellation,
//! purchase receipt and production, inside their own transactions.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::clean;
use super::product::{decrement_stock_guarded, fetch_product, set_stock};
use crate::error::DbResult;
use pdv_core::stock::{plan_entry, plan_exit, CostMode};
use pdv_core::{CoreError, MovementKind, Product, StockMovement};

const MOVEMENT_COLUMNS: &str =
    "id, product_id, product_name, kind, quantity, date, reason, unit_cost_cents, sale_id, created_at";

#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Receives `quantity` units, optionally updating the unit cost.
    ///
    /// Returns the updated product and the recorded movement.
    pub async fn entry(
        &self,
        product_id: &str,
        quantity: i64,
        cost: CostMode,
        reason: Option<&str>,
        date: NaiveDate,
    ) -> DbResult<(Product, StockMovement)> {
        let mut tx = self.pool.begin().await?;
        let movement = entry_in(&mut tx, product_id, quantity, cost, reason, date, None).await?;
        let product = fetch_product(&mut tx, product_id).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            quantity,
            stock = product.stock,
            "Stock entry recorded"
        );
        Ok((product, movement))
    }

    /// Removes `quantity` units (loss, breakage, internal use).
    ///
    /// ## Errors
    /// * `CoreError::InsufficientStock` - less than `quantity` on hand
    pub async fn exit(
        &self,
        product_id: &str,
        quantity: i64,
        reason: &str,
        date: NaiveDate,
    ) -> DbResult<(Product, StockMovement)> {
        let mut tx = self.pool.begin().await?;
        let reason = clean(Some(reason.to_string())).unwrap_or_else(|| "Saída de estoque".to_string());
        let movement = exit_in(&mut tx, product_id, quantity, &reason, date, None).await?;
        let product = fetch_product(&mut tx, product_id).await?;
        tx.commit().await?;

        info!(
            product_id = %product_id,
            quantity,
            stock = product.stock,
            "Stock exit recorded"
        );
        Ok((product, movement))
    }

    /// Movements newest first, optionally for a single product.
    pub async fn movements(&self, product_id: Option<&str>, limit: u32) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements
             WHERE ?1 IS NULL OR product_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = movements.len(), "Listed stock movements");
        Ok(movements)
    }

    /// Every movement, newest first (export and backup).
    pub async fn all_movements(&self) -> DbResult<Vec<StockMovement>> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM stock_movements ORDER BY created_at DESC, rowid DESC");
        Ok(sqlx::query_as::<_, StockMovement>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }
}

// =============================================================================
// Transaction building blocks
// =============================================================================

fn new_movement(
    product: &Product,
    kind: MovementKind,
    quantity: i64,
    date: NaiveDate,
    reason: String,
    unit_cost_cents: Option<i64>,
    sale_id: Option<&str>,
) -> StockMovement {
    StockMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product.id.clone(),
        product_name: product.name.clone(),
        kind,
        quantity,
        date,
        reason,
        unit_cost_cents,
        sale_id: sale_id.map(str::to_string),
        created_at: Utc::now(),
    }
}

pub(crate) async fn insert_movement(conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, product_name, kind, quantity,
            date, reason, unit_cost_cents, sale_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(&movement.product_name)
    .bind(movement.kind)
    .bind(movement.quantity)
    .bind(movement.date)
    .bind(&movement.reason)
    .bind(movement.unit_cost_cents)
    .bind(&movement.sale_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Adds stock and records an `entrada` movement.
pub(crate) async fn entry_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    cost: CostMode,
    reason: Option<&str>,
    date: NaiveDate,
    sale_id: Option<&str>,
) -> DbResult<StockMovement> {
    let product = fetch_product(conn, product_id).await?;
    let plan = plan_entry(&product, quantity, cost, reason)?;

    let new_cost = match cost {
        CostMode::Keep => None,
        _ => Some(plan.unit_cost_cents),
    };
    set_stock(conn, product_id, plan.new_stock, new_cost).await?;

    let movement = new_movement(
        &product,
        MovementKind::Entrada,
        quantity,
        date,
        plan.reason,
        Some(plan.unit_cost_cents),
        sale_id,
    );
    insert_movement(conn, &movement).await?;
    Ok(movement)
}

/// Removes stock behind the `stock >= qty` guard and records a `saida`
/// movement.
pub(crate) async fn exit_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
    reason: &str,
    date: NaiveDate,
    sale_id: Option<&str>,
) -> DbResult<StockMovement> {
    let product = fetch_product(conn, product_id).await?;
    plan_exit(&product, quantity)?;

    if !decrement_stock_guarded(conn, product_id, quantity).await? {
        // Lost a race with another writer between the read and the update.
        let current = fetch_product(conn, product_id).await?;
        return Err(CoreError::InsufficientStock {
            product: current.name,
            available: current.stock,
            requested: quantity,
        }
        .into());
    }

    let movement = new_movement(
        &product,
        MovementKind::Saida,
        quantity,
        date,
        reason.to_string(),
        Some(product.cost_cents),
        sale_id,
    );
    insert_movement(conn, &movement).await?;
    Ok(movement)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{product, test_db, today};
    use crate::DbError;
    use pdv_core::stock::movement_totals;

    #[tokio::test]
    async fn test_entry_with_total_cost() {
        let db = test_db().await;
        let p = product(&db, "Gesso 40kg", 4500, 3000, 2).await;

        let (updated, movement) = db
            .stock()
            .entry(&p.id, 10, CostMode::Total(35_000), None, today())
            .await
            .unwrap();

        assert_eq!(updated.stock, 12);
        assert_eq!(updated.cost_cents, 3_500);
        assert_eq!(movement.kind, MovementKind::Entrada);
        assert_eq!(movement.reason, "Entrada de estoque - Custo: R$ 35,00");
    }

    #[tokio::test]
    async fn test_entry_keep_cost() {
        let db = test_db().await;
        let p = product(&db, "Gesso 40kg", 4500, 3000, 2).await;

        let (updated, movement) = db
            .stock()
            .entry(&p.id, 3, CostMode::Keep, Some("Devolução"), today())
            .await
            .unwrap();

        assert_eq!(updated.stock, 5);
        assert_eq!(updated.cost_cents, 3000);
        assert_eq!(movement.reason, "Devolução");
    }

    #[tokio::test]
    async fn test_exit_rejects_insufficient_and_leaves_no_trace() {
        let db = test_db().await;
        let p = product(&db, "Roseta", 2000, 500, 3).await;

        let err = db.stock().exit(&p.id, 5, "Quebra", today()).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 3, requested: 5, .. })
        ));

        assert_eq!(db.products().get(&p.id).await.unwrap().stock, 3);
        assert!(db.stock().movements(None, 50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movements_newest_first_and_filtered() {
        let db = test_db().await;
        let a = product(&db, "Roseta", 2000, 500, 10).await;
        let b = product(&db, "Sanca", 3000, 900, 10).await;

        db.stock().exit(&a.id, 2, "Quebra", today()).await.unwrap();
        db.stock().entry(&b.id, 4, CostMode::Keep, None, today()).await.unwrap();
        db.stock().exit(&a.id, 1, "  ", today()).await.unwrap();

        let all = db.stock().movements(None, 50).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].quantity, 1);
        assert_eq!(all[0].reason, "Saída de estoque");

        let only_a = db.stock().movements(Some(&a.id), 50).await.unwrap();
        assert_eq!(only_a.len(), 2);

        let totals = movement_totals(&all);
        assert_eq!(totals.entries, 4);
        assert_eq!(totals.exits, 3);
    }
}
