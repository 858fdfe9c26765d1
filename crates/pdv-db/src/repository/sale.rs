//! # Sale Repository
//!
//! Checkout and the sale lifecycle.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout(request)                                                      │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  1. sale with this checkout_token? ──yes──► return it (replayed)       │
//! │       │ no                                                              │
//! │  2. INSERT sales (sale_number = MAX + 1)                               │
//! │  3. per line:  INSERT sale_items                                       │
//! │                product line? UPDATE stock … WHERE stock >= qty         │
//! │                              INSERT stock_movements (saida)            │
//! │  4. status pago? INSERT cash_flow (income "Venda #N")                  │
//! │       ▼  COMMIT                                                         │
//! │                                                                         │
//! │  Any error → ROLLBACK: no sale, no stock change, no cash entry         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sale Lifecycle
//! ```text
//!   pendente ──mark_paid──► pago
//!      │                     │
//!      └────cancel_sale──────┴──► cancelado   (restocks, reverses cash)
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cash_flow::{record, SALES_CATEGORY};
use super::stock::{entry_in, exit_in};
use crate::error::{DbError, DbResult};
use pdv_core::cart::CheckoutRequest;
use pdv_core::stock::CostMode;
use pdv_core::{CashFlowKind, CoreError, Sale, SaleItem, SaleStatus, SaleWithItems};

const SALE_COLUMNS: &str = "id, sale_number, checkout_token, sale_date, customer_id, customer_name, \
     payment_method, status, subtotal_cents, discount_cents, total_cents, profit_cents, \
     amount_paid_cents, change_cents, budget_id, created_at";

const ITEM_COLUMNS: &str =
    "id, sale_id, product_id, name_snapshot, quantity, unit_price_cents, unit_cost_cents, line_total_cents";

/// Result of a checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub sale: SaleWithItems,
    /// True when the token had already been used and the existing sale was
    /// returned without writing anything.
    pub replayed: bool,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Writes a sale, its items, stock exits and cash entry atomically.
    ///
    /// ## Errors
    /// * `CoreError::CartEmpty`, `InsufficientPayment`, validation errors
    /// * `CoreError::InsufficientStock` - a product line exceeds stock
    /// * `DbError::NotFound` - a product line references a missing product
    pub async fn checkout(&self, request: &CheckoutRequest) -> DbResult<CheckoutOutcome> {
        let mut tx = self.pool.begin().await?;
        let outcome = checkout_in(&mut tx, request).await?;
        tx.commit().await?;

        if outcome.replayed {
            info!(
                sale_id = %outcome.sale.sale.id,
                token = %request.checkout_token,
                "Checkout replayed, returning existing sale"
            );
        } else {
            info!(
                sale_id = %outcome.sale.sale.id,
                sale_number = outcome.sale.sale.sale_number,
                total = outcome.sale.sale.total_cents,
                "Sale completed"
            );
        }
        Ok(outcome)
    }

    /// Cancels a sale: restocks product lines and reverses the cash entry
    /// of a paid sale.
    pub async fn cancel_sale(&self, id: &str, today: NaiveDate) -> DbResult<SaleWithItems> {
        let mut tx = self.pool.begin().await?;
        let sale = fetch_sale(&mut tx, id).await?;
        if !sale.status.can_transition_to(SaleStatus::Cancelado) {
            return Err(CoreError::transition("sale", sale.status, SaleStatus::Cancelado).into());
        }

        set_status(&mut tx, id, SaleStatus::Cancelado, None).await?;

        let items = fetch_items(&mut tx, id).await?;
        let reason = format!("Cancelamento venda #{}", sale.sale_number);
        for item in &items {
            if let Some(product_id) = &item.product_id {
                entry_in(
                    &mut tx,
                    product_id,
                    item.quantity,
                    CostMode::Keep,
                    Some(&reason),
                    today,
                    Some(id),
                )
                .await?;
            }
        }

        if sale.status == SaleStatus::Pago {
            record(
                &mut tx,
                &format!("Estorno venda #{}", sale.sale_number),
                CashFlowKind::Expense,
                sale.total_cents,
                SALES_CATEGORY,
                today,
                Some(id),
            )
            .await?;
        }

        let cancelled = get_with_items_in(&mut tx, id).await?;
        tx.commit().await?;

        warn!(sale_id = %id, sale_number = sale.sale_number, "Sale cancelled");
        Ok(cancelled)
    }

    /// Settles a pending (boleto) sale.
    pub async fn mark_paid(&self, id: &str, today: NaiveDate) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;
        let sale = fetch_sale(&mut tx, id).await?;
        if sale.status != SaleStatus::Pendente {
            return Err(CoreError::transition("sale", sale.status, SaleStatus::Pago).into());
        }

        set_status(&mut tx, id, SaleStatus::Pago, Some(sale.total_cents)).await?;
        record(
            &mut tx,
            &format!("Venda #{}", sale.sale_number),
            CashFlowKind::Income,
            sale.total_cents,
            SALES_CATEGORY,
            today,
            Some(id),
        )
        .await?;

        let paid = fetch_sale(&mut tx, id).await?;
        tx.commit().await?;

        info!(sale_id = %id, "Sale marked as paid");
        Ok(paid)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        find_sale(&mut conn, id).await
    }

    /// The sale written by `checkout_token`, if any.
    pub async fn get_by_token(&self, checkout_token: &str) -> DbResult<Option<SaleWithItems>> {
        let mut conn = self.pool.acquire().await?;
        find_by_token(&mut conn, checkout_token).await
    }

    /// Gets a sale with its items, failing with `NotFound`.
    pub async fn get_with_items(&self, id: &str) -> DbResult<SaleWithItems> {
        let mut conn = self.pool.acquire().await?;
        get_with_items_in(&mut conn, id).await
    }

    /// Sales with `from <= sale_date <= to` (either bound optional), newest
    /// first.
    pub async fn list(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales
             WHERE (?1 IS NULL OR sale_date >= ?1) AND (?2 IS NULL OR sale_date <= ?2)
             ORDER BY sale_date DESC, sale_number DESC"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    /// Like [`list`](Self::list), with items attached.
    pub async fn list_with_items(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<SaleWithItems>> {
        let sales = self.list(from, to).await?;

        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items
             WHERE sale_id IN (SELECT id FROM sales
                               WHERE (?1 IS NULL OR sale_date >= ?1) AND (?2 IS NULL OR sale_date <= ?2))
             ORDER BY rowid"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut by_sale: std::collections::HashMap<String, Vec<SaleItem>> = std::collections::HashMap::new();
        for item in items {
            by_sale.entry(item.sale_id.clone()).or_default().push(item);
        }

        Ok(sales
            .into_iter()
            .map(|sale| SaleWithItems {
                items: by_sale.remove(&sale.id).unwrap_or_default(),
                sale,
            })
            .collect())
    }

    #[cfg(test)]
    pub(crate) async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?)
    }
}

// =============================================================================
// Transaction building blocks
// =============================================================================

pub(crate) async fn find_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
    Ok(sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?)
}

async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Sale> {
    find_sale(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", id))
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid");
    Ok(sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?)
}

pub(crate) async fn get_with_items_in(conn: &mut SqliteConnection, id: &str) -> DbResult<SaleWithItems> {
    let sale = fetch_sale(conn, id).await?;
    let items = fetch_items(conn, id).await?;
    Ok(SaleWithItems { sale, items })
}

/// The sale already written for `checkout_token`, if any.
pub(crate) async fn find_by_token(
    conn: &mut SqliteConnection,
    checkout_token: &str,
) -> DbResult<Option<SaleWithItems>> {
    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM sales WHERE checkout_token = ?1")
        .bind(checkout_token)
        .fetch_optional(&mut *conn)
        .await?;
    match existing {
        Some(id) => Ok(Some(get_with_items_in(conn, &id).await?)),
        None => Ok(None),
    }
}

async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: SaleStatus,
    amount_paid_cents: Option<i64>,
) -> DbResult<()> {
    sqlx::query("UPDATE sales SET status = ?2, amount_paid_cents = COALESCE(?3, amount_paid_cents) WHERE id = ?1")
        .bind(id)
        .bind(status)
        .bind(amount_paid_cents)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// The checkout steps, inside a caller-owned transaction.
pub(crate) async fn checkout_in(
    conn: &mut SqliteConnection,
    request: &CheckoutRequest,
) -> DbResult<CheckoutOutcome> {
    if let Some(sale) = find_by_token(conn, &request.checkout_token).await? {
        return Ok(CheckoutOutcome { sale, replayed: true });
    }

    request.validate()?;

    let totals = request.totals();
    let amount_paid_cents = if request.payment_method.gives_change() {
        request.amount_paid_cents
    } else {
        totals.total_cents
    };
    let sale_id = Uuid::new_v4().to_string();

    debug!(sale_id = %sale_id, lines = request.lines.len(), "Starting checkout");

    // The number is taken in the same statement that writes the row, so two
    // writers never read the same MAX.
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, sale_number, checkout_token, sale_date, customer_id, customer_name,
            payment_method, status, subtotal_cents, discount_cents, total_cents,
            profit_cents, amount_paid_cents, change_cents, budget_id, created_at
        ) VALUES (
            ?1, (SELECT COALESCE(MAX(sale_number), 0) + 1 FROM sales), ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15
        )
        "#,
    )
    .bind(&sale_id)
    .bind(&request.checkout_token)
    .bind(request.sale_date)
    .bind(&request.customer_id)
    .bind(request.customer_name.trim())
    .bind(request.payment_method)
    .bind(request.status)
    .bind(totals.subtotal_cents)
    .bind(totals.discount_cents)
    .bind(totals.total_cents)
    .bind(totals.profit_cents)
    .bind(amount_paid_cents)
    .bind(request.change_cents())
    .bind(&request.budget_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    let sale_number: i64 = sqlx::query_scalar("SELECT sale_number FROM sales WHERE id = ?1")
        .bind(&sale_id)
        .fetch_one(&mut *conn)
        .await?;
    let reason = format!("Venda #{}", sale_number);

    for line in &request.lines {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, name_snapshot, quantity,
                unit_price_cents, unit_cost_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&sale_id)
        .bind(&line.product_id)
        .bind(line.name.trim())
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.unit_cost_cents)
        .bind(line.line_total().cents())
        .execute(&mut *conn)
        .await?;

        if let Some(product_id) = &line.product_id {
            exit_in(conn, product_id, line.quantity, &reason, request.sale_date, Some(&sale_id)).await?;
        }
    }

    if request.status == SaleStatus::Pago {
        record(
            conn,
            &reason,
            CashFlowKind::Income,
            totals.total_cents,
            SALES_CATEGORY,
            request.sale_date,
            Some(&sale_id),
        )
        .await?;
    }

    Ok(CheckoutOutcome {
        sale: get_with_items_in(conn, &sale_id).await?,
        replayed: false,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{product, test_db, today};
    use pdv_core::cart::{Cart, Discount};
    use pdv_core::{MovementKind, PaymentMethod};

    async fn cart_with(db: &crate::Database, qty: i64) -> (Cart, String) {
        let p = product(db, "Placa 60x60", 1_000, 600, 10).await;
        let mut cart = Cart::new();
        cart.add_product(&p, qty).unwrap();
        (cart, p.id)
    }

    #[tokio::test]
    async fn test_cash_checkout_writes_everything() {
        let db = test_db().await;
        let (mut cart, product_id) = cart_with(&db, 3).await;
        cart.add_manual_item("Instalação", 5_000, 1).unwrap();
        cart.set_amount_paid(10_000).unwrap();

        let request = cart.checkout("tok-1", today()).unwrap();
        let outcome = db.sales().checkout(&request).await.unwrap();
        assert!(!outcome.replayed);

        let sale = &outcome.sale.sale;
        assert_eq!(sale.sale_number, 1);
        assert_eq!(sale.status, SaleStatus::Pago);
        assert_eq!(sale.total_cents, 8_000);
        // (1000 - 600) × 3 + manual item at cost 0
        assert_eq!(sale.profit_cents, 6_200);
        assert_eq!(sale.change_cents, 2_000);
        assert_eq!(outcome.sale.items.len(), 2);

        assert_eq!(db.products().get(&product_id).await.unwrap().stock, 7);

        let movements = db.stock().movements(None, 10).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Saida);
        assert_eq!(movements[0].reason, "Venda #1");

        let cash = db.cash_flow().list(None, None).await.unwrap();
        assert_eq!(cash.len(), 1);
        assert_eq!(cash[0].amount_cents, 8_000);
    }

    #[tokio::test]
    async fn test_checkout_is_idempotent() {
        let db = test_db().await;
        let (mut cart, product_id) = cart_with(&db, 2).await;
        cart.payment_method = PaymentMethod::Pix;

        let request = cart.checkout("same-token", today()).unwrap();
        let first = db.sales().checkout(&request).await.unwrap();
        let second = db.sales().checkout(&request).await.unwrap();

        assert!(second.replayed);
        assert_eq!(first.sale.sale.id, second.sale.sale.id);
        assert_eq!(db.sales().count().await.unwrap(), 1);
        assert_eq!(db.products().get(&product_id).await.unwrap().stock, 8);

        let found = db.sales().get_by_token("same-token").await.unwrap().unwrap();
        assert_eq!(found.sale.id, first.sale.sale.id);
        assert!(db.sales().get_by_token("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back() {
        let db = test_db().await;
        let (mut cart, product_id) = cart_with(&db, 5).await;
        cart.payment_method = PaymentMethod::Pix;
        let request = cart.checkout("tok", today()).unwrap();

        // Someone else sells 8 of the 10 meanwhile.
        db.stock().exit(&product_id, 8, "Venda balcão", today()).await.unwrap();

        let err = db.sales().checkout(&request).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 2, requested: 5, .. })
        ));
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.products().get(&product_id).await.unwrap().stock, 2);
        assert!(db.cash_flow().list(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sale_numbers_are_sequential() {
        let db = test_db().await;
        let (mut cart, _) = cart_with(&db, 1).await;
        cart.payment_method = PaymentMethod::Debito;

        for (i, token) in ["a", "b", "c"].iter().enumerate() {
            let outcome = db.sales().checkout(&cart.checkout(token, today()).unwrap()).await.unwrap();
            assert_eq!(outcome.sale.sale.sale_number, i as i64 + 1);
        }
    }

    #[tokio::test]
    async fn test_boleto_pending_then_paid() {
        let db = test_db().await;
        let (mut cart, _) = cart_with(&db, 1).await;
        cart.payment_method = PaymentMethod::Boleto;

        let outcome = db.sales().checkout(&cart.checkout("b1", today()).unwrap()).await.unwrap();
        let sale = outcome.sale.sale;
        assert_eq!(sale.status, SaleStatus::Pendente);
        assert!(db.cash_flow().list(None, None).await.unwrap().is_empty());

        let paid = db.sales().mark_paid(&sale.id, today()).await.unwrap();
        assert_eq!(paid.status, SaleStatus::Pago);
        assert_eq!(paid.amount_paid_cents, paid.total_cents);
        assert_eq!(db.cash_flow().list(None, None).await.unwrap().len(), 1);

        assert!(matches!(
            db.sales().mark_paid(&sale.id, today()).await,
            Err(DbError::Core(CoreError::InvalidStatusTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_cancel_restocks_and_reverses_cash() {
        let db = test_db().await;
        let (mut cart, product_id) = cart_with(&db, 4).await;
        cart.set_discount(Discount::Amount(500)).unwrap();
        cart.set_amount_paid(3_500).unwrap();
        let sale = db
            .sales()
            .checkout(&cart.checkout("c1", today()).unwrap())
            .await
            .unwrap()
            .sale
            .sale;

        let cancelled = db.sales().cancel_sale(&sale.id, today()).await.unwrap();
        assert_eq!(cancelled.sale.status, SaleStatus::Cancelado);
        assert_eq!(db.products().get(&product_id).await.unwrap().stock, 10);

        let cash = db.cash_flow().list(None, None).await.unwrap();
        let income: i64 = cash.iter().filter(|c| c.kind == CashFlowKind::Income).map(|c| c.amount_cents).sum();
        let expense: i64 = cash.iter().filter(|c| c.kind == CashFlowKind::Expense).map(|c| c.amount_cents).sum();
        assert_eq!(income, 3_500);
        assert_eq!(expense, 3_500);

        assert!(matches!(
            db.sales().cancel_sale(&sale.id, today()).await,
            Err(DbError::Core(CoreError::InvalidStatusTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_list_with_items_by_period() {
        let db = test_db().await;
        let (mut cart, _) = cart_with(&db, 1).await;
        cart.payment_method = PaymentMethod::Pix;

        let old = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        let mut request = cart.checkout("old", today()).unwrap();
        request.sale_date = old;
        db.sales().checkout(&request).await.unwrap();
        db.sales().checkout(&cart.checkout("new", today()).unwrap()).await.unwrap();

        let all = db.sales().list_with_items(None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|s| s.items.len() == 1));

        let only_old = db.sales().list(Some(old), Some(old)).await.unwrap();
        assert_eq!(only_old.len(), 1);
        assert_eq!(only_old[0].sale_date, old);
    }
}
