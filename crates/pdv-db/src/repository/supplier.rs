//! # Supplier Repository
//!
//! Suppliers and their purchases (compras de fornecedor).
//!
//! ## Purchase Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_purchase ──► pending                                           │
//! │       │                                                                 │
//! │       ├── register_payment(x) ──► partial ──► … ──► paid               │
//! │       │      (paid + x > total → Overpayment)                          │
//! │       │                                                                 │
//! │       ├── refresh_overdue(today) ──► overdue (pending/partial, late)   │
//! │       │                                                                 │
//! │       └── receive_into_stock (once) ──► entrada movements,             │
//! │                                         product cost = unit price      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::clean;
use super::stock::entry_in;
use crate::error::{DbError, DbResult};
use pdv_core::stock::CostMode;
use pdv_core::validation::{validate_positive_cents, validate_purchase, validate_supplier};
use pdv_core::{
    CoreError, Money, PurchaseInput, PurchaseItem, PurchaseStatus, PurchaseWithItems, StockMovement, Supplier,
    SupplierInput, SupplierPurchase,
};

const SUPPLIER_COLUMNS: &str =
    "id, name, company_name, cnpj, email, phone, address, contact_person, notes, created_at";

const PURCHASE_COLUMNS: &str = "id, supplier_id, purchase_date, due_date, total_cents, paid_cents, \
     status, description, invoice_number, received, created_at";

const PURCHASE_ITEM_COLUMNS: &str =
    "id, purchase_id, product_id, product_name, quantity, unit_price_cents, total_cents";

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Suppliers
    // -------------------------------------------------------------------------

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY name COLLATE NOCASE");
        Ok(sqlx::query_as::<_, Supplier>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get(&self, id: &str) -> DbResult<Supplier> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?1");
        sqlx::query_as::<_, Supplier>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn insert(&self, input: SupplierInput) -> DbResult<Supplier> {
        validate_supplier(&input)?;

        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            company_name: clean(input.company_name),
            cnpj: clean(input.cnpj),
            email: clean(input.email),
            phone: clean(input.phone),
            address: clean(input.address),
            contact_person: clean(input.contact_person),
            notes: clean(input.notes),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, name, company_name, cnpj, email, phone, address,
                contact_person, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.company_name)
        .bind(&supplier.cnpj)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.contact_person)
        .bind(&supplier.notes)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    pub async fn update(&self, id: &str, input: SupplierInput) -> DbResult<Supplier> {
        validate_supplier(&input)?;

        let result = sqlx::query(
            r#"
            UPDATE suppliers SET
                name = ?2, company_name = ?3, cnpj = ?4, email = ?5, phone = ?6,
                address = ?7, contact_person = ?8, notes = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(clean(input.company_name))
        .bind(clean(input.cnpj))
        .bind(clean(input.email))
        .bind(clean(input.phone))
        .bind(clean(input.address))
        .bind(clean(input.contact_person))
        .bind(clean(input.notes))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }
        self.get(id).await
    }

    /// Deletes a supplier.
    ///
    /// ## Errors
    /// * `DbError::ForeignKeyViolation` - the supplier still has purchases
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }
        info!(id = %id, "Supplier deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Purchases
    // -------------------------------------------------------------------------

    /// Records a purchase; its total is the sum of the item totals.
    pub async fn create_purchase(&self, input: PurchaseInput) -> DbResult<PurchaseWithItems> {
        validate_purchase(&input)?;

        let purchase_id = Uuid::new_v4().to_string();
        let items: Vec<PurchaseItem> = input
            .items
            .into_iter()
            .map(|i| PurchaseItem {
                id: Uuid::new_v4().to_string(),
                purchase_id: purchase_id.clone(),
                product_id: clean(i.product_id),
                product_name: i.product_name.trim().to_string(),
                quantity: i.quantity,
                unit_price_cents: i.unit_price_cents,
                total_cents: Money::from_cents(i.unit_price_cents).multiply_quantity(i.quantity).cents(),
            })
            .collect();
        let total_cents: i64 = items.iter().map(|i| i.total_cents).sum();

        let purchase = SupplierPurchase {
            id: purchase_id,
            supplier_id: input.supplier_id,
            purchase_date: input.purchase_date,
            due_date: input.due_date,
            total_cents,
            paid_cents: 0,
            status: PurchaseStatus::from_amounts(total_cents, 0),
            description: clean(input.description),
            invoice_number: clean(input.invoice_number),
            received: false,
            created_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;
        insert_purchase(&mut tx, &purchase).await?;
        for item in &items {
            insert_purchase_item(&mut tx, item).await?;
        }
        tx.commit().await?;

        info!(
            id = %purchase.id,
            supplier_id = %purchase.supplier_id,
            total = purchase.total_cents,
            "Purchase recorded"
        );
        Ok(PurchaseWithItems { purchase, items })
    }

    /// Purchases newest first, optionally of one supplier.
    pub async fn list_purchases(&self, supplier_id: Option<&str>) -> DbResult<Vec<SupplierPurchase>> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM supplier_purchases
             WHERE ?1 IS NULL OR supplier_id = ?1
             ORDER BY purchase_date DESC, created_at DESC"
        );
        let purchases = sqlx::query_as::<_, SupplierPurchase>(&sql)
            .bind(supplier_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = purchases.len(), "Listed purchases");
        Ok(purchases)
    }

    /// Every purchase item (backup).
    pub async fn all_purchase_items(&self) -> DbResult<Vec<PurchaseItem>> {
        let sql = format!("SELECT {PURCHASE_ITEM_COLUMNS} FROM supplier_purchase_items ORDER BY rowid");
        Ok(sqlx::query_as::<_, PurchaseItem>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get_purchase(&self, id: &str) -> DbResult<PurchaseWithItems> {
        let mut conn = self.pool.acquire().await?;
        get_purchase_in(&mut conn, id).await
    }

    /// Adds a payment to a purchase.
    ///
    /// ## Errors
    /// * `CoreError::Overpayment` - more than what is left to pay
    pub async fn register_payment(&self, id: &str, amount_cents: i64) -> DbResult<SupplierPurchase> {
        validate_positive_cents("amount_cents", amount_cents)?;

        let mut tx = self.pool.begin().await?;
        let purchase = fetch_purchase(&mut tx, id).await?;
        let remaining = purchase.remaining().cents();
        if amount_cents > remaining {
            return Err(CoreError::Overpayment {
                remaining_cents: remaining,
                attempted_cents: amount_cents,
            }
            .into());
        }

        let paid = purchase.paid_cents + amount_cents;
        let status = PurchaseStatus::from_amounts(purchase.total_cents, paid);
        sqlx::query("UPDATE supplier_purchases SET paid_cents = ?2, status = ?3 WHERE id = ?1")
            .bind(id)
            .bind(paid)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        let updated = fetch_purchase(&mut tx, id).await?;
        tx.commit().await?;

        info!(id = %id, amount = amount_cents, status = ?status, "Purchase payment registered");
        Ok(updated)
    }

    /// Adds the purchase's catalog items to stock. Runs once per purchase.
    pub async fn receive_into_stock(&self, id: &str, date: NaiveDate) -> DbResult<Vec<StockMovement>> {
        let mut tx = self.pool.begin().await?;
        let PurchaseWithItems { purchase, items } = get_purchase_in(&mut tx, id).await?;

        let marked = sqlx::query("UPDATE supplier_purchases SET received = 1 WHERE id = ?1 AND received = 0")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if marked.rows_affected() == 0 {
            return Err(CoreError::AlreadyProcessed {
                entity: "purchase",
                id: id.to_string(),
            }
            .into());
        }

        let reason = match &purchase.invoice_number {
            Some(nf) => format!("Compra de fornecedor - NF {}", nf),
            None => "Compra de fornecedor".to_string(),
        };

        let mut movements = Vec::new();
        for item in &items {
            if let Some(product_id) = &item.product_id {
                let movement = entry_in(
                    &mut tx,
                    product_id,
                    item.quantity,
                    CostMode::Unit(item.unit_price_cents),
                    Some(&reason),
                    date,
                    None,
                )
                .await?;
                movements.push(movement);
            }
        }
        tx.commit().await?;

        info!(id = %id, movements = movements.len(), "Purchase received into stock");
        Ok(movements)
    }

    /// Flags unpaid purchases past their due date. Returns how many changed.
    pub async fn refresh_overdue(&self, today: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE supplier_purchases SET status = 'overdue'
             WHERE status IN ('pending', 'partial') AND due_date IS NOT NULL AND due_date < ?1",
        )
        .bind(today)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

// =============================================================================
// Transaction building blocks
// =============================================================================

async fn fetch_purchase(conn: &mut SqliteConnection, id: &str) -> DbResult<SupplierPurchase> {
    let sql = format!("SELECT {PURCHASE_COLUMNS} FROM supplier_purchases WHERE id = ?1");
    sqlx::query_as::<_, SupplierPurchase>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Purchase", id))
}

async fn get_purchase_in(conn: &mut SqliteConnection, id: &str) -> DbResult<PurchaseWithItems> {
    let purchase = fetch_purchase(conn, id).await?;
    let sql = format!("SELECT {PURCHASE_ITEM_COLUMNS} FROM supplier_purchase_items WHERE purchase_id = ?1 ORDER BY rowid");
    let items = sqlx::query_as::<_, PurchaseItem>(&sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(PurchaseWithItems { purchase, items })
}

pub(crate) async fn insert_purchase(conn: &mut SqliteConnection, p: &SupplierPurchase) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO supplier_purchases (
            id, supplier_id, purchase_date, due_date, total_cents, paid_cents,
            status, description, invoice_number, received, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&p.id)
    .bind(&p.supplier_id)
    .bind(p.purchase_date)
    .bind(p.due_date)
    .bind(p.total_cents)
    .bind(p.paid_cents)
    .bind(p.status)
    .bind(&p.description)
    .bind(&p.invoice_number)
    .bind(p.received)
    .bind(p.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(crate) async fn insert_purchase_item(conn: &mut SqliteConnection, item: &PurchaseItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO supplier_purchase_items (
            id, purchase_id, product_id, product_name, quantity, unit_price_cents, total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&item.id)
    .bind(&item.purchase_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.total_cents)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
