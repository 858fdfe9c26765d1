//! # Backup
//!
//! Whole-database export and restore as one JSON document.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BackupDocument { version: "1.0", timestamp, data }                    │
//! │                                                                         │
//! │  data.products ... data.cash_flow     one array per relational table   │
//! │  data.local_store                     key → JSON document              │
//! │                                                                         │
//! │  restore(doc)                                                          │
//! │    version != "1.0"  ──► UnsupportedBackupVersion, nothing written     │
//! │    BEGIN                                                                │
//! │      upsert parents before children (suppliers → purchases → items)    │
//! │      upsert local store documents                                      │
//! │    COMMIT           any failure ──► ROLLBACK, database untouched       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are upserted by `id`: records missing from the document are left in
//! place, records present overwrite their current version.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::local_store::{keys, load_doc_in, save_doc_in};
use pdv_core::{
    Account, CashFlowEntry, CoreError, Customer, Product, PurchaseItem, Sale, SaleItem, StockMovement, Supplier,
    SupplierPurchase,
};

/// Format version written by [`BackupService::export`] and accepted by
/// [`BackupService::restore`].
pub const BACKUP_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub data: BackupData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupData {
    pub products: Vec<Product>,
    pub customers: Vec<Customer>,
    pub suppliers: Vec<Supplier>,
    pub purchases: Vec<SupplierPurchase>,
    pub purchase_items: Vec<PurchaseItem>,
    pub sales: Vec<Sale>,
    pub sale_items: Vec<SaleItem>,
    pub stock_movements: Vec<StockMovement>,
    pub accounts: Vec<Account>,
    pub cash_flow: Vec<CashFlowEntry>,
    /// Local store documents (budgets, expenses, productions, withdrawals,
    /// company) as stored.
    pub local_store: BTreeMap<String, Value>,
}

impl BackupData {
    fn row_count(&self) -> usize {
        self.products.len()
            + self.customers.len()
            + self.suppliers.len()
            + self.purchases.len()
            + self.purchase_items.len()
            + self.sales.len()
            + self.sale_items.len()
            + self.stock_movements.len()
            + self.accounts.len()
            + self.cash_flow.len()
    }
}

#[derive(Debug, Clone)]
pub struct BackupService {
    pool: SqlitePool,
}

impl BackupService {
    pub fn new(pool: SqlitePool) -> Self {
        BackupService { pool }
    }

    /// Reads every table and local store document in one transaction so
    /// the snapshot is consistent.
    pub async fn export(&self) -> DbResult<BackupDocument> {
        let mut tx = self.pool.begin().await?;

        let mut local_store = BTreeMap::new();
        for key in keys::COLLECTIONS.iter().chain(std::iter::once(&keys::COMPANY)) {
            if let Some(doc) = load_doc_in::<Value>(&mut tx, key).await? {
                local_store.insert(key.to_string(), doc);
            }
        }

        let data = BackupData {
            products: fetch_table(&mut tx, "products").await?,
            customers: fetch_table(&mut tx, "customers").await?,
            suppliers: fetch_table(&mut tx, "suppliers").await?,
            purchases: fetch_table(&mut tx, "supplier_purchases").await?,
            purchase_items: fetch_table(&mut tx, "supplier_purchase_items").await?,
            sales: fetch_table(&mut tx, "sales").await?,
            sale_items: fetch_table(&mut tx, "sale_items").await?,
            stock_movements: fetch_table(&mut tx, "stock_movements").await?,
            accounts: fetch_table(&mut tx, "accounts").await?,
            cash_flow: fetch_table(&mut tx, "cash_flow").await?,
            local_store,
        };
        tx.commit().await?;

        info!(rows = data.row_count(), documents = data.local_store.len(), "Backup exported");
        Ok(BackupDocument {
            version: BACKUP_VERSION.to_string(),
            timestamp: Utc::now(),
            data,
        })
    }

    /// Restores a document. All or nothing.
    ///
    /// ## Errors
    /// * `CoreError::UnsupportedBackupVersion` - version other than "1.0"
    /// * any constraint violation in the data (the transaction is rolled
    ///   back)
    pub async fn restore(&self, document: &BackupDocument) -> DbResult<()> {
        if document.version != BACKUP_VERSION {
            warn!(version = %document.version, "Rejected backup");
            return Err(CoreError::UnsupportedBackupVersion(document.version.clone()).into());
        }
        let data = &document.data;

        let mut tx = self.pool.begin().await?;
        upsert_rows(&mut tx, "products", &data.products).await?;
        upsert_rows(&mut tx, "customers", &data.customers).await?;
        upsert_rows(&mut tx, "suppliers", &data.suppliers).await?;
        upsert_rows(&mut tx, "supplier_purchases", &data.purchases).await?;
        upsert_rows(&mut tx, "supplier_purchase_items", &data.purchase_items).await?;
        upsert_rows(&mut tx, "sales", &data.sales).await?;
        upsert_rows(&mut tx, "sale_items", &data.sale_items).await?;
        upsert_rows(&mut tx, "stock_movements", &data.stock_movements).await?;
        upsert_rows(&mut tx, "accounts", &data.accounts).await?;
        upsert_rows(&mut tx, "cash_flow", &data.cash_flow).await?;

        for (key, doc) in &data.local_store {
            save_doc_in(&mut tx, key, doc).await?;
        }
        tx.commit().await?;

        info!(
            rows = data.row_count(),
            documents = data.local_store.len(),
            taken_at = %document.timestamp,
            "Backup restored"
        );
        Ok(())
    }
}

async fn fetch_table<T>(conn: &mut SqliteConnection, table: &str) -> DbResult<Vec<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {table} ORDER BY rowid");
    let rows = sqlx::query_as::<_, T>(&sql).fetch_all(&mut *conn).await?;
    debug!(table = %table, count = rows.len(), "Exported table");
    Ok(rows)
}

/// Inserts or updates each row by `id`. Column names are the serialized
/// field names, which match the schema.
async fn upsert_rows<T: Serialize>(conn: &mut SqliteConnection, table: &str, rows: &[T]) -> DbResult<()> {
    for row in rows {
        let fields = match serde_json::to_value(row)? {
            Value::Object(fields) => fields,
            other => {
                return Err(DbError::Serialization(format!(
                    "{table} row is not an object: {other}"
                )))
            }
        };

        let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| **c != "id")
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({}) ON CONFLICT (id) DO UPDATE SET {}",
            columns.join(", "),
            placeholders.join(", "),
            updates.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for value in fields.values() {
            query = match value {
                Value::Null => query.bind(None::<String>),
                Value::Bool(b) => query.bind(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => query.bind(i),
                    None => query.bind(n.as_f64()),
                },
                Value::String(s) => query.bind(s.clone()),
                nested => query.bind(nested.to_string()),
            };
        }
        query.execute(&mut *conn).await?;
    }
    debug!(table = %table, count = rows.len(), "Restored table");
    Ok(())
}

/// Parses a backup document from JSON text.
pub fn parse_document(raw: &str) -> DbResult<BackupDocument> {
    Ok(serde_json::from_str(raw)?)
}
