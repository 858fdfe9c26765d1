//! # Cash Flow Repository
//!
//! Income and expense entries. Most entries are written by other
//! transactions (paid sales, cancellations, settled accounts); manual
//! entries come through [`CashFlowRepository::create`].

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::clean;
use crate::error::{DbError, DbResult};
use pdv_core::validation::validate_cash_flow;
use pdv_core::{CashFlowEntry, CashFlowInput, CashFlowKind};

const CASH_FLOW_COLUMNS: &str = "id, description, kind, amount_cents, category, date, reference_id, created_at";

/// Category used for entries generated by sales.
pub const SALES_CATEGORY: &str = "Vendas";

#[derive(Debug, Clone)]
pub struct CashFlowRepository {
    pool: SqlitePool,
}

impl CashFlowRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashFlowRepository { pool }
    }

    /// Records a manual entry.
    pub async fn create(&self, input: CashFlowInput) -> DbResult<CashFlowEntry> {
        validate_cash_flow(&input)?;
        let entry = new_entry(
            input.description.trim(),
            input.kind,
            input.amount_cents,
            clean(Some(input.category)).unwrap_or_default(),
            input.date,
            None,
        );

        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut conn, &entry).await?;

        info!(id = %entry.id, kind = ?entry.kind, amount = entry.amount_cents, "Cash flow entry created");
        Ok(entry)
    }

    /// Entries between `from` and `to` (inclusive, either bound optional),
    /// newest first.
    pub async fn list(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> DbResult<Vec<CashFlowEntry>> {
        let sql = format!(
            "SELECT {CASH_FLOW_COLUMNS} FROM cash_flow
             WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2)
             ORDER BY date DESC, created_at DESC"
        );
        let entries = sqlx::query_as::<_, CashFlowEntry>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = entries.len(), "Listed cash flow");
        Ok(entries)
    }

    /// Deletes a manual entry. Generated entries (with a reference) are
    /// owned by their sale or account and cannot be removed here.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM cash_flow WHERE id = ?1 AND reference_id IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Manual cash flow entry", id));
        }
        info!(id = %id, "Cash flow entry deleted");
        Ok(())
    }
}

// =============================================================================
// Transaction building blocks
// =============================================================================

pub(crate) fn new_entry(
    description: &str,
    kind: CashFlowKind,
    amount_cents: i64,
    category: impl Into<String>,
    date: NaiveDate,
    reference_id: Option<&str>,
) -> CashFlowEntry {
    CashFlowEntry {
        id: Uuid::new_v4().to_string(),
        description: description.to_string(),
        kind,
        amount_cents,
        category: category.into(),
        date,
        reference_id: reference_id.map(str::to_string),
        created_at: Utc::now(),
    }
}

pub(crate) async fn insert_entry(conn: &mut SqliteConnection, entry: &CashFlowEntry) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cash_flow (id, description, kind, amount_cents, category, date, reference_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.description)
    .bind(entry.kind)
    .bind(entry.amount_cents)
    .bind(&entry.category)
    .bind(entry.date)
    .bind(&entry.reference_id)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Writes an entry unless the amount is zero (a fully discounted sale).
pub(crate) async fn record(
    conn: &mut SqliteConnection,
    description: &str,
    kind: CashFlowKind,
    amount_cents: i64,
    category: &str,
    date: NaiveDate,
    reference_id: Option<&str>,
) -> DbResult<Option<CashFlowEntry>> {
    if amount_cents <= 0 {
        return Ok(None);
    }
    let entry = new_entry(description, kind, amount_cents, category, date, reference_id);
    insert_entry(conn, &entry).await?;
    Ok(Some(entry))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use pdv_core::CoreError;

    fn input(description: &str, kind: CashFlowKind, cents: i64, date: NaiveDate) -> CashFlowInput {
        CashFlowInput {
            description: description.to_string(),
            kind,
            amount_cents: cents,
            category: "Outros".to_string(),
            date,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_by_period() {
        let db = test_db().await;
        let repo = db.cash_flow();
        let jan = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();

        repo.create(input("Aluguel", CashFlowKind::Expense, 150_000, jan)).await.unwrap();
        repo.create(input("Serviço", CashFlowKind::Income, 40_000, feb)).await.unwrap();

        assert_eq!(repo.list(None, None).await.unwrap().len(), 2);
        let february = repo
            .list(NaiveDate::from_ymd_opt(2024, 2, 1), NaiveDate::from_ymd_opt(2024, 2, 29))
            .await
            .unwrap();
        assert_eq!(february.len(), 1);
        assert_eq!(february[0].description, "Serviço");
    }

    #[tokio::test]
    async fn test_create_validates_amount() {
        let db = test_db().await;
        let err = db
            .cash_flow()
            .create(input("Nada", CashFlowKind::Income, 0, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_generated_entries_cannot_be_deleted() {
        let db = test_db().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut conn = db.pool().acquire().await.unwrap();
        let generated = record(&mut conn, "Venda #1", CashFlowKind::Income, 500, SALES_CATEGORY, date, Some("sale-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(record(&mut conn, "Venda #2", CashFlowKind::Income, 0, SALES_CATEGORY, date, None)
            .await
            .unwrap()
            .is_none());
        drop(conn);

        assert!(db.cash_flow().delete(&generated.id).await.is_err());
        let manual = db
            .cash_flow()
            .create(input("Troco inicial", CashFlowKind::Income, 10_000, date))
            .await
            .unwrap();
        db.cash_flow().delete(&manual.id).await.unwrap();
        assert_eq!(db.cash_flow().list(None, None).await.unwrap().len(), 1);
    }
}
