//! # Account Repository
//!
//! Accounts receivable and payable (contas a receber / a pagar).
//!
//! ```text
//!   pending ──► paid        (cash flow: income for receivables,
//!      │  ▲                              expense for payables)
//!      ▼  │
//!   overdue ──► paid
//!      │
//!      └──► cancelled ◄── pending
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::cash_flow::record;
use super::clean;
use crate::error::{DbError, DbResult};
use pdv_core::finance::{overdue_account_ids, settlement_kind};
use pdv_core::validation::validate_account;
use pdv_core::{Account, AccountInput, AccountStatus, CoreError};

const ACCOUNT_COLUMNS: &str = "id, title, description, kind, amount_cents, due_date, paid_date, status, \
     category, customer_id, supplier_id, created_at";

#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    pub async fn create(&self, input: AccountInput) -> DbResult<Account> {
        validate_account(&input)?;

        let account = Account {
            id: Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            description: clean(input.description),
            kind: input.kind,
            amount_cents: input.amount_cents,
            due_date: input.due_date,
            paid_date: None,
            status: AccountStatus::Pending,
            category: input.category.trim().to_string(),
            customer_id: clean(input.customer_id),
            supplier_id: clean(input.supplier_id),
            created_at: Utc::now(),
        };

        let mut conn = self.pool.acquire().await?;
        insert_account(&mut conn, &account).await?;

        info!(id = %account.id, kind = ?account.kind, amount = account.amount_cents, "Account created");
        Ok(account)
    }

    /// Accounts ordered by due date.
    pub async fn list(&self) -> DbResult<Vec<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY due_date, created_at");
        let accounts = sqlx::query_as::<_, Account>(&sql).fetch_all(&self.pool).await?;
        debug!(count = accounts.len(), "Listed accounts");
        Ok(accounts)
    }

    pub async fn get(&self, id: &str) -> DbResult<Account> {
        let mut conn = self.pool.acquire().await?;
        fetch_account(&mut conn, id).await
    }

    /// Settles an account on `paid_date` and records the cash movement.
    pub async fn mark_paid(&self, id: &str, paid_date: NaiveDate) -> DbResult<Account> {
        let mut tx = self.pool.begin().await?;
        let account = fetch_account(&mut tx, id).await?;
        let kind = settlement_kind(&account)?;

        sqlx::query("UPDATE accounts SET status = 'paid', paid_date = ?2 WHERE id = ?1")
            .bind(id)
            .bind(paid_date)
            .execute(&mut *tx)
            .await?;

        let category = if account.category.is_empty() {
            "Contas"
        } else {
            account.category.as_str()
        };
        record(
            &mut tx,
            &account.title,
            kind,
            account.amount_cents,
            category,
            paid_date,
            Some(id),
        )
        .await?;

        let paid = fetch_account(&mut tx, id).await?;
        tx.commit().await?;

        info!(id = %id, kind = ?kind, amount = account.amount_cents, "Account paid");
        Ok(paid)
    }

    pub async fn cancel(&self, id: &str) -> DbResult<Account> {
        let mut tx = self.pool.begin().await?;
        let account = fetch_account(&mut tx, id).await?;
        if !account.status.can_transition_to(AccountStatus::Cancelled) {
            return Err(CoreError::transition("account", account.status, AccountStatus::Cancelled).into());
        }

        sqlx::query("UPDATE accounts SET status = 'cancelled' WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let cancelled = fetch_account(&mut tx, id).await?;
        tx.commit().await?;

        info!(id = %id, "Account cancelled");
        Ok(cancelled)
    }

    /// Moves pending accounts past their due date to `overdue`.
    pub async fn refresh_overdue(&self, today: NaiveDate) -> DbResult<usize> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE status = 'pending'");
        let pending = sqlx::query_as::<_, Account>(&sql).fetch_all(&mut *tx).await?;

        let ids = overdue_account_ids(&pending, today);
        for id in &ids {
            sqlx::query("UPDATE accounts SET status = 'overdue' WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        if !ids.is_empty() {
            info!(count = ids.len(), "Accounts marked overdue");
        }
        Ok(ids.len())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Account", id));
        }
        Ok(())
    }
}

async fn fetch_account(conn: &mut SqliteConnection, id: &str) -> DbResult<Account> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
    sqlx::query_as::<_, Account>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Account", id))
}

pub(crate) async fn insert_account(conn: &mut SqliteConnection, a: &Account) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO accounts (
            id, title, description, kind, amount_cents, due_date, paid_date,
            status, category, customer_id, supplier_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&a.id)
    .bind(&a.title)
    .bind(&a.description)
    .bind(a.kind)
    .bind(a.amount_cents)
    .bind(a.due_date)
    .bind(a.paid_date)
    .bind(a.status)
    .bind(&a.category)
    .bind(&a.customer_id)
    .bind(&a.supplier_id)
    .bind(a.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
