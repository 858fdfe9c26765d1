//! # Expense Repository
//!
//! Business expenses (despesas) in the local store under `"expenses"`,
//! newest first.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::local_store::{keys, load_in, save_in};
use crate::error::{DbError, DbResult};
use pdv_core::finance::{expense_summary, refresh_overdue_expenses, Expense, ExpenseInput, ExpenseSummary};

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        let mut conn = self.pool.acquire().await?;
        let expenses: Vec<Expense> = load_in(&mut conn, keys::EXPENSES).await?;
        debug!(count = expenses.len(), "Listed expenses");
        Ok(expenses)
    }

    pub async fn create(&self, input: ExpenseInput) -> DbResult<Expense> {
        let expense = Expense::create(input)?;

        let mut tx = self.pool.begin().await?;
        let mut expenses: Vec<Expense> = load_in(&mut tx, keys::EXPENSES).await?;
        expenses.insert(0, expense.clone());
        save_in(&mut tx, keys::EXPENSES, &expenses).await?;
        tx.commit().await?;

        info!(id = %expense.id, amount = expense.amount_cents, category = ?expense.category, "Expense created");
        Ok(expense)
    }

    pub async fn update(&self, id: &str, input: ExpenseInput) -> DbResult<Expense> {
        let mut tx = self.pool.begin().await?;
        let mut expenses: Vec<Expense> = load_in(&mut tx, keys::EXPENSES).await?;
        let expense = expenses
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| DbError::not_found("Expense", id))?;

        expense.apply_update(input)?;
        let updated = expense.clone();

        save_in(&mut tx, keys::EXPENSES, &expenses).await?;
        tx.commit().await?;

        info!(id = %id, status = ?updated.status, "Expense updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut expenses: Vec<Expense> = load_in(&mut tx, keys::EXPENSES).await?;
        let before = expenses.len();
        expenses.retain(|e| e.id != id);
        if expenses.len() == before {
            return Err(DbError::not_found("Expense", id));
        }
        save_in(&mut tx, keys::EXPENSES, &expenses).await?;
        tx.commit().await?;

        info!(id = %id, "Expense deleted");
        Ok(())
    }

    /// Marks pending expenses past their due date as `vencido`.
    pub async fn refresh_overdue(&self, today: NaiveDate) -> DbResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut expenses: Vec<Expense> = load_in(&mut tx, keys::EXPENSES).await?;
        let changed = refresh_overdue_expenses(&mut expenses, today);
        if changed > 0 {
            save_in(&mut tx, keys::EXPENSES, &expenses).await?;
            info!(count = changed, "Expenses marked overdue");
        }
        tx.commit().await?;
        Ok(changed)
    }

    pub async fn summary(&self) -> DbResult<ExpenseSummary> {
        Ok(expense_summary(&self.list().await?))
    }
}
