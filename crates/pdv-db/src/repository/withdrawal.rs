//! # Withdrawal Repository
//!
//! Cash taken out of the register (sangria / retirada), stored in the local
//! store under `"withdrawals"`, newest first.

use sqlx::SqlitePool;
use tracing::{debug, info};

use super::local_store::{keys, load_in, save_in};
use crate::error::{DbError, DbResult};
use pdv_core::finance::{withdrawals_total, Withdrawal, WithdrawalInput};
use pdv_core::Money;

#[derive(Debug, Clone)]
pub struct WithdrawalRepository {
    pool: SqlitePool,
}

impl WithdrawalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WithdrawalRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Withdrawal>> {
        let mut conn = self.pool.acquire().await?;
        let withdrawals: Vec<Withdrawal> = load_in(&mut conn, keys::WITHDRAWALS).await?;
        debug!(count = withdrawals.len(), "Listed withdrawals");
        Ok(withdrawals)
    }

    pub async fn create(&self, input: WithdrawalInput) -> DbResult<Withdrawal> {
        let withdrawal = Withdrawal::create(input)?;

        let mut tx = self.pool.begin().await?;
        let mut withdrawals: Vec<Withdrawal> = load_in(&mut tx, keys::WITHDRAWALS).await?;
        withdrawals.insert(0, withdrawal.clone());
        save_in(&mut tx, keys::WITHDRAWALS, &withdrawals).await?;
        tx.commit().await?;

        info!(id = %withdrawal.id, amount = withdrawal.amount_cents, "Withdrawal recorded");
        Ok(withdrawal)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let mut withdrawals: Vec<Withdrawal> = load_in(&mut tx, keys::WITHDRAWALS).await?;
        let before = withdrawals.len();
        withdrawals.retain(|w| w.id != id);
        if withdrawals.len() == before {
            return Err(DbError::not_found("Withdrawal", id));
        }
        save_in(&mut tx, keys::WITHDRAWALS, &withdrawals).await?;
        tx.commit().await?;

        info!(id = %id, "Withdrawal deleted");
        Ok(())
    }

    pub async fn total(&self) -> DbResult<Money> {
        Ok(withdrawals_total(&self.list().await?))
    }
}
