//! # Database Handle
//!
//! One SQLite file holds both stores of the shop: the relational tables and
//! the `local_store` key/JSON table. [`Database`] owns the pool and hands out
//! repositories.
//!
//! ## Who Uses a Connection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    SqlitePool (WAL, foreign_keys=ON)                    │
//! │                                                                         │
//! │   GET  /api/products          ──► short read, connection returned       │
//! │   GET  /api/reports/dashboard ──► several reads, one at a time          │
//! │   POST /api/cart/checkout     ──► BEGIN … COMMIT on one connection      │
//! │   POST /api/backup/restore    ──► BEGIN … COMMIT on one connection      │
//! │                                                                         │
//! │   Readers run next to the writer. A second writer waits up to           │
//! │   busy_timeout for the lock instead of failing with SQLITE_BUSY.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tests use [`DbConfig::in_memory`]: a private database on a single
//! connection that lives as long as the pool.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::backup::BackupService;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::account::AccountRepository;
use crate::repository::budget::BudgetRepository;
use crate::repository::cash_flow::CashFlowRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::expense::ExpenseRepository;
use crate::repository::local_store::LocalStoreRepository;
use crate::repository::product::ProductRepository;
use crate::repository::production::ProductionRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::stock::StockRepository;
use crate::repository::supplier::SupplierRepository;
use crate::repository::withdrawal::WithdrawalRepository;

const IN_MEMORY: &str = ":memory:";

/// Pool settings for the shop database.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/pdv/pdv.db").max_connections(8);
/// let db = Database::new(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Upper bound on open connections. A single register rarely needs
    /// more than the default of 5.
    pub max_connections: u32,
    pub min_connections: u32,

    /// How long a request waits for a free connection before
    /// [`DbError::PoolExhausted`].
    pub connect_timeout: Duration,

    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,

    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,

    /// Apply embedded migrations on connect.
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed database; the file is created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory database on one connection that is never reaped.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            max_lifetime: None,
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        // min above max makes the pool refuse to build
        self.min_connections = self.min_connections.min(max);
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    /// SQLite options: WAL and file creation for files, foreign keys and
    /// the busy timeout everywhere.
    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", self.database_path.display()))
                .map(|o| o.journal_mode(SqliteJournalMode::Wal).create_if_missing(true))
        }
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        Ok(options
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

/// Shared database handle. Cloning copies a pool reference; repositories
/// are built per call.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening shop database");

        let options = config.connect_options()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        debug!(
            max = config.max_connections,
            min = config.min_connections,
            in_memory = config.is_in_memory(),
            "Pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            migrations::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn suppliers(&self) -> SupplierRepository {
        SupplierRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn stock(&self) -> StockRepository {
        StockRepository::new(self.pool.clone())
    }

    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new(self.pool.clone())
    }

    pub fn cash_flow(&self) -> CashFlowRepository {
        CashFlowRepository::new(self.pool.clone())
    }

    pub fn local_store(&self) -> LocalStoreRepository {
        LocalStoreRepository::new(self.pool.clone())
    }

    pub fn budgets(&self) -> BudgetRepository {
        BudgetRepository::new(self.pool.clone())
    }

    pub fn productions(&self) -> ProductionRepository {
        ProductionRepository::new(self.pool.clone())
    }

    pub fn expenses(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.pool.clone())
    }

    pub fn withdrawals(&self) -> WithdrawalRepository {
        WithdrawalRepository::new(self.pool.clone())
    }

    pub fn backup(&self) -> BackupService {
        BackupService::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        info!("Closing shop database");
        self.pool.close().await;
    }

    /// True when a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
