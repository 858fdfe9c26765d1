//! # pdv-db: Database Layer for the PDV
//!
//! SQLite persistence with sqlx. Owns every SQL statement and every
//! transaction of the application; the rules it enforces come from
//! `pdv-core`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          PDV Data Flow                                  │
//! │                                                                         │
//! │  HTTP handler (POST /api/checkout)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     pdv-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo       │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ StockRepo      │    │              │  │   │
//! │  │   │               │    │ LocalStoreRepo │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   BackupService (backup.rs): export / all-or-nothing restore   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite database: relational tables + local_store documents    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdv_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pdv.db")).await?;
//! let sale = db.sales().checkout(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backup;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use backup::{parse_document, BackupData, BackupDocument, BackupService, BACKUP_VERSION};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::account::AccountRepository;
pub use repository::budget::BudgetRepository;
pub use repository::cash_flow::CashFlowRepository;
pub use repository::customer::CustomerRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::local_store::LocalStoreRepository;
pub use repository::product::ProductRepository;
pub use repository::production::ProductionRepository;
pub use repository::sale::{CheckoutOutcome, SaleRepository};
pub use repository::stock::StockRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::withdrawal::WithdrawalRepository;
