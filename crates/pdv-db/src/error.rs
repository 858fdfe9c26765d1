//! # Database Error Types
//!
//! What can go wrong below the repositories, and how SQLite's messages
//! become typed variants.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Business rule (CoreError)           │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (pdv-server) ← JSON { code, message } + HTTP status          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rule violations detected inside a transaction (insufficient stock,
//! invalid status change) travel as [`DbError::Core`] so the caller still
//! sees the underlying [`CoreError`].

use pdv_core::{CoreError, ValidationError};
use thiserror::Error;

/// Failures of the storage layer.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the row: a reused barcode, or two
    /// checkouts racing for the same `sale_number`.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row is still referenced, e.g. a supplier with purchases.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Every connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A local-store document or backup could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A business rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True for failures worth retrying (pool or connection trouble).
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::PoolExhausted | DbError::ConnectionFailed(_))
    }
}

/// Maps SQLite constraint messages onto typed variants.
///
/// | SQLite message                           | Variant                     |
/// |------------------------------------------|-----------------------------|
/// | `UNIQUE constraint failed: products.barcode` | `UniqueViolation { field: "barcode" }` |
/// | `FOREIGN KEY constraint failed`          | `ForeignKeyViolation`       |
/// | `CHECK constraint failed: stock >= 0`    | `Core(Validation)`          |
fn from_constraint_message(msg: &str) -> DbError {
    if let Some(columns) = msg.strip_prefix("UNIQUE constraint failed: ") {
        // "table.column[, table.column]"; keep the column names only
        let field = columns
            .split(", ")
            .map(|c| c.rsplit('.').next().unwrap_or(c))
            .collect::<Vec<_>>()
            .join(", ");
        return DbError::UniqueViolation {
            field,
            value: "unknown".to_string(),
        };
    }
    if msg.contains("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: msg.to_string(),
        };
    }
    if let Some(rule) = msg.strip_prefix("CHECK constraint failed: ") {
        return DbError::Core(CoreError::Validation(ValidationError::InvalidFormat {
            field: rule.split_whitespace().next().unwrap_or("value").to_string(),
            reason: format!("violates {}", rule),
        }));
    }
    DbError::QueryFailed(msg.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => from_constraint_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
