//! # Error Types
//!
//! Domain-specific error types for pdv-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pdv-core errors (this file)                                           │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pdv-db errors                                                         │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  pdv-server errors                                                     │
//! │  └── ApiError         - What the browser sees ({ code, message })      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Browser      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is a permanent failure: retrying the same request gives
/// the same answer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete the operation.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Vaso Grego", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Cart line not found.
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    /// Checkout attempted with nothing in the cart.
    #[error("Cart is empty")]
    CartEmpty,

    /// Cart has reached maximum items.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum of {max}")]
    QuantityTooLarge { max: i64, requested: i64 },

    /// Cash tendered does not cover the total.
    #[error("Insufficient payment: total {total_cents} cents, paid {paid_cents} cents")]
    InsufficientPayment { total_cents: i64, paid_cents: i64 },

    /// Payment larger than what is still owed.
    #[error("Payment of {attempted_cents} cents exceeds remaining {remaining_cents} cents")]
    Overpayment {
        remaining_cents: i64,
        attempted_cents: i64,
    },

    /// A status change that the entity's lifecycle does not allow.
    ///
    /// ## Example
    /// A cancelled sale cannot be marked as paid again, and a sold budget
    /// cannot go back to `orcamento`.
    #[error("Invalid {entity} status transition: {from} -> {to}")]
    InvalidStatusTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Budget validity date has passed.
    #[error("Budget {number} expired on {valid_until}")]
    BudgetExpired { number: String, valid_until: String },

    /// One-shot operation already performed (production sent to stock,
    /// purchase received).
    #[error("{entity} {id} was already processed")]
    AlreadyProcessed { entity: &'static str, id: String },

    /// Backup document in a format this build cannot read.
    #[error("Unsupported backup version: {0}")]
    UnsupportedBackupVersion(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Builds an [`CoreError::InvalidStatusTransition`] from any two
    /// displayable statuses.
    pub fn transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        CoreError::InvalidStatusTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Returned by the functions in [`crate::validation`] before any state
/// changes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is required but missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// String is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// String is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Number is out of allowed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email, bad CNPJ).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Tests
// =============================================================================
