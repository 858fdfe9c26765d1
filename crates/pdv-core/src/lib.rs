//! # pdv-core: Pure Business Logic for the PDV
//!
//! Register math, stock rules, budgets, reports and the printable /
//! exportable renderings. No I/O happens here.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           PDV Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Browser UI (PDV, estoque, financeiro)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    pdv-server (axum handlers)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ pdv-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   types  money  cart  stock  budget  finance  production        │   │
//! │  │   reports  export (CSV)  print (HTML)  validation               │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    pdv-db (Database Layer)                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output
//! 2. **Integer Money**: all monetary values are centavos (i64)
//! 3. **Explicit Errors**: typed errors, never strings or panics
//! 4. **Validated Lifecycles**: sale, budget, expense and account statuses
//!    only move along their allowed transitions
//!
//! ## Example
//!
//! ```rust
//! use pdv_core::money::Money;
//!
//! let price = Money::from_cents(1050);
//! assert_eq!(price.to_string(), "R$ 10,50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod budget;
pub mod cart;
pub mod error;
pub mod export;
pub mod finance;
pub mod money;
pub mod print;
pub mod production;
pub mod reports;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single cart line.
///
/// Catches typos at the register (10000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest unit price or cost accepted anywhere (R$ 100.000.000,00).
///
/// With [`MAX_ITEM_QUANTITY`] and [`MAX_CART_ITEMS`] this keeps every sale
/// total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Stock level at or below which a product is flagged as low when it has
/// no minimum of its own.
pub const DEFAULT_MIN_STOCK: i64 = 10;

/// Days a budget stays valid when no date is given.
pub const DEFAULT_BUDGET_VALIDITY_DAYS: i64 = 15;

/// Customer name used when the sale is not tied to a registered customer.
pub const WALK_IN_CUSTOMER: &str = "Cliente Avulso";
