//! # HTTP Handlers
//!
//! All endpoints exposed to the browser UI, mounted under `/api`.
//!
//! ## Handler Organization
//! ```text
//! handlers/
//! ├── mod.rs         ◄─── You are here (exports)
//! ├── system.rs      ◄─── Health, settings, company info
//! ├── product.rs     ◄─── Catalog CRUD, search, barcode lookup
//! ├── stock.rs       ◄─── Entries, exits, movements, alerts
//! ├── customer.rs    ◄─── Customer CRUD
//! ├── supplier.rs    ◄─── Suppliers and their purchases
//! ├── cart.rs        ◄─── The register (PDV) and checkout
//! ├── sale.rs        ◄─── Sales history, cancel, pay, receipt
//! ├── budget.rs      ◄─── Orçamentos and conversion to sale
//! ├── finance.rs     ◄─── Expenses, accounts, cash flow, withdrawals
//! ├── production.rs  ◄─── Workshop production log
//! ├── report.rs      ◄─── Dashboard and reports
//! ├── export.rs      ◄─── CSV downloads
//! └── backup.rs      ◄─── JSON backup and restore
//! ```
//!
//! ## How Handlers Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fetch('/api/products/search?q=sanca')                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  async fn search_products(                                              │
//! │      State(db): State<DbState>,        ◄── FromRef<AppState>           │
//! │      Query(params): Query<SearchParams>,                               │
//! │  ) -> ApiResult<Json<Vec<Product>>>                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  200 [ {...}, ... ]   or   4xx/5xx { "code": ..., "message": ... }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers stay thin: rules live in `pdv-core`, transactions in `pdv-db`.

pub mod backup;
pub mod budget;
pub mod cart;
pub mod customer;
pub mod export;
pub mod finance;
pub mod product;
pub mod production;
pub mod report;
pub mod sale;
pub mod stock;
pub mod supplier;
pub mod system;
