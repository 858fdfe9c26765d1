//! # State Module
//!
//! Shared state handed to the axum handlers.
//!
//! Each concern gets its own type and handlers extract only what they use
//! (`State<DbState>`, `State<CartState>`); [`AppState`](crate::AppState)
//! bundles them for the router and implements `FromRef` for each part.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Router::with_state(AppState)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │          ┌──────────────────┼──────────────────┐                       │
//! │          ▼                  ▼                  ▼                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐              │
//! │  │   DbState    │  │  CartState   │  │   ConfigState    │              │
//! │  │              │  │              │  │                  │              │
//! │  │  Database    │  │  Arc<Mutex<  │  │  store_name      │              │
//! │  │  (SQLite     │  │    Cart      │  │  currency        │              │
//! │  │   pool)      │  │  >>          │  │  budget days     │              │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘              │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: the pool is shared, queries run concurrently               │
//! │  • CartState: one register, one cart, guarded by a Mutex               │
//! │  • ConfigState: read-only after startup                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod config;
mod db;

pub use cart::CartState;
pub use config::ConfigState;
pub use db::DbState;
