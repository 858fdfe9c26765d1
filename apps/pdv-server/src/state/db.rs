//! # Database State
//!
//! Wraps the `Database` pool for use in handlers.
//!
//! ## Usage in Handlers
//! ```rust,ignore
//! async fn search_products(
//!     State(db): State<DbState>,
//!     Query(params): Query<SearchParams>,
//! ) -> ApiResult<Json<Vec<Product>>> {
//!     Ok(Json(db.inner().products().search(&params.q, 20).await?))
//! }
//! ```

use pdv_db::Database;

/// Cloneable handle to the database; clones share the pool.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    pub fn inner(&self) -> &Database {
        &self.db
    }
}
