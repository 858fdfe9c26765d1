//! # Product Repository
//!
//! Catalog CRUD and search.
//!
//! Stock is never written here except on insert: every later change goes
//! through [`StockRepository`](super::stock::StockRepository) or the
//! checkout so that it leaves a movement behind.
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types: "sanca"                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LIKE '%sanca%' over name, category, barcode (active products only)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Sanca Aberta 10cm | Sanca Fechada | ...  ordered by name              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::clean;
use crate::error::{DbError, DbResult};
use pdv_core::validation::{validate_product, validate_search_query};
use pdv_core::{Product, ProductInput};

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, category, description, barcode, \
     price_cents, cost_cents, stock, min_stock, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// All products ordered by name; inactive ones only when asked.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        let products = list_products(&mut conn, include_inactive).await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Searches active products by name, category or barcode.
    ///
    /// An empty query lists active products.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        let pattern = format!("%{}%", query.replace('%', "").replace('_', ""));
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active = 1
               AND (name LIKE ?1 OR category LIKE ?1 OR COALESCE(barcode, '') LIKE ?1)
             ORDER BY name COLLATE NOCASE
             LIMIT ?2"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_product(&mut conn, id).await
    }

    /// Gets a product by its ID, failing with `NotFound`.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Gets an active product by barcode (scanner input).
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1 AND is_active = 1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - barcode already used
    pub async fn insert(&self, input: ProductInput) -> DbResult<Product> {
        validate_product(&input)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            category: input.category.trim().to_string(),
            description: clean(input.description),
            barcode: clean(input.barcode),
            price_cents: input.price_cents,
            cost_cents: input.cost_cents,
            stock: input.stock,
            min_stock: input.min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %product.name, "Inserting product");
        let mut conn = self.pool.acquire().await?;
        insert_product(&mut conn, &product).await?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Updates the editable fields of a product. `input.stock` is ignored.
    pub async fn update(&self, id: &str, input: ProductInput) -> DbResult<Product> {
        validate_product(&input)?;

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                description = ?4,
                barcode = ?5,
                price_cents = ?6,
                cost_cents = ?7,
                min_stock = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.category.trim())
        .bind(clean(input.description))
        .bind(clean(input.barcode))
        .bind(input.price_cents)
        .bind(input.cost_cents)
        .bind(input.min_stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get(id).await
    }

    /// Hides a product from the catalog.
    ///
    /// Past sales and movements keep their snapshots, so rows are never
    /// physically deleted.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction building blocks
// =============================================================================

pub(crate) async fn list_products(conn: &mut SqliteConnection, include_inactive: bool) -> DbResult<Vec<Product>> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 OR ?1 ORDER BY name COLLATE NOCASE"
    );
    let products = sqlx::query_as::<_, Product>(&sql)
        .bind(include_inactive)
        .fetch_all(&mut *conn)
        .await?;
    Ok(products)
}

pub(crate) async fn find_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    find_product(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
}

pub(crate) async fn insert_product(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, category, description, barcode,
            price_cents, cost_cents, stock, min_stock,
            is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.category)
    .bind(&product.description)
    .bind(&product.barcode)
    .bind(product.price_cents)
    .bind(product.cost_cents)
    .bind(product.stock)
    .bind(product.min_stock)
    .bind(product.is_active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Sets stock (and optionally unit cost) to values planned by pdv-core.
pub(crate) async fn set_stock(
    conn: &mut SqliteConnection,
    id: &str,
    new_stock: i64,
    unit_cost_cents: Option<i64>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET stock = ?2, cost_cents = COALESCE(?3, cost_cents), updated_at = ?4 WHERE id = ?1",
    )
    .bind(id)
    .bind(new_stock)
    .bind(unit_cost_cents)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }
    Ok(())
}

/// Decrements stock only if enough is left. Returns `false` when the guard
/// rejected the update.
pub(crate) async fn decrement_stock_guarded(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - ?2, updated_at = ?3 WHERE id = ?1 AND stock >= ?2",
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub(crate) async fn increment_stock(conn: &mut SqliteConnection, id: &str, quantity: i64) -> DbResult<()> {
    let result = sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
        .bind(id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{product, test_db};
    use pdv_core::CoreError;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let p = product(&db, "Placa de Gesso 60x60", 1250, 700, 40).await;

        let loaded = db.products().get(&p.id).await.unwrap();
        assert_eq!(loaded.name, "Placa de Gesso 60x60");
        assert_eq!(loaded.stock, 40);
        assert!(loaded.is_active);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid() {
        let db = test_db().await;
        let err = db
            .products()
            .insert(ProductInput {
                name: "  ".to_string(),
                price_cents: 100,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_barcode() {
        let db = test_db().await;
        let input = ProductInput {
            name: "Sanca".to_string(),
            barcode: Some("789100".to_string()),
            price_cents: 100,
            ..Default::default()
        };
        db.products().insert(input.clone()).await.unwrap();
        let err = db.products().insert(input).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_search_and_barcode() {
        let db = test_db().await;
        product(&db, "Sanca Aberta", 3000, 1000, 5).await;
        product(&db, "Roseta", 2000, 500, 5).await;
        db.products()
            .insert(ProductInput {
                name: "Cola Gesso".to_string(),
                barcode: Some("7891234".to_string()),
                price_cents: 900,
                ..Default::default()
            })
            .await
            .unwrap();

        let found = db.products().search("sanca", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Sanca Aberta");

        assert_eq!(db.products().search("", 10).await.unwrap().len(), 3);

        let scanned = db.products().get_by_barcode("7891234").await.unwrap().unwrap();
        assert_eq!(scanned.name, "Cola Gesso");
    }

    #[tokio::test]
    async fn test_update_keeps_stock() {
        let db = test_db().await;
        let p = product(&db, "Roseta", 2000, 500, 8).await;

        let updated = db
            .products()
            .update(
                &p.id,
                ProductInput {
                    name: "Roseta Grande".to_string(),
                    price_cents: 2500,
                    cost_cents: 600,
                    stock: 999,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Roseta Grande");
        assert_eq!(updated.price_cents, 2500);
        assert_eq!(updated.stock, 8);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_list() {
        let db = test_db().await;
        let p = product(&db, "Roseta", 2000, 500, 8).await;
        db.products().soft_delete(&p.id).await.unwrap();

        assert!(db.products().list(false).await.unwrap().is_empty());
        assert_eq!(db.products().list(true).await.unwrap().len(), 1);
        assert_eq!(db.products().count().await.unwrap(), 0);
        assert!(matches!(
            db.products().soft_delete("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
