//! # Product Handlers
//!
//! Catalog CRUD and the register's product lookup.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product Search Flow                                  │
//! │                                                                         │
//! │  Scanner types "7891234567890" / user types "sanca"                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────┐                         │
//! │  │  Is query a barcode? (8-14 digits)        │                         │
//! │  │  YES: exact barcode lookup first          │──► Found? Return [1]    │
//! │  │  NO:  LIKE over name, category, barcode   │                         │
//! │  └───────────────────────────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::{ConfigState, DbState};
use pdv_core::{Product, ProductInput};

const DEFAULT_SEARCH_LIMIT: u32 = 50;
const MAX_SEARCH_LIMIT: u32 = 500;

/// EAN-8, UPC-A, EAN-13 and GTIN-14 are all digit strings of this length.
fn is_barcode_query(query: &str) -> bool {
    let len = query.len();
    (8..=14).contains(&len) && query.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

/// `GET /api/products?include_inactive=true`
pub async fn list_products(
    State(db): State<DbState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(db.inner().products().list(params.include_inactive).await?))
}

/// `GET /api/products/search?q=sanca&limit=20`
pub async fn search_products(
    State(db): State<DbState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Product>>> {
    let start = Instant::now();
    let query = params.q.trim();
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

    if is_barcode_query(query) {
        if let Some(product) = db.inner().products().get_by_barcode(query).await? {
            debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Barcode hit");
            return Ok(Json(vec![product]));
        }
    }

    let products = db.inner().products().search(query, limit).await?;
    debug!(
        query = %query,
        count = products.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search_products"
    );
    Ok(Json(products))
}

/// `GET /api/products/barcode/:barcode`
pub async fn get_product_by_barcode(
    State(db): State<DbState>,
    Path(barcode): Path<String>,
) -> ApiResult<Json<Product>> {
    db.inner()
        .products()
        .get_by_barcode(&barcode)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", &barcode))
}

/// `GET /api/products/:id`
pub async fn get_product(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<Product>> {
    Ok(Json(db.inner().products().get(&id).await?))
}

/// `POST /api/products`
///
/// Products without a minimum stock get the configured default.
pub async fn create_product(
    State(db): State<DbState>,
    State(config): State<ConfigState>,
    Json(mut input): Json<ProductInput>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    input.min_stock.get_or_insert(config.default_min_stock);
    let product = db.inner().products().insert(input).await?;
    info!(product_id = %product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/products/:id`
///
/// Stock is not editable here; it only moves through stock entries and
/// exits, sales and cancellations.
pub async fn update_product(
    State(db): State<DbState>,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> ApiResult<Json<Product>> {
    Ok(Json(db.inner().products().update(&id, input).await?))
}

/// `DELETE /api/products/:id`
///
/// Soft delete: the product disappears from the register but stays on
/// past sales and movements.
pub async fn delete_product(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().products().soft_delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_barcode_query() {
        assert!(is_barcode_query("12345678"));
        assert!(is_barcode_query("7891234567890"));
        assert!(!is_barcode_query("1234567"));
        assert!(!is_barcode_query("sanca"));
        assert!(!is_barcode_query("789123456789a"));
    }
}
