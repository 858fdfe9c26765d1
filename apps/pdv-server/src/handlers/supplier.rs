//! # Supplier Handlers
//!
//! Suppliers, their purchases, payments against a purchase and receiving
//! a purchase into stock.
//!
//! ## Purchase Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /purchases ──► pending ── payment < total ──► partial            │
//! │                         │                               │               │
//! │                         └──── payments reach total ─────┴──► paid      │
//! │                                                                         │
//! │  past due_date and not paid ──► overdue   (refreshed on every list)    │
//! │                                                                         │
//! │  POST /purchases/:id/receive   catalog items ──► stock entries (once)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::state::DbState;
use crate::today;
use pdv_core::{PurchaseInput, PurchaseWithItems, StockMovement, Supplier, SupplierInput, SupplierPurchase};

/// `GET /api/suppliers`
pub async fn list_suppliers(State(db): State<DbState>) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(db.inner().suppliers().list().await?))
}

/// `GET /api/suppliers/:id`
pub async fn get_supplier(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<Supplier>> {
    Ok(Json(db.inner().suppliers().get(&id).await?))
}

/// `POST /api/suppliers`
pub async fn create_supplier(
    State(db): State<DbState>,
    Json(input): Json<SupplierInput>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let supplier = db.inner().suppliers().insert(input).await?;
    info!(supplier_id = %supplier.id, "Supplier created");
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// `PUT /api/suppliers/:id`
pub async fn update_supplier(
    State(db): State<DbState>,
    Path(id): Path<String>,
    Json(input): Json<SupplierInput>,
) -> ApiResult<Json<Supplier>> {
    Ok(Json(db.inner().suppliers().update(&id, input).await?))
}

/// `DELETE /api/suppliers/:id`
///
/// 409 while the supplier still has purchases.
pub async fn delete_supplier(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().suppliers().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PurchaseParams {
    pub supplier_id: Option<String>,
}

/// `GET /api/purchases?supplier_id=..`
pub async fn list_purchases(
    State(db): State<DbState>,
    Query(params): Query<PurchaseParams>,
) -> ApiResult<Json<Vec<SupplierPurchase>>> {
    let suppliers = db.inner().suppliers();
    let flagged = suppliers.refresh_overdue(today()).await?;
    if flagged > 0 {
        debug!(flagged, "Purchases flagged overdue");
    }
    Ok(Json(suppliers.list_purchases(params.supplier_id.as_deref()).await?))
}

/// `GET /api/purchases/:id`
pub async fn get_purchase(
    State(db): State<DbState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PurchaseWithItems>> {
    Ok(Json(db.inner().suppliers().get_purchase(&id).await?))
}

/// `POST /api/purchases`
pub async fn create_purchase(
    State(db): State<DbState>,
    Json(input): Json<PurchaseInput>,
) -> ApiResult<(StatusCode, Json<PurchaseWithItems>)> {
    let purchase = db.inner().suppliers().create_purchase(input).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount_cents: i64,
}

/// `POST /api/purchases/:id/payments`
pub async fn register_payment(
    State(db): State<DbState>,
    Path(id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<Json<SupplierPurchase>> {
    Ok(Json(
        db.inner()
            .suppliers()
            .register_payment(&id, request.amount_cents)
            .await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReceiveRequest {
    pub date: Option<NaiveDate>,
}

/// `POST /api/purchases/:id/receive`
pub async fn receive_purchase(
    State(db): State<DbState>,
    Path(id): Path<String>,
    request: Option<Json<ReceiveRequest>>,
) -> ApiResult<Json<Vec<StockMovement>>> {
    let date = request.and_then(|Json(r)| r.date).unwrap_or_else(today);
    Ok(Json(db.inner().suppliers().receive_into_stock(&id, date).await?))
}
