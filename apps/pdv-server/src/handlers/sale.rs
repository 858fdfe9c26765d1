//! # Sale Handlers
//!
//! Sales history, cancellation, settling boleto sales and the printable
//! receipt.

use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::handlers::system::load_company;
use crate::state::DbState;
use crate::today;
use pdv_core::print::sale_receipt_html;
use pdv_core::{Sale, SaleStatus, SaleWithItems};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<SaleStatus>,
}

/// `GET /api/sales?from=2024-01-01&to=2024-01-31&status=pendente`
pub async fn list_sales(
    State(db): State<DbState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Sale>>> {
    let mut sales = db.inner().sales().list(params.from, params.to).await?;
    if let Some(status) = params.status {
        sales.retain(|s| s.status == status);
    }
    Ok(Json(sales))
}

/// `GET /api/sales/:id`
pub async fn get_sale(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<SaleWithItems>> {
    Ok(Json(db.inner().sales().get_with_items(&id).await?))
}

/// `POST /api/sales/:id/cancel`
///
/// Restocks product lines and reverses the cash entry of a paid sale.
pub async fn cancel_sale(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<SaleWithItems>> {
    Ok(Json(db.inner().sales().cancel_sale(&id, today()).await?))
}

/// `POST /api/sales/:id/pay`
pub async fn mark_sale_paid(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<Sale>> {
    Ok(Json(db.inner().sales().mark_paid(&id, today()).await?))
}

/// `GET /api/sales/:id/receipt`
///
/// Self-contained HTML page; the browser prints it.
pub async fn sale_receipt(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Html<String>> {
    let sale = db.inner().sales().get_with_items(&id).await?;
    let company = load_company(db.inner()).await?;
    Ok(Html(sale_receipt_html(&sale, &company)))
}
