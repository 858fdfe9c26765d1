//! # Production Handlers
//!
//! The workshop's daily production log. Sending a batch to stock adds its
//! pieces to the catalog product with the same name.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::DbState;
use crate::today;
use pdv_core::production::{Production, ProductionInput, ProductionSummary};
use pdv_core::StockMovement;

/// `GET /api/productions`
pub async fn list_productions(State(db): State<DbState>) -> ApiResult<Json<Vec<Production>>> {
    Ok(Json(db.inner().productions().list().await?))
}

/// `POST /api/productions`
pub async fn create_production(
    State(db): State<DbState>,
    Json(input): Json<ProductionInput>,
) -> ApiResult<(StatusCode, Json<Production>)> {
    let production = db.inner().productions().create(input).await?;
    Ok((StatusCode::CREATED, Json(production)))
}

/// `DELETE /api/productions/:id`
pub async fn delete_production(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().productions().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub worker: Option<String>,
}

/// `GET /api/productions/summary?worker=José`
pub async fn production_summary(
    State(db): State<DbState>,
    Query(params): Query<SummaryParams>,
) -> ApiResult<Json<ProductionSummary>> {
    let worker = params.worker.as_deref().filter(|w| !w.trim().is_empty());
    Ok(Json(db.inner().productions().summary(worker).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub production: Production,
    pub movement: StockMovement,
}

/// `POST /api/productions/:id/send`
///
/// 404 when no active product carries the piece's name; nothing is written
/// in that case.
pub async fn send_to_stock(
    State(db): State<DbState>,
    Path(id): Path<String>,
    request: Option<Json<SendRequest>>,
) -> ApiResult<Json<SendResponse>> {
    let date = request.and_then(|Json(r)| r.date).unwrap_or_else(today);
    let (production, movement) = db.inner().productions().send_to_stock(&id, date).await?;
    Ok(Json(SendResponse { production, movement }))
}
