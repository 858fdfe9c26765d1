//! # Stock Handlers
//!
//! Manual entries and exits, movement history and stock alerts.
//!
//! Every entry or exit writes the product's new stock and its movement
//! row in one transaction; see `pdv_db::StockRepository`.

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::DbState;
use crate::today;
use pdv_core::stock::{self, movement_totals, CostMode, MovementTotals, StockAlert, StockSummary};
use pdv_core::{Product, StockMovement};

const DEFAULT_MOVEMENT_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub product_id: String,
    pub quantity: i64,
    /// Defaults to keeping the current unit cost.
    #[serde(default = "keep_cost")]
    pub cost: CostMode,
    pub reason: Option<String>,
    pub date: Option<NaiveDate>,
}

fn keep_cost() -> CostMode {
    CostMode::Keep
}

#[derive(Debug, Deserialize)]
pub struct ExitRequest {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub reason: String,
    pub date: Option<NaiveDate>,
}

/// Product after the movement, plus the movement itself.
#[derive(Debug, Serialize)]
pub struct MovementResponse {
    pub product: Product,
    pub movement: StockMovement,
}

#[derive(Debug, Deserialize)]
pub struct MovementParams {
    pub product_id: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MovementList {
    pub movements: Vec<StockMovement>,
    pub totals: MovementTotals,
}

/// `POST /api/stock/entry`
pub async fn stock_entry(
    State(db): State<DbState>,
    Json(request): Json<EntryRequest>,
) -> ApiResult<Json<MovementResponse>> {
    let (product, movement) = db
        .inner()
        .stock()
        .entry(
            &request.product_id,
            request.quantity,
            request.cost,
            request.reason.as_deref(),
            request.date.unwrap_or_else(today),
        )
        .await?;
    Ok(Json(MovementResponse { product, movement }))
}

/// `POST /api/stock/exit`
pub async fn stock_exit(
    State(db): State<DbState>,
    Json(request): Json<ExitRequest>,
) -> ApiResult<Json<MovementResponse>> {
    let (product, movement) = db
        .inner()
        .stock()
        .exit(
            &request.product_id,
            request.quantity,
            &request.reason,
            request.date.unwrap_or_else(today),
        )
        .await?;
    Ok(Json(MovementResponse { product, movement }))
}

/// `GET /api/stock/movements?product_id=..&limit=..`
pub async fn list_movements(
    State(db): State<DbState>,
    Query(params): Query<MovementParams>,
) -> ApiResult<Json<MovementList>> {
    let movements = db
        .inner()
        .stock()
        .movements(params.product_id.as_deref(), params.limit.unwrap_or(DEFAULT_MOVEMENT_LIMIT))
        .await?;
    let totals = movement_totals(&movements);
    Ok(Json(MovementList { movements, totals }))
}

/// `GET /api/stock/alerts`
pub async fn stock_alerts(State(db): State<DbState>) -> ApiResult<Json<Vec<StockAlert>>> {
    let products = db.inner().products().list(false).await?;
    Ok(Json(stock::stock_alerts(&products)))
}

/// `GET /api/stock/summary`
pub async fn stock_summary(State(db): State<DbState>) -> ApiResult<Json<StockSummary>> {
    let products = db.inner().products().list(false).await?;
    Ok(Json(stock::stock_summary(&products)))
}
