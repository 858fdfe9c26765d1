//! # Budget Handlers
//!
//! Orçamentos: quotes kept in the local store, printable, and convertible
//! into a sale.
//!
//! ## Budget Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   orcamento ──► pedido ◄──► aprovado                                    │
//! │       │           │            │                                        │
//! │       ├───────────┴────────────┴──► rejeitado   (PUT /status)           │
//! │       │           │            │                                        │
//! │       └───────────┴────────────┴──► vendido     (POST /convert only)    │
//! │                                                                         │
//! │   rejeitado and vendido are final and can no longer be edited          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::system::load_company;
use crate::state::{ConfigState, DbState};
use crate::today;
use pdv_core::budget::{Budget, BudgetInput, BudgetStatus};
use pdv_core::print::budget_html;
use pdv_core::{PaymentMethod, SaleWithItems};

/// `GET /api/budgets`
pub async fn list_budgets(State(db): State<DbState>) -> ApiResult<Json<Vec<Budget>>> {
    Ok(Json(db.inner().budgets().list().await?))
}

/// `GET /api/budgets/:id`
pub async fn get_budget(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<Budget>> {
    Ok(Json(db.inner().budgets().get(&id).await?))
}

/// `POST /api/budgets`
pub async fn create_budget(
    State(db): State<DbState>,
    State(config): State<ConfigState>,
    Json(input): Json<BudgetInput>,
) -> ApiResult<(StatusCode, Json<Budget>)> {
    let budget = db
        .inner()
        .budgets()
        .create(input, today(), config.budget_validity_days)
        .await?;
    Ok((StatusCode::CREATED, Json(budget)))
}

/// `PUT /api/budgets/:id`
pub async fn update_budget(
    State(db): State<DbState>,
    State(config): State<ConfigState>,
    Path(id): Path<String>,
    Json(input): Json<BudgetInput>,
) -> ApiResult<Json<Budget>> {
    Ok(Json(
        db.inner()
            .budgets()
            .update(&id, input, today(), config.budget_validity_days)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: BudgetStatus,
}

/// `PUT /api/budgets/:id/status`
pub async fn update_budget_status(
    State(db): State<DbState>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<Budget>> {
    Ok(Json(db.inner().budgets().update_status(&id, request.status).await?))
}

/// `DELETE /api/budgets/:id`
pub async fn delete_budget(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().budgets().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub checkout_token: Option<String>,
    pub payment_method: PaymentMethod,
    /// Cash tendered; defaults to the budget total.
    pub amount_paid_cents: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub budget: Budget,
    pub sale: SaleWithItems,
    pub replayed: bool,
}

/// `POST /api/budgets/:id/convert`
///
/// Writes the sale and marks the budget `vendido` in one transaction.
pub async fn convert_budget(
    State(db): State<DbState>,
    Path(id): Path<String>,
    Json(request): Json<ConvertRequest>,
) -> ApiResult<Json<ConvertResponse>> {
    let token = request
        .checkout_token
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let (budget, outcome) = db
        .inner()
        .budgets()
        .convert_to_sale(
            &id,
            &token,
            request.payment_method,
            request.amount_paid_cents,
            today(),
        )
        .await?;

    info!(
        budget_id = %budget.id,
        sale_id = %outcome.sale.sale.id,
        replayed = outcome.replayed,
        "Budget converted"
    );
    Ok(Json(ConvertResponse {
        budget,
        sale: outcome.sale,
        replayed: outcome.replayed,
    }))
}

/// `GET /api/budgets/:id/print`
pub async fn print_budget(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Html<String>> {
    let budget = db.inner().budgets().get(&id).await?;
    let company = load_company(db.inner()).await?;
    Ok(Html(budget_html(&budget, &company, today())))
}
