//! # Finance Handlers
//!
//! Expenses (despesas), accounts payable and receivable, the cash flow and
//! register withdrawals (sangrias).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Store            Endpoint            Writes cash flow?                 │
//! │  ─────            ────────            ─────────────────                 │
//! │  local_store      /expenses           no                                │
//! │  local_store      /withdrawals        no                                │
//! │  accounts table   /accounts/:id/pay   yes, same transaction             │
//! │  cash_flow table  /cash-flow          manual entries                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Listing expenses or accounts first flags the overdue ones.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiResult;
use crate::state::DbState;
use crate::today;
use pdv_core::finance::{Expense, ExpenseInput, ExpenseSummary, Withdrawal, WithdrawalInput};
use pdv_core::{Account, AccountInput, AccountKind, CashFlowEntry, CashFlowInput};

// =============================================================================
// Expenses
// =============================================================================

/// `GET /api/expenses`
pub async fn list_expenses(State(db): State<DbState>) -> ApiResult<Json<Vec<Expense>>> {
    let expenses = db.inner().expenses();
    expenses.refresh_overdue(today()).await?;
    Ok(Json(expenses.list().await?))
}

/// `GET /api/expenses/summary`
pub async fn expense_summary(State(db): State<DbState>) -> ApiResult<Json<ExpenseSummary>> {
    let expenses = db.inner().expenses();
    expenses.refresh_overdue(today()).await?;
    Ok(Json(expenses.summary().await?))
}

/// `POST /api/expenses`
pub async fn create_expense(
    State(db): State<DbState>,
    Json(input): Json<ExpenseInput>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let expense = db.inner().expenses().create(input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// `PUT /api/expenses/:id`
pub async fn update_expense(
    State(db): State<DbState>,
    Path(id): Path<String>,
    Json(input): Json<ExpenseInput>,
) -> ApiResult<Json<Expense>> {
    Ok(Json(db.inner().expenses().update(&id, input).await?))
}

/// `DELETE /api/expenses/:id`
pub async fn delete_expense(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().expenses().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AccountParams {
    pub kind: Option<AccountKind>,
}

/// `GET /api/accounts?kind=payable`
pub async fn list_accounts(
    State(db): State<DbState>,
    Query(params): Query<AccountParams>,
) -> ApiResult<Json<Vec<Account>>> {
    let accounts = db.inner().accounts();
    let flagged = accounts.refresh_overdue(today()).await?;
    if flagged > 0 {
        debug!(flagged, "Accounts flagged overdue");
    }

    let mut list = accounts.list().await?;
    if let Some(kind) = params.kind {
        list.retain(|a| a.kind == kind);
    }
    Ok(Json(list))
}

/// `POST /api/accounts`
pub async fn create_account(
    State(db): State<DbState>,
    Json(input): Json<AccountInput>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let account = db.inner().accounts().create(input).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Debug, Default, Deserialize)]
pub struct PayRequest {
    pub paid_date: Option<NaiveDate>,
}

/// `POST /api/accounts/:id/pay`
///
/// Settles the account and records the matching cash-flow entry.
pub async fn pay_account(
    State(db): State<DbState>,
    Path(id): Path<String>,
    request: Option<Json<PayRequest>>,
) -> ApiResult<Json<Account>> {
    let paid_date = request.and_then(|Json(r)| r.paid_date).unwrap_or_else(today);
    Ok(Json(db.inner().accounts().mark_paid(&id, paid_date).await?))
}

/// `POST /api/accounts/:id/cancel`
pub async fn cancel_account(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<Account>> {
    Ok(Json(db.inner().accounts().cancel(&id).await?))
}

/// `DELETE /api/accounts/:id`
pub async fn delete_account(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().accounts().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Cash flow
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// `GET /api/cash-flow?from=..&to=..`
pub async fn list_cash_flow(
    State(db): State<DbState>,
    Query(params): Query<PeriodParams>,
) -> ApiResult<Json<Vec<CashFlowEntry>>> {
    Ok(Json(db.inner().cash_flow().list(params.from, params.to).await?))
}

/// `POST /api/cash-flow`
pub async fn create_cash_flow(
    State(db): State<DbState>,
    Json(input): Json<CashFlowInput>,
) -> ApiResult<(StatusCode, Json<CashFlowEntry>)> {
    let entry = db.inner().cash_flow().create(input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `DELETE /api/cash-flow/:id`
///
/// Only manual entries; those written by sales and accounts answer 404.
pub async fn delete_cash_flow(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().cash_flow().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Withdrawals
// =============================================================================

#[derive(Debug, Serialize)]
pub struct WithdrawalList {
    pub withdrawals: Vec<Withdrawal>,
    pub total_cents: i64,
}

/// `GET /api/withdrawals`
pub async fn list_withdrawals(State(db): State<DbState>) -> ApiResult<Json<WithdrawalList>> {
    let withdrawals = db.inner().withdrawals().list().await?;
    let total_cents = pdv_core::finance::withdrawals_total(&withdrawals).cents();
    Ok(Json(WithdrawalList {
        withdrawals,
        total_cents,
    }))
}

/// `POST /api/withdrawals`
pub async fn create_withdrawal(
    State(db): State<DbState>,
    Json(input): Json<WithdrawalInput>,
) -> ApiResult<(StatusCode, Json<Withdrawal>)> {
    let withdrawal = db.inner().withdrawals().create(input).await?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}

/// `DELETE /api/withdrawals/:id`
pub async fn delete_withdrawal(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().withdrawals().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
