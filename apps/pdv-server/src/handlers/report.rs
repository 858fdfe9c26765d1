//! # Report Handlers
//!
//! Loads the rows each report needs and hands them to the pure functions
//! in `pdv_core::reports`. Cancelled sales never count.

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::DbState;
use crate::today;
use pdv_core::finance::{self, FinancialSummary};
use pdv_core::reports::{self, Dashboard, MonthlySummary, PaymentMethodShare, ProductPerformance, YearlyStats};
use pdv_db::Database;

const DEFAULT_MONTHS: usize = 6;
const DEFAULT_TOP_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

async fn load_financial(db: &Database, today: NaiveDate) -> ApiResult<FinancialSummary> {
    let accounts_repo = db.accounts();
    accounts_repo.refresh_overdue(today).await?;
    let accounts = accounts_repo.list().await?;
    let cash_flow = db.cash_flow().list(None, None).await?;
    Ok(finance::financial_summary(&accounts, &cash_flow, today))
}

/// `GET /api/reports/dashboard`
pub async fn dashboard(State(db): State<DbState>) -> ApiResult<Json<Dashboard>> {
    let today = today();
    let sales = db.inner().sales().list(None, None).await?;
    let products = db.inner().products().list(false).await?;
    let financial = load_financial(db.inner(), today).await?;
    Ok(Json(reports::dashboard(&sales, &products, &financial, today)))
}

/// `GET /api/reports/sales-by-payment?from=..&to=..`
pub async fn sales_by_payment(
    State(db): State<DbState>,
    Query(params): Query<PeriodParams>,
) -> ApiResult<Json<Vec<PaymentMethodShare>>> {
    let sales = db.inner().sales().list(params.from, params.to).await?;
    Ok(Json(reports::sales_by_payment(&sales)))
}

#[derive(Debug, Deserialize)]
pub struct MonthlyParams {
    pub months: Option<usize>,
}

/// `GET /api/reports/monthly?months=12`
pub async fn monthly_summary(
    State(db): State<DbState>,
    Query(params): Query<MonthlyParams>,
) -> ApiResult<Json<Vec<MonthlySummary>>> {
    let sales = db.inner().sales().list(None, None).await?;
    let months = params.months.unwrap_or(DEFAULT_MONTHS).clamp(1, 120);
    Ok(Json(reports::monthly_summary(&sales, months)))
}

/// `GET /api/reports/yearly`
pub async fn yearly_stats(State(db): State<DbState>) -> ApiResult<Json<YearlyStats>> {
    let sales = db.inner().sales().list(None, None).await?;
    Ok(Json(reports::yearly_stats(&sales, today())))
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

/// `GET /api/reports/top-products?from=..&to=..&limit=10`
pub async fn top_products(
    State(db): State<DbState>,
    Query(params): Query<TopParams>,
) -> ApiResult<Json<Vec<ProductPerformance>>> {
    let sales = db.inner().sales().list_with_items(params.from, params.to).await?;
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, 100);
    Ok(Json(reports::top_products(&sales, limit)))
}

/// `GET /api/reports/financial`
pub async fn financial_summary(State(db): State<DbState>) -> ApiResult<Json<FinancialSummary>> {
    Ok(Json(load_financial(db.inner(), today()).await?))
}
