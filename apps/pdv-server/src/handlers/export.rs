//! # Export Handlers
//!
//! Spreadsheet downloads as CSV (UTF-8 with BOM, `;` separated, decimal
//! comma) so Excel in pt-BR opens them directly.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::error::ApiResult;
use crate::state::DbState;
use crate::today;
use pdv_core::export::{self, export_file_name, CsvTable};

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Wraps a table as a file download.
fn csv_download(name: &str, table: CsvTable) -> Response {
    let file_name = export_file_name(name, today());
    info!(file = %file_name, rows = table.row_count(), "CSV export");
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        table.to_bytes(),
    )
        .into_response()
}

/// `GET /api/exports/sales.csv?from=..&to=..`
pub async fn export_sales(
    State(db): State<DbState>,
    Query(params): Query<PeriodParams>,
) -> ApiResult<Response> {
    let sales = db.inner().sales().list(params.from, params.to).await?;
    Ok(csv_download("Vendas", export::sales_csv(&sales)))
}

/// `GET /api/exports/products.csv`
pub async fn export_products(State(db): State<DbState>) -> ApiResult<Response> {
    let products = db.inner().products().list(false).await?;
    Ok(csv_download("Produtos", export::products_csv(&products)))
}

/// `GET /api/exports/expenses.csv`
pub async fn export_expenses(State(db): State<DbState>) -> ApiResult<Response> {
    let expenses = db.inner().expenses().list().await?;
    Ok(csv_download("Despesas", export::expenses_csv(&expenses)))
}

/// `GET /api/exports/sold-budgets.csv`
pub async fn export_sold_budgets(State(db): State<DbState>) -> ApiResult<Response> {
    let budgets = db.inner().budgets().list().await?;
    Ok(csv_download("Orcamentos_Vendidos", export::sold_budgets_csv(&budgets)))
}

/// `GET /api/exports/stock-movements.csv`
pub async fn export_stock_movements(State(db): State<DbState>) -> ApiResult<Response> {
    let movements = db.inner().stock().all_movements().await?;
    Ok(csv_download("Movimentacoes_Estoque", export::stock_movements_csv(&movements)))
}
