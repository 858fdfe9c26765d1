//! # System Handlers
//!
//! Health check, business settings and the company header printed on
//! receipts and budgets.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::{ConfigState, DbState};
use pdv_core::print::CompanyInfo;
use pdv_core::validation::{validate_email, validate_optional_text, validate_required_text};
use pdv_db::repository::local_store::keys;
use pdv_db::Database;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

/// `GET /api/health`
pub async fn health(State(db): State<DbState>) -> Json<HealthResponse> {
    let database = db.inner().health_check().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
    })
}

/// `GET /api/config`
pub async fn get_config(State(config): State<ConfigState>) -> Json<ConfigState> {
    debug!("get_config");
    Json(config)
}

/// `GET /api/config/company`
///
/// Falls back to the default header until the company is first saved.
pub async fn get_company(State(db): State<DbState>) -> ApiResult<Json<CompanyInfo>> {
    Ok(Json(load_company(db.inner()).await?))
}

/// `PUT /api/config/company`
pub async fn update_company(
    State(db): State<DbState>,
    Json(company): Json<CompanyInfo>,
) -> ApiResult<Json<CompanyInfo>> {
    validate_required_text("name", &company.name, 200)?;
    validate_optional_text("address", Some(&company.address), 300)?;
    if !company.email.trim().is_empty() {
        validate_email(&company.email)?;
    }

    db.inner().local_store().save_doc(keys::COMPANY, &company).await?;
    info!(name = %company.name, "Company info updated");
    Ok(Json(company))
}

/// Company header for printouts.
pub(crate) async fn load_company(db: &Database) -> Result<CompanyInfo, ApiError> {
    Ok(db
        .local_store()
        .load_doc::<CompanyInfo>(keys::COMPANY)
        .await?
        .unwrap_or_default())
}
