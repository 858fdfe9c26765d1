//! # Customer Handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::error::ApiResult;
use crate::state::DbState;
use pdv_core::{Customer, CustomerInput};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
}

/// `GET /api/customers?q=maria`
pub async fn list_customers(
    State(db): State<DbState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(db.inner().customers().list(params.q.as_deref()).await?))
}

/// `GET /api/customers/:id`
pub async fn get_customer(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<Json<Customer>> {
    Ok(Json(db.inner().customers().get(&id).await?))
}

/// `POST /api/customers`
pub async fn create_customer(
    State(db): State<DbState>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = db.inner().customers().insert(input).await?;
    info!(customer_id = %customer.id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// `PUT /api/customers/:id`
pub async fn update_customer(
    State(db): State<DbState>,
    Path(id): Path<String>,
    Json(input): Json<CustomerInput>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(db.inner().customers().update(&id, input).await?))
}

/// `DELETE /api/customers/:id`
///
/// Past sales keep the customer name they were made with.
pub async fn delete_customer(State(db): State<DbState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.inner().customers().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
