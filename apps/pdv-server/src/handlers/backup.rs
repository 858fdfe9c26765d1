//! # Backup Handlers
//!
//! `GET /api/backup` downloads the whole database as one JSON document;
//! `POST /api/backup/restore` loads one back, all or nothing.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::DbState;
use crate::today;
use pdv_db::{parse_document, DbError};

/// Request body limit for restores; backups outgrow axum's 2 MB default.
pub const MAX_BACKUP_BYTES: usize = 64 * 1024 * 1024;

/// `GET /api/backup`
pub async fn export_backup(State(db): State<DbState>) -> ApiResult<Response> {
    let document = db.inner().backup().export().await?;
    let file_name = format!("backup_pdv_{}.json", today().format("%Y-%m-%d"));
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        )],
        Json(document),
    )
        .into_response())
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub restored: bool,
    pub version: String,
}

/// `POST /api/backup/restore`
///
/// The body is the JSON file as downloaded. An unreadable file is a 400; a
/// file that violates the schema rolls back and leaves the data as it was.
pub async fn restore_backup(State(db): State<DbState>, body: String) -> ApiResult<Json<RestoreResponse>> {
    let document = parse_document(&body).map_err(|e| match e {
        DbError::Serialization(reason) => {
            warn!(reason = %reason, "Unreadable backup file");
            ApiError::validation(format!("Invalid backup file: {}", reason))
        }
        other => ApiError::from(other),
    })?;

    db.inner().backup().restore(&document).await?;
    info!(version = %document.version, timestamp = %document.timestamp, "Backup restored");
    Ok(Json(RestoreResponse {
        restored: true,
        version: document.version,
    }))
}
