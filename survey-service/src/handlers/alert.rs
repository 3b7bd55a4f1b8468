//! Fire alert lookup.

use crate::services::metrics::record_fire_alert;
use crate::startup::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use service_core::error::AppError;

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub address: String,
}

/// `GET|POST /fire-alert`: report the address of the latest submission.
pub async fn fire_alert(State(state): State<AppState>) -> Result<Json<AlertResponse>, AppError> {
    let address = state
        .db
        .latest_address()
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch alert address"))?
        .ok_or_else(|| {
            tracing::error!("Fire alert requested but no survey records exist");
            AppError::DatabaseError(anyhow::anyhow!("No address recorded yet"))
        })?;

    record_fire_alert();
    tracing::warn!(address = %address, "Fire detected at address");

    Ok(Json(AlertResponse { address }))
}
