//! # Sync Trigger Handlers
//!
//! Endpoint for starting a sync run on demand.

use axum::{
    extract::{Path, State},
    response::Json,
};
use tracing::info;

use crate::error::{ApiError, validation_error};
use crate::records::{LoanType, SyncReport};
use crate::server::AppState;

/// Trigger a sync run for one (tenant, loan type) pair.
///
/// Runs the whole pipeline before responding; the report carries the terminal
/// status. A pair already being synced yields 409 with a Retry-After hint.
#[utoipa::path(
    post,
    path = "/tenants/{tenant_id}/syncs/{loan_type}",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier"),
        ("loan_type" = String, Path, description = "Loan portfolio segment: RETAIL or COMMERCIAL"),
    ),
    responses(
        (status = 200, description = "Sync run finished", body = SyncReport),
        (status = 400, description = "Unknown loan type", body = ApiError),
        (status = 409, description = "A sync is already running for this pair", body = ApiError),
    ),
    tag = "syncs"
)]
pub async fn trigger_sync(
    State(state): State<AppState>,
    Path((tenant_id, loan_type)): Path<(String, String)>,
) -> Result<Json<SyncReport>, ApiError> {
    let loan_type = LoanType::parse(&loan_type.to_ascii_uppercase())
        .ok_or_else(|| validation_error("loan_type", "expected RETAIL or COMMERCIAL"))?;

    info!(tenant_id, %loan_type, "manual sync requested");
    let report = state.engine.sync(&tenant_id, loan_type).await?;
    Ok(Json(report))
}
