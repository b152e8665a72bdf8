//! # Sync Run Query Handlers
//!
//! Read-only endpoints over the run log: run history, single runs, and the
//! validation errors recorded for a run.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, validation_error};
use crate::records::{SyncRun, ValidationFinding};
use crate::server::AppState;

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 200;

/// Query parameters for listing sync runs
#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    /// Maximum number of runs to return (default: 50, max: 200)
    pub limit: Option<u64>,
}

/// List recent sync runs for a tenant, newest first.
#[utoipa::path(
    get,
    path = "/tenants/{tenant_id}/sync-runs",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier"),
        ("limit" = Option<u64>, Query, description = "Maximum number of runs to return"),
    ),
    responses(
        (status = 200, description = "Recent sync runs", body = [SyncRun]),
    ),
    tag = "sync-runs"
)]
pub async fn list_runs(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<Vec<SyncRun>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(validation_error(
            "limit",
            &format!("must be between 1 and {MAX_LIMIT}"),
        ));
    }
    let runs = state.run_store.recent_runs(&tenant_id, limit).await?;
    Ok(Json(runs))
}

/// Fetch a single sync run.
#[utoipa::path(
    get,
    path = "/tenants/{tenant_id}/sync-runs/{run_id}",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier"),
        ("run_id" = Uuid, Path, description = "Sync run identifier"),
    ),
    responses(
        (status = 200, description = "The sync run", body = SyncRun),
        (status = 404, description = "No such run for this tenant", body = ApiError),
    ),
    tag = "sync-runs"
)]
pub async fn get_run(
    State(state): State<AppState>,
    Path((tenant_id, run_id)): Path<(String, Uuid)>,
) -> Result<Json<SyncRun>, ApiError> {
    let run = state.run_store.get_run(&tenant_id, run_id).await?;
    Ok(Json(run))
}

/// Query parameters for browsing a run's validation errors
#[derive(Debug, Deserialize)]
pub struct RunErrorsQuery {
    /// Maximum number of errors to return (default: 50, max: 200)
    pub limit: Option<u64>,
    /// Number of errors to skip, in row-number order (default: 0)
    pub offset: Option<u64>,
}

/// List the validation errors recorded for a sync run, in row-number order.
#[utoipa::path(
    get,
    path = "/tenants/{tenant_id}/sync-runs/{run_id}/errors",
    params(
        ("tenant_id" = String, Path, description = "Tenant identifier"),
        ("run_id" = Uuid, Path, description = "Sync run identifier"),
        ("limit" = Option<u64>, Query, description = "Maximum number of errors to return"),
        ("offset" = Option<u64>, Query, description = "Number of errors to skip"),
    ),
    responses(
        (status = 200, description = "Validation errors for the run", body = [ValidationFinding]),
        (status = 404, description = "No such run for this tenant", body = ApiError),
    ),
    tag = "sync-runs"
)]
pub async fn run_errors(
    State(state): State<AppState>,
    Path((tenant_id, run_id)): Path<(String, Uuid)>,
    Query(query): Query<RunErrorsQuery>,
) -> Result<Json<Vec<ValidationFinding>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(validation_error(
            "limit",
            &format!("must be between 1 and {MAX_LIMIT}"),
        ));
    }
    let offset = query.offset.unwrap_or(0);
    let errors = state.run_store.run_errors(&tenant_id, run_id).await?;
    let page = errors
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect();
    Ok(Json(page))
}
