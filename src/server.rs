//! # Server Configuration
//!
//! Server setup and routing for the loan sync API.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;
use crate::runlog::RunStore;
use crate::sync_engine::SyncEngine;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub run_store: Arc<dyn RunStore>,
    /// Present when the run log is database-backed; used by the health probe.
    pub db: Option<DatabaseConnection>,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route(
            "/tenants/{tenant_id}/syncs/{loan_type}",
            post(handlers::syncs::trigger_sync),
        )
        .route(
            "/tenants/{tenant_id}/sync-runs",
            get(handlers::runs::list_runs),
        )
        .route(
            "/tenants/{tenant_id}/sync-runs/{run_id}",
            get(handlers::runs::get_run),
        )
        .route(
            "/tenants/{tenant_id}/sync-runs/{run_id}/errors",
            get(handlers::runs::run_errors),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: &AppConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.api_bind_addr).await?;
    tracing::info!(
        bind_addr = config.api_bind_addr,
        profile = config.profile,
        "Server listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::syncs::trigger_sync,
        crate::handlers::runs::list_runs,
        crate::handlers::runs::get_run,
        crate::handlers::runs::run_errors,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::records::LoanType,
            crate::records::FileType,
            crate::records::RunStatus,
            crate::records::ErrorKind,
            crate::records::ValidationFinding,
            crate::records::SyncRun,
            crate::records::SyncReport,
            crate::records::FailureReason,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Loan Sync API",
        description = "API for syncing loan portfolio data into the analytical warehouse",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
