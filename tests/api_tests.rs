//! HTTP API tests over a real listener with in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use loansync::lock::LeaseStore;
use loansync::records::{FileType, LoanType, RunStatus};
use loansync::runlog::RunStore;
use loansync::server::{AppState, create_app};
use loansync::sync_engine::EngineConfig;

mod test_utils;
use test_utils::{EngineHarness, engine_harness, valid_credit_row};

async fn serve(harness: &EngineHarness) -> String {
    serve_with_db(harness, None).await
}

async fn serve_with_db(
    harness: &EngineHarness,
    db: Option<sea_orm::DatabaseConnection>,
) -> String {
    let state = AppState {
        engine: harness.engine.clone(),
        run_store: harness.run_store.clone() as Arc<dyn RunStore>,
        db,
    };
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn trigger_sync_returns_the_report() {
    let h = engine_harness(EngineConfig::default(), 100);
    h.feed
        .load(
            "bank-a",
            LoanType::Retail,
            FileType::Credit,
            vec![valid_credit_row("LN-1"), valid_credit_row("LN-2")],
        )
        .await;
    let base = serve(&h).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/tenants/bank-a/syncs/retail"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let report: serde_json::Value = response.json().await.unwrap();
    assert_eq!(report["status"], "COMPLETED");
    assert_eq!(report["valid_credit_rows"], 2);
    assert_eq!(report["tenant_id"], "bank-a");
}

#[tokio::test]
async fn unknown_loan_type_is_a_validation_error() {
    let h = engine_harness(EngineConfig::default(), 100);
    let base = serve(&h).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/tenants/bank-a/syncs/personal"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/problem+json")
    );
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn busy_pair_yields_conflict_with_retry_after() {
    let h = engine_harness(EngineConfig::default(), 100);
    let base = serve(&h).await;

    // Hold the pair's lease as if another instance were mid-run.
    h.leases
        .try_acquire(
            "sync_lock:bank-a:RETAIL",
            Uuid::new_v4(),
            Duration::from_secs(600),
        )
        .await
        .unwrap();

    let response = reqwest::Client::new()
        .post(format!("{base}/tenants/bank-a/syncs/RETAIL"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    assert!(response.headers().contains_key("retry-after"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "SYNC_IN_PROGRESS");
}

#[tokio::test]
async fn run_history_endpoints_are_tenant_scoped() {
    let h = engine_harness(EngineConfig::default(), 100);
    h.feed
        .load(
            "bank-a",
            LoanType::Retail,
            FileType::Credit,
            vec![valid_credit_row("LN-1")],
        )
        .await;
    let report = h.engine.sync("bank-a", LoanType::Retail).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);

    let base = serve(&h).await;
    let client = reqwest::Client::new();

    let runs: serde_json::Value = client
        .get(format!("{base}/tenants/bank-a/sync-runs"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(runs.as_array().unwrap().len(), 1);

    let single = client
        .get(format!("{base}/tenants/bank-a/sync-runs/{}", report.run_id))
        .send()
        .await
        .unwrap();
    assert_eq!(single.status(), 200);

    // Another tenant cannot see the run.
    let foreign = client
        .get(format!("{base}/tenants/bank-b/sync-runs/{}", report.run_id))
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), 404);

    let errors = client
        .get(format!(
            "{base}/tenants/bank-a/sync-runs/{}/errors",
            report.run_id
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(errors.status(), 200);
}

#[tokio::test]
async fn health_endpoint_probes_the_database() {
    let h = engine_harness(EngineConfig::default(), 100);
    let db = test_utils::setup_test_db().await.unwrap();
    let base = serve_with_db(&h, Some(db)).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn health_endpoint_reports_ok_without_database() {
    let h = engine_harness(EngineConfig::default(), 100);
    let base = serve(&h).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
