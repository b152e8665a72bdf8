//! DbRunStore tests against in-memory SQLite with migrations applied.

use anyhow::Result;
use chrono::Utc;

use loansync::records::{
    ErrorKind, FileType, LoanType, RunStatus, SyncRun, ValidationFinding,
};
use loansync::repositories::DbRunStore;
use loansync::runlog::{RunOutcome, RunStore, RunStoreError};

mod test_utils;
use test_utils::setup_test_db;

fn finding(row_number: u64) -> ValidationFinding {
    ValidationFinding {
        row_number,
        file_type: FileType::Credit,
        field_name: "customer_id".to_string(),
        kind: ErrorKind::Required,
        message: "customer_id is required".to_string(),
        raw_value: None,
    }
}

#[tokio::test]
async fn run_lifecycle_round_trips() -> Result<()> {
    let store = DbRunStore::new(setup_test_db().await?);
    let run = SyncRun::start("bank-a", LoanType::Retail);
    store.append_run(&run).await?;

    store.update_status(run.id, RunStatus::Fetching).await?;
    store.update_status(run.id, RunStatus::Validating).await?;

    let mut summary = std::collections::BTreeMap::new();
    summary.insert("REQUIRED".to_string(), serde_json::json!(2));
    store
        .finish_run(
            run.id,
            RunStatus::Completed,
            &RunOutcome {
                total_credit_rows: 10,
                valid_credit_rows: 8,
                total_payment_rows: 5,
                valid_payment_rows: 5,
                error_count: 2,
                error_summary: summary.clone(),
                completed_at: Some(Utc::now()),
            },
        )
        .await?;

    let loaded = store.get_run("bank-a", run.id).await?;
    assert_eq!(loaded.status, RunStatus::Completed);
    assert_eq!(loaded.batch_id, run.batch_id);
    assert_eq!(loaded.valid_credit_rows, 8);
    assert_eq!(loaded.error_summary, summary);
    assert!(loaded.completed_at.is_some());
    Ok(())
}

#[tokio::test]
async fn errors_survive_batched_inserts() -> Result<()> {
    let store = DbRunStore::new(setup_test_db().await?);
    let run = SyncRun::start("bank-a", LoanType::Retail);
    store.append_run(&run).await?;

    // More findings than one insert batch holds.
    let findings: Vec<ValidationFinding> = (1..=1500).map(finding).collect();
    store.append_errors(run.id, &findings).await?;

    let loaded = store.run_errors("bank-a", run.id).await?;
    assert_eq!(loaded.len(), 1500);
    assert_eq!(loaded[0].row_number, 1);
    assert_eq!(loaded[1499].row_number, 1500);
    Ok(())
}

#[tokio::test]
async fn runs_and_errors_are_tenant_scoped() -> Result<()> {
    let store = DbRunStore::new(setup_test_db().await?);
    let run = SyncRun::start("bank-a", LoanType::Retail);
    store.append_run(&run).await?;
    store.append_errors(run.id, &[finding(1)]).await?;

    assert!(matches!(
        store.get_run("bank-b", run.id).await,
        Err(RunStoreError::NotFound { .. })
    ));
    assert!(store.run_errors("bank-b", run.id).await.is_err());
    assert!(store.recent_runs("bank-b", 10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn recent_runs_are_newest_first_and_limited() -> Result<()> {
    let store = DbRunStore::new(setup_test_db().await?);

    let mut ids = Vec::new();
    for i in 0..5 {
        let mut run = SyncRun::start("bank-a", LoanType::Retail);
        run.started_at = Utc::now() - chrono::Duration::minutes(5 - i);
        store.append_run(&run).await?;
        ids.push(run.id);
    }

    let recent = store.recent_runs("bank-a", 3).await?;
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].id, ids[4]);
    assert_eq!(recent[1].id, ids[3]);
    assert_eq!(recent[2].id, ids[2]);
    Ok(())
}

#[tokio::test]
async fn updating_a_missing_run_is_not_found() -> Result<()> {
    let store = DbRunStore::new(setup_test_db().await?);
    let result = store
        .update_status(uuid::Uuid::new_v4(), RunStatus::Fetching)
        .await;
    assert!(matches!(result, Err(RunStoreError::NotFound { .. })));
    Ok(())
}
