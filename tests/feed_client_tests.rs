//! HttpFeed client tests against a wiremock server.

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use loansync::feed::{FeedError, FeedRetryConfig, HttpFeed, SourceFeed};
use loansync::records::{FileType, LoanType};

fn fast_retry() -> FeedRetryConfig {
    FeedRetryConfig {
        max_attempts: 3,
        backoff_ms: 10,
        jitter_factor: 0.0,
    }
}

#[tokio::test]
async fn row_count_hits_the_count_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenants/bank-a/retail/credit/count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 42 })))
        .mount(&server)
        .await;

    let feed = HttpFeed::new(Url::parse(&server.uri()).unwrap(), fast_retry());
    let count = feed
        .row_count("bank-a", LoanType::Retail, FileType::Credit)
        .await
        .unwrap();
    assert_eq!(count, 42);
}

#[tokio::test]
async fn fetch_parses_rows_as_string_maps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenants/bank-a/commercial/payment/rows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "loan_account_number": "LN-1", "installment_number": "1" },
            { "loan_account_number": "LN-2", "installment_number": "2" },
        ])))
        .mount(&server)
        .await;

    let feed = HttpFeed::new(Url::parse(&server.uri()).unwrap(), fast_retry());
    let rows = feed
        .fetch("bank-a", LoanType::Commercial, FileType::Payment)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("loan_account_number").unwrap(), "LN-1");
    assert_eq!(rows[1].get("installment_number").unwrap(), "2");
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenants/bank-a/retail/credit/count"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tenants/bank-a/retail/credit/count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 7 })))
        .mount(&server)
        .await;

    let feed = HttpFeed::new(Url::parse(&server.uri()).unwrap(), fast_retry());
    let count = feed
        .row_count("bank-a", LoanType::Retail, FileType::Credit)
        .await
        .unwrap();
    assert_eq!(count, 7);
}

#[tokio::test]
async fn client_errors_fail_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenants/bank-a/retail/credit/rows"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let feed = HttpFeed::new(Url::parse(&server.uri()).unwrap(), fast_retry());
    let result = feed
        .fetch("bank-a", LoanType::Retail, FileType::Credit)
        .await;
    match result {
        Err(FeedError::NotFound {
            tenant_id,
            loan_type,
            file_type,
        }) => {
            assert_eq!(tenant_id, "bank-a");
            assert_eq!(loan_type, LoanType::Retail);
            assert_eq!(file_type, FileType::Credit);
        }
        other => panic!("expected not-found error, got {other:?}"),
    }
    server.verify().await;
}

#[tokio::test]
async fn retries_exhausted_surface_the_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenants/bank-a/retail/credit/count"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let feed = HttpFeed::new(Url::parse(&server.uri()).unwrap(), fast_retry());
    let result = feed
        .row_count("bank-a", LoanType::Retail, FileType::Credit)
        .await;
    assert!(matches!(
        result,
        Err(FeedError::UnexpectedStatus { status: 503, .. })
    ));
    server.verify().await;
}
