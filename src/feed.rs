//! Source feed abstraction over the upstream loan data export.
//!
//! The engine consumes rows through the [`SourceFeed`] trait so the pipeline
//! can be exercised against an in-memory feed in tests while production wires
//! an HTTP client to the bank's export endpoint.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::records::{FileType, LoanType, RawRow};

/// Errors that can occur while fetching source data.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Feed returned status {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Feed URL construction failed: {0}")]
    Url(#[from] url::ParseError),

    #[error("No data available for tenant {tenant_id}, {loan_type} {file_type}")]
    NotFound {
        tenant_id: String,
        loan_type: LoanType,
        file_type: FileType,
    },
}

/// A read-only source of raw loan and payment rows for one tenant.
#[async_trait]
pub trait SourceFeed: Send + Sync {
    /// Number of rows the upstream currently exposes for the file.
    ///
    /// Used as a preflight check so a sync can fail fast before fetching
    /// a payload it would abort on anyway.
    async fn row_count(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<u64, FeedError>;

    /// Fetch all rows of one file for the tenant.
    async fn fetch(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<Vec<RawRow>, FeedError>;
}

/// Retry behaviour for the HTTP feed client.
#[derive(Debug, Clone)]
pub struct FeedRetryConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub jitter_factor: f64,
}

impl Default for FeedRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 500,
            jitter_factor: 0.25,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RowCountBody {
    count: u64,
}

/// HTTP client for the upstream export service.
///
/// Paths follow the export convention:
/// `{base}/tenants/{tenant}/{loan_type}/{file_type}/count` and
/// `{base}/tenants/{tenant}/{loan_type}/{file_type}/rows`.
pub struct HttpFeed {
    client: Client,
    base_url: Url,
    retry: FeedRetryConfig,
}

impl HttpFeed {
    pub fn new(base_url: Url, retry: FeedRetryConfig) -> Self {
        Self {
            client: Client::new(),
            base_url,
            retry,
        }
    }

    fn endpoint(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
        leaf: &str,
    ) -> Result<Url, FeedError> {
        let path = format!(
            "tenants/{tenant_id}/{}/{}/{leaf}",
            loan_type.as_str().to_ascii_lowercase(),
            file_type.as_str()
        );
        Ok(self.base_url.join(&path)?)
    }

    // Fixed backoff with jitter; only transient failures are retried.
    async fn get_with_retry(&self, url: &Url) -> Result<reqwest::Response, FeedError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let error = match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status().is_server_error() => {
                    FeedError::UnexpectedStatus {
                        status: response.status().as_u16(),
                        url: url.to_string(),
                    }
                }
                // Client errors are not transient, surface immediately.
                Ok(response) => {
                    return Err(FeedError::UnexpectedStatus {
                        status: response.status().as_u16(),
                        url: url.to_string(),
                    });
                }
                Err(e) => FeedError::Network(e),
            };

            if attempt >= self.retry.max_attempts {
                return Err(error);
            }

            let jitter = 1.0 - self.retry.jitter_factor
                + rand::random::<f64>() * 2.0 * self.retry.jitter_factor;
            let delay = std::time::Duration::from_millis(
                (self.retry.backoff_ms as f64 * jitter) as u64,
            );
            warn!(
                "Feed request attempt {} failed: {}. Retrying after {:?}",
                attempt, error, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl SourceFeed for HttpFeed {
    async fn row_count(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<u64, FeedError> {
        let url = self.endpoint(tenant_id, loan_type, file_type, "count")?;
        let response = self.get_with_retry(&url).await.map_err(|e| match e {
            FeedError::UnexpectedStatus { status: 404, .. } => FeedError::NotFound {
                tenant_id: tenant_id.to_string(),
                loan_type,
                file_type,
            },
            other => other,
        })?;
        let body: RowCountBody = response.json().await?;
        debug!(
            tenant_id,
            loan_type = %loan_type,
            file_type = %file_type,
            count = body.count,
            "feed row count"
        );
        Ok(body.count)
    }

    async fn fetch(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<Vec<RawRow>, FeedError> {
        let url = self.endpoint(tenant_id, loan_type, file_type, "rows")?;
        let response = self.get_with_retry(&url).await.map_err(|e| match e {
            FeedError::UnexpectedStatus { status: 404, .. } => FeedError::NotFound {
                tenant_id: tenant_id.to_string(),
                loan_type,
                file_type,
            },
            other => other,
        })?;
        let rows: Vec<RawRow> = response.json().await?;
        Ok(rows)
    }
}

/// In-memory feed keyed by (tenant, loan type, file type). Test double.
#[derive(Default)]
pub struct MemoryFeed {
    files: tokio::sync::RwLock<HashMap<(String, LoanType, FileType), Vec<RawRow>>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
        rows: Vec<RawRow>,
    ) {
        self.files
            .write()
            .await
            .insert((tenant_id.to_string(), loan_type, file_type), rows);
    }
}

#[async_trait]
impl SourceFeed for MemoryFeed {
    async fn row_count(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<u64, FeedError> {
        let files = self.files.read().await;
        match files.get(&(tenant_id.to_string(), loan_type, file_type)) {
            Some(rows) => Ok(rows.len() as u64),
            None => Ok(0),
        }
    }

    async fn fetch(
        &self,
        tenant_id: &str,
        loan_type: LoanType,
        file_type: FileType,
    ) -> Result<Vec<RawRow>, FeedError> {
        let files = self.files.read().await;
        Ok(files
            .get(&(tenant_id.to_string(), loan_type, file_type))
            .cloned()
            .unwrap_or_default())
    }
}
