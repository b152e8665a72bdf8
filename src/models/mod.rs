//! # Data Models
//!
//! SeaORM entities backing the run log, plus shared API response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod sync_run;
pub mod validation_error;

pub use sync_run::Entity as SyncRun;
pub use validation_error::Entity as ValidationError;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "loansync".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
