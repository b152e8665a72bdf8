//! SyncRun entity model
//!
//! SeaORM entity for the sync_runs table, one row per pipeline execution
//! for a (tenant, loan_type) pair.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// SyncRun entity representing one sync pipeline execution
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_runs")]
pub struct Model {
    /// Unique identifier for the run (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Tenant identifier for multi-tenancy
    pub tenant_id: String,

    /// Loan portfolio segment (RETAIL or COMMERCIAL)
    pub loan_type: String,

    /// Correlates staging writes of this run in the warehouse
    pub batch_id: Uuid,

    /// Current pipeline stage or terminal outcome
    pub status: String,

    /// Credit rows fetched from the source
    pub total_credit_rows: i64,

    /// Credit rows that passed validation
    pub valid_credit_rows: i64,

    /// Payment rows fetched from the source
    pub total_payment_rows: i64,

    /// Payment rows that passed validation
    pub valid_payment_rows: i64,

    /// Total validation findings recorded for this run
    pub error_count: i64,

    /// Error counts grouped by kind, plus failure reason on failed runs
    #[sea_orm(column_type = "JsonBinary")]
    pub error_summary: Option<JsonValue>,

    /// Timestamp when the run started
    pub started_at: DateTimeWithTimeZone,

    /// Timestamp when the run reached a terminal state
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::validation_error::Entity")]
    ValidationError,
}

impl Related<super::validation_error::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ValidationError.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
