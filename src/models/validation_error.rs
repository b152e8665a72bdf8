//! ValidationError entity model
//!
//! SeaORM entity for the validation_errors table, one row per validation
//! finding recorded during a sync run.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use uuid::Uuid;

/// ValidationError entity representing one recorded validation finding
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "validation_errors")]
pub struct Model {
    /// Unique identifier for the finding (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Run this finding belongs to
    pub sync_run_id: Uuid,

    /// 1-based row number within the source file
    pub row_number: i64,

    /// Source file the row came from (credit or payment)
    pub file_type: String,

    /// Field that failed validation
    pub field_name: String,

    /// Error classification (REQUIRED, TYPE, RANGE, FORMAT, VALUE,
    /// CROSS_REFERENCE)
    pub error_type: String,

    /// Human-readable description of the failure
    pub error_message: String,

    /// Offending raw value, when one was present
    pub raw_value: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sync_run::Entity",
        from = "Column::SyncRunId",
        to = "super::sync_run::Column::Id"
    )]
    SyncRun,
}

impl Related<super::sync_run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SyncRun.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
