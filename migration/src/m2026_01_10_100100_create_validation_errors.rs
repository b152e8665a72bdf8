//! Migration to create the validation_errors table.
//!
//! Per-row validation findings owned by a sync run; cascade-deleted with it.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ValidationErrors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ValidationErrors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ValidationErrors::SyncRunId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ValidationErrors::RowNumber)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ValidationErrors::FileType).text().not_null())
                    .col(
                        ColumnDef::new(ValidationErrors::FieldName)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ValidationErrors::ErrorType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ValidationErrors::ErrorMessage)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ValidationErrors::RawValue).text().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_validation_errors_sync_run_id")
                            .from(ValidationErrors::Table, ValidationErrors::SyncRunId)
                            .to(SyncRuns::Table, SyncRuns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_validation_errors_sync_run")
                    .table(ValidationErrors::Table)
                    .col(ValidationErrors::SyncRunId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ValidationErrors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ValidationErrors {
    Table,
    Id,
    SyncRunId,
    RowNumber,
    FileType,
    FieldName,
    ErrorType,
    ErrorMessage,
    RawValue,
}

#[derive(DeriveIden)]
enum SyncRuns {
    Table,
    Id,
}
