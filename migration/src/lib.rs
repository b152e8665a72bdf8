//! Database migrations for the loansync durable run log.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_10_100000_create_sync_runs;
mod m2026_01_10_100100_create_validation_errors;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_10_100000_create_sync_runs::Migration),
            Box::new(m2026_01_10_100100_create_validation_errors::Migration),
        ]
    }
}
