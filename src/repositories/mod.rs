//! # Repository Layer
//!
//! Repository implementations that encapsulate SeaORM operations for
//! database entities, providing tenant-aware data access.

pub mod sync_run;

pub use sync_run::DbRunStore;
