//! # Loan Sync Library
//!
//! Core functionality for the loan portfolio sync service: the pipeline
//! engine, validators and normalizers, warehouse and run-log abstractions,
//! and the HTTP API surface.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod lock;
pub mod models;
pub mod normalize;
pub mod records;
pub mod repositories;
pub mod runlog;
pub mod scheduler;
pub mod server;
pub mod storage;
pub mod sync_engine;
pub mod telemetry;
pub mod validate;
pub mod warehouse;
pub use migration;
