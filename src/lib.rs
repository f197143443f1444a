//! # Alertsync Library
//!
//! This library provides the core functionality for the alert binding
//! synchronization engine: entity models, repositories with transactional
//! audit, the remote alert provider client, and the sync runner.

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod provider;
pub mod repositories;
pub mod sync_runner;
pub mod telemetry;
pub use migration;
