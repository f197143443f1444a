//! Database migrations for the alertsync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_12_100000_create_query_profiles;
mod m2026_01_12_100100_create_alert_bindings;
mod m2026_01_12_100200_create_audit_entries;
mod m2026_01_12_100300_create_connector_runs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_12_100000_create_query_profiles::Migration),
            Box::new(m2026_01_12_100100_create_alert_bindings::Migration),
            Box::new(m2026_01_12_100200_create_audit_entries::Migration),
            Box::new(m2026_01_12_100300_create_connector_runs::Migration),
        ]
    }
}
