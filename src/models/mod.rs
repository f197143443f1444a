//! # Data Models
//!
//! This module contains the SeaORM entity models for the alertsync engine.

pub mod alert_binding;
pub mod audit_entry;
pub mod connector_run;
pub mod query_profile;

pub use alert_binding::Entity as AlertBinding;
pub use audit_entry::Entity as AuditEntry;
pub use connector_run::Entity as ConnectorRun;
pub use query_profile::Entity as QueryProfile;
