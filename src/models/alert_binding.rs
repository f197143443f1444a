//! AlertBinding entity model
//!
//! This module contains the SeaORM entity model for the alert_bindings table,
//! the live link between a query profile and one remote alert. The binding is
//! the unit of synchronization: it carries both the administrative status and
//! the operational sync state, plus backfill progress and validation caching.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// AlertBinding entity linking a query profile to one remote alert id
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert_bindings")]
pub struct Model {
    /// Unique identifier for the binding (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning query profile
    pub profile_id: Uuid,

    /// Optional logical grouping of the provider integration
    pub connector_id: Option<Uuid>,

    /// Remote alert identity at the provider (unique across bindings)
    pub remote_alert_id: String,

    /// Administrative intent for the binding
    pub status: BindingStatus,

    /// Operational sync lifecycle state
    pub sync_state: SyncState,

    /// Cached outcome of the last remote identity validation
    pub validation_status: ValidationStatus,

    /// Timestamp of the last validation attempt that reached the provider
    pub last_validated_at: Option<DateTimeWithTimeZone>,

    /// Human-readable reason the last validation was not `valid`
    pub last_validation_error: Option<String>,

    /// Timestamp of the last completed incremental sync
    pub last_sync_at: Option<DateTimeWithTimeZone>,

    /// Truncated message from the last sync failure
    pub last_sync_error: Option<String>,

    /// Timestamp when historical backfill first started
    pub backfill_started_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when historical backfill completed
    pub backfill_completed_at: Option<DateTimeWithTimeZone>,

    /// Opaque pagination token; non-null only while sync_state = backfilling
    pub backfill_cursor: Option<String>,

    /// Free-form metadata bag (linking provenance, last sync metrics)
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Option<JsonValue>,

    /// User who created the binding (null for system-created bindings)
    pub created_by: Option<Uuid>,

    /// User who last updated the binding
    pub updated_by: Option<Uuid>,

    /// Timestamp when the binding was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the binding was last updated
    pub updated_at: DateTimeWithTimeZone,
}

/// Administrative status for a binding
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum BindingStatus {
    #[sea_orm(string_value = "active")]
    #[serde(rename = "active")]
    #[default]
    Active,

    #[sea_orm(string_value = "paused")]
    #[serde(rename = "paused")]
    Paused,

    #[sea_orm(string_value = "archived")]
    #[serde(rename = "archived")]
    Archived,
}

/// Operational sync lifecycle state for a binding
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SyncState {
    #[sea_orm(string_value = "pending_backfill")]
    #[serde(rename = "pending_backfill")]
    #[default]
    PendingBackfill,

    #[sea_orm(string_value = "backfilling")]
    #[serde(rename = "backfilling")]
    Backfilling,

    #[sea_orm(string_value = "active")]
    #[serde(rename = "active")]
    Active,

    #[sea_orm(string_value = "error")]
    #[serde(rename = "error")]
    Error,

    #[sea_orm(string_value = "paused")]
    #[serde(rename = "paused")]
    Paused,

    #[sea_orm(string_value = "archived")]
    #[serde(rename = "archived")]
    Archived,
}

/// Cached outcome of checking a remote alert id against the provider
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ValidationStatus {
    #[sea_orm(string_value = "valid")]
    #[serde(rename = "valid")]
    Valid,

    #[sea_orm(string_value = "invalid")]
    #[serde(rename = "invalid")]
    Invalid,

    #[sea_orm(string_value = "unknown")]
    #[serde(rename = "unknown")]
    #[default]
    Unknown,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::query_profile::Entity",
        from = "Column::ProfileId",
        to = "super::query_profile::Column::Id"
    )]
    QueryProfile,
}

impl Related<super::query_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QueryProfile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
