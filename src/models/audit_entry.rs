//! AuditEntry entity model
//!
//! Append-only record of every mutation to query profiles and alert
//! bindings. Rows are inserted in the same transaction as the mutation they
//! describe and are never updated or deleted.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// AuditEntry entity recording one successful mutation
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_entries")]
pub struct Model {
    /// Unique identifier for the entry (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Acting user; null for system-triggered transitions
    pub actor_user_id: Option<Uuid>,

    /// Action name, e.g. `binding.create` or `binding.sync_failed_historical`
    pub action: String,

    /// Mutated resource type (`query_profile`, `alert_binding`, `connector_run`)
    pub resource_type: String,

    /// Id of the mutated row
    pub resource_id: Uuid,

    /// Client-visible request id for correlating effects with a request
    pub request_id: Option<String>,

    /// Row snapshot before the mutation (null for creates)
    #[sea_orm(column_type = "JsonBinary")]
    pub snapshot_before: Option<JsonValue>,

    /// Row snapshot after the mutation
    #[sea_orm(column_type = "JsonBinary")]
    pub snapshot_after: Option<JsonValue>,

    /// Timestamp when the entry was written
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
