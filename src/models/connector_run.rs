//! ConnectorRun entity model
//!
//! One row per provider-level sync invocation, with aggregate metrics and
//! latency recorded when the run finishes.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ConnectorRun entity representing one sync invocation
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "connector_runs")]
pub struct Model {
    /// Unique identifier for the run (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Connector grouping this run was scoped to, if any
    pub connector_id: Option<Uuid>,

    /// Current status of the run
    pub status: RunStatus,

    /// Timestamp when the run started
    pub started_at: DateTimeWithTimeZone,

    /// Timestamp when the run finished
    pub finished_at: Option<DateTimeWithTimeZone>,

    /// Number of bindings touched in this run
    pub bindings_processed: i32,

    /// Number of provider pages fetched in this run
    pub pages_fetched: i32,

    /// Number of candidates that failed in this run
    pub error_count: i32,

    /// Message from the last failing candidate, if any
    pub last_error: Option<String>,

    /// Wall-clock latency of the run in milliseconds
    pub latency_ms: Option<i64>,

    /// Timestamp when the run row was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the run row was last updated
    pub updated_at: DateTimeWithTimeZone,
}

/// Lifecycle status of a connector run
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum RunStatus {
    #[sea_orm(string_value = "running")]
    #[serde(rename = "running")]
    #[default]
    Running,

    #[sea_orm(string_value = "completed")]
    #[serde(rename = "completed")]
    Completed,

    #[sea_orm(string_value = "failed")]
    #[serde(rename = "failed")]
    Failed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
