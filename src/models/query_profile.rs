//! QueryProfile entity model
//!
//! This module contains the SeaORM entity model for the query_profiles table,
//! the named listening configuration that alert bindings belong to.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// QueryProfile entity representing a named listening configuration
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "query_profiles")]
pub struct Model {
    /// Unique identifier for the profile (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name of the profile
    pub name: String,

    /// Free-text objective describing why this profile exists
    pub objective: Option<String>,

    /// Query text submitted to the listening provider
    pub query_text: String,

    /// Source filter list (stored as JSON array)
    #[sea_orm(column_type = "JsonBinary")]
    pub sources: Option<JsonValue>,

    /// Language filter (optional)
    pub language: Option<String>,

    /// Country filter list (stored as JSON array)
    #[sea_orm(column_type = "JsonBinary")]
    pub countries: Option<JsonValue>,

    /// Administrative status of the profile
    pub status: ProfileStatus,

    /// Free-form metadata bag
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Option<JsonValue>,

    /// User who created the profile (null for system-created profiles)
    pub created_by: Option<Uuid>,

    /// User who last updated the profile
    pub updated_by: Option<Uuid>,

    /// Timestamp when the profile was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the profile was last updated
    pub updated_at: DateTimeWithTimeZone,
}

/// Administrative status for a query profile. Profiles are archived via
/// status, never hard-deleted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ProfileStatus {
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::alert_binding::Entity")]
    AlertBinding,
}

impl Related<super::alert_binding::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AlertBinding.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
