//! # Audit Repository
//!
//! Append-only audit trail. [`append`] is generic over the connection so it
//! joins the caller's transaction: if the mutation rolls back, so does the
//! audit entry.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Error;
use crate::models::audit_entry::{ActiveModel, Column, Entity, Model};

use super::Actor;

/// Write one audit entry on the caller's connection or transaction.
pub async fn append<C: ConnectionTrait>(
    conn: &C,
    actor: &Actor,
    action: &str,
    resource_type: &str,
    resource_id: Uuid,
    snapshot_before: Option<JsonValue>,
    snapshot_after: Option<JsonValue>,
) -> Result<Model, Error> {
    let entry = ActiveModel {
        id: Set(Uuid::new_v4()),
        actor_user_id: Set(actor.user_id),
        action: Set(action.to_string()),
        resource_type: Set(resource_type.to_string()),
        resource_id: Set(resource_id),
        request_id: Set(actor.request_id.clone()),
        snapshot_before: Set(snapshot_before),
        snapshot_after: Set(snapshot_after),
        created_at: Set(Utc::now().fixed_offset()),
    };

    let result = entry.insert(conn).await?;

    tracing::debug!(
        action = %result.action,
        resource_type = %result.resource_type,
        resource_id = %result.resource_id,
        "Audit entry written"
    );

    Ok(result)
}

/// Repository for reading the audit trail.
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// List entries for one resource, newest first.
    pub async fn list_for_resource(
        &self,
        resource_type: &str,
        resource_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Model>, Error> {
        let entries = Entity::find()
            .filter(Column::ResourceType.eq(resource_type))
            .filter(Column::ResourceId.eq(resource_id))
            .order_by_desc(Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(entries)
    }
}
