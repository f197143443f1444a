//! # QueryProfile Repository
//!
//! Repository operations for the query_profiles table. Profiles are the
//! named listening configurations that alert bindings hang off; they are
//! archived via status, never hard-deleted.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Error;
use crate::models::query_profile::{ActiveModel, Column, Entity, Model, ProfileStatus};

use super::{Actor, audit};

const RESOURCE_TYPE: &str = "query_profile";

/// Input for creating a query profile.
#[derive(Debug, Clone, Default)]
pub struct CreateQueryProfile {
    pub name: String,
    pub objective: Option<String>,
    pub query_text: String,
    pub sources: Option<JsonValue>,
    pub language: Option<String>,
    pub countries: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
}

/// Patch for updating a query profile. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateQueryProfile {
    pub name: Option<String>,
    pub objective: Option<Option<String>>,
    pub query_text: Option<String>,
    pub sources: Option<Option<JsonValue>>,
    pub language: Option<Option<String>>,
    pub countries: Option<Option<JsonValue>>,
    pub status: Option<ProfileStatus>,
    pub metadata: Option<Option<JsonValue>>,
}

impl UpdateQueryProfile {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.objective.is_none()
            && self.query_text.is_none()
            && self.sources.is_none()
            && self.language.is_none()
            && self.countries.is_none()
            && self.status.is_none()
            && self.metadata.is_none()
    }
}

/// Repository for query profile database operations
pub struct QueryProfileRepository {
    db: DatabaseConnection,
}

impl QueryProfileRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a profile together with its audit entry.
    pub async fn create(&self, actor: &Actor, input: CreateQueryProfile) -> Result<Model, Error> {
        let txn = self.db.begin().await?;
        let profile = Self::create_in(&txn, actor, input).await?;
        txn.commit().await?;

        tracing::info!(profile_id = %profile.id, name = %profile.name, "Query profile created");
        Ok(profile)
    }

    /// Create a profile on the caller's connection or transaction. Used by
    /// flows that create a profile and a binding atomically.
    pub async fn create_in<C: ConnectionTrait>(
        conn: &C,
        actor: &Actor,
        input: CreateQueryProfile,
    ) -> Result<Model, Error> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::validation("profile name must not be empty"));
        }
        let query_text = input.query_text.trim();
        if query_text.is_empty() {
            return Err(Error::validation("profile query text must not be empty"));
        }

        let now = Utc::now().fixed_offset();
        let profile = ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            objective: Set(input.objective),
            query_text: Set(query_text.to_string()),
            sources: Set(input.sources),
            language: Set(input.language),
            countries: Set(input.countries),
            status: Set(ProfileStatus::Active),
            metadata: Set(input.metadata),
            created_by: Set(actor.user_id),
            updated_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let profile = profile.insert(conn).await?;

        audit::append(
            conn,
            actor,
            "query_profile.create",
            RESOURCE_TYPE,
            profile.id,
            None,
            Some(serde_json::to_value(&profile).map_err(anyhow::Error::new)?),
        )
        .await?;

        Ok(profile)
    }

    /// Fetch one profile by id.
    pub async fn get(&self, profile_id: Uuid) -> Result<Model, Error> {
        Entity::find_by_id(profile_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("query profile"))
    }

    /// List profiles, optionally filtered by status, most recently updated
    /// first.
    pub async fn list(
        &self,
        status: Option<ProfileStatus>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Model>, Error> {
        let mut query = Entity::find().order_by_desc(Column::UpdatedAt);

        if let Some(status) = status {
            query = query.filter(Column::Status.eq(status));
        }

        let profiles = query.offset(offset).limit(limit).all(&self.db).await?;
        Ok(profiles)
    }

    /// Apply a patch to a profile. An empty patch is rejected as a conflict
    /// rather than silently bumping `updated_at`.
    pub async fn update(
        &self,
        actor: &Actor,
        profile_id: Uuid,
        patch: UpdateQueryProfile,
    ) -> Result<Model, Error> {
        if patch.is_empty() {
            return Err(Error::conflict("update contains no changes"));
        }

        let txn = self.db.begin().await?;

        let existing = Entity::find_by_id(profile_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("query profile"))?;
        let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;

        let mut active = existing.into_active_model();

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(Error::validation("profile name must not be empty"));
            }
            active.name = Set(name);
        }
        if let Some(query_text) = patch.query_text {
            let query_text = query_text.trim().to_string();
            if query_text.is_empty() {
                return Err(Error::validation("profile query text must not be empty"));
            }
            active.query_text = Set(query_text);
        }
        if let Some(objective) = patch.objective {
            active.objective = Set(objective);
        }
        if let Some(sources) = patch.sources {
            active.sources = Set(sources);
        }
        if let Some(language) = patch.language {
            active.language = Set(language);
        }
        if let Some(countries) = patch.countries {
            active.countries = Set(countries);
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(metadata) = patch.metadata {
            active.metadata = Set(metadata);
        }

        active.updated_by = Set(actor.user_id);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(&txn).await?;

        audit::append(
            &txn,
            actor,
            "query_profile.update",
            RESOURCE_TYPE,
            updated.id,
            Some(before),
            Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(profile_id = %updated.id, "Query profile updated");
        Ok(updated)
    }
}
