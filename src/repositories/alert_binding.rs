//! # AlertBinding Repository
//!
//! Repository operations for the alert_bindings table and the binding state
//! machine. All state transitions funnel through this module so two
//! invariants hold everywhere: the operational sync state is always derived
//! from the administrative status, and the backfill cursor is non-null only
//! while a binding is actively backfilling.
//!
//! Remote identity validation is performed by callers before entering a
//! transaction; this module only records its outcome. Validation is soft and
//! never blocks a local write, with one exception: linking fails when the
//! provider was reachable and definitively reported the alert absent.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{Error, is_unique_violation};
use crate::models::alert_binding::{
    ActiveModel, BindingStatus, Column, Entity, Model, SyncState,
};
use crate::models::query_profile;
use crate::provider::ValidationOutcome;

use super::query_profile::{CreateQueryProfile, QueryProfileRepository};
use super::{Actor, audit};

const RESOURCE_TYPE: &str = "alert_binding";

/// Sync error messages are truncated before storage so one runaway provider
/// response cannot bloat the row.
pub const MAX_SYNC_ERROR_LEN: usize = 500;

/// Which synchronization pass a transition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Retrospective backfill over the historical window
    Historical,
    /// Forward-looking catch-up since the last completed sync
    Incremental,
}

/// Compute the operational sync state implied by an administrative status
/// change. Pausing and archiving mirror the status; reactivation resumes an
/// in-flight lifecycle where possible and otherwise restarts or continues
/// based on whether backfill ever completed.
pub fn derive_sync_state(
    current: SyncState,
    new_status: BindingStatus,
    has_completed_backfill: bool,
) -> SyncState {
    match new_status {
        BindingStatus::Paused => SyncState::Paused,
        BindingStatus::Archived => SyncState::Archived,
        BindingStatus::Active => match current {
            SyncState::PendingBackfill | SyncState::Backfilling | SyncState::Active => current,
            // A failed binding gets a clean restart on reactivation
            SyncState::Error => SyncState::PendingBackfill,
            SyncState::Paused | SyncState::Archived => {
                if has_completed_backfill {
                    SyncState::Active
                } else {
                    SyncState::PendingBackfill
                }
            }
        },
    }
}

/// Initial sync state for a freshly created binding.
fn initial_sync_state(status: BindingStatus) -> SyncState {
    match status {
        BindingStatus::Active => SyncState::PendingBackfill,
        BindingStatus::Paused => SyncState::Paused,
        BindingStatus::Archived => SyncState::Archived,
    }
}

/// Truncate a sync error message on a char boundary.
fn truncate_sync_error(message: &str) -> String {
    if message.chars().count() > MAX_SYNC_ERROR_LEN {
        message.chars().take(MAX_SYNC_ERROR_LEN).collect()
    } else {
        message.to_string()
    }
}

/// Merge sync metrics into a binding's metadata bag under a fixed key.
fn merge_sync_metrics(metadata: Option<JsonValue>, metrics: JsonValue) -> JsonValue {
    let mut bag = metadata.unwrap_or_else(|| serde_json::json!({}));
    if let Some(object) = bag.as_object_mut() {
        object.insert("last_sync_metrics".to_string(), metrics);
    }
    bag
}

/// Input for creating a binding.
#[derive(Debug, Clone)]
pub struct CreateBinding {
    pub profile_id: Uuid,
    pub connector_id: Option<Uuid>,
    pub remote_alert_id: String,
    /// Desired administrative status; defaults to active
    pub status: Option<BindingStatus>,
    pub metadata: Option<JsonValue>,
}

/// Patch for updating a binding. The outer `Option` means "change this
/// field"; the inner value is what to set (so `Some(None)` clears
/// `connector_id`).
#[derive(Debug, Clone, Default)]
pub struct UpdateBinding {
    pub connector_id: Option<Option<Uuid>>,
    /// Rebinding to a new remote identity resets all sync progress
    pub remote_alert_id: Option<String>,
    pub status: Option<BindingStatus>,
    /// Explicit sync state, overriding derivation from the status change
    pub sync_state: Option<SyncState>,
    pub metadata: Option<Option<JsonValue>>,
}

impl UpdateBinding {
    fn is_empty(&self) -> bool {
        self.connector_id.is_none()
            && self.remote_alert_id.is_none()
            && self.status.is_none()
            && self.sync_state.is_none()
            && self.metadata.is_none()
    }
}

/// Input for linking a remote alert, keyed by the remote identity alone.
#[derive(Debug, Clone, Default)]
pub struct LinkRemoteAlert {
    pub remote_alert_id: String,
    pub connector_id: Option<Uuid>,
    /// Name for the auto-created profile; falls back to the remote alert's
    /// name, then to a synthesized name
    pub alias: Option<String>,
    pub status: Option<BindingStatus>,
    pub metadata: Option<JsonValue>,
}

/// Partial row selected for sync candidate scheduling.
#[derive(Debug, Clone, FromQueryResult)]
pub struct SyncCandidate {
    pub id: Uuid,
    pub remote_alert_id: String,
    pub sync_state: SyncState,
    pub connector_id: Option<Uuid>,
    pub backfill_cursor: Option<String>,
    pub backfill_completed_at: Option<sea_orm::prelude::DateTimeWithTimeZone>,
    pub last_sync_at: Option<sea_orm::prelude::DateTimeWithTimeZone>,
}

/// Repository for alert binding database operations
pub struct AlertBindingRepository {
    db: DatabaseConnection,
}

impl AlertBindingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a binding, recording the supplied validation outcome. An
    /// invalid or unknown outcome does not block creation.
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateBinding,
        validation: &ValidationOutcome,
    ) -> Result<Model, Error> {
        let remote_alert_id = input.remote_alert_id.trim().to_string();
        if remote_alert_id.is_empty() {
            return Err(Error::validation("remote alert id must not be empty"));
        }

        let txn = self.db.begin().await?;

        let profile = query_profile::Entity::find_by_id(input.profile_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("query profile"))?;

        let status = input.status.unwrap_or_default();
        let now = Utc::now().fixed_offset();
        let binding = ActiveModel {
            id: Set(Uuid::new_v4()),
            profile_id: Set(profile.id),
            connector_id: Set(input.connector_id),
            remote_alert_id: Set(remote_alert_id.clone()),
            status: Set(status),
            sync_state: Set(initial_sync_state(status)),
            validation_status: Set(validation.status),
            last_validated_at: Set(validation.checked_at),
            last_validation_error: Set(validation.error.clone()),
            last_sync_at: Set(None),
            last_sync_error: Set(None),
            backfill_started_at: Set(None),
            backfill_completed_at: Set(None),
            backfill_cursor: Set(None),
            metadata: Set(input.metadata),
            created_by: Set(actor.user_id),
            updated_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let binding = binding.insert(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                Error::conflict(format!(
                    "remote alert '{}' is already bound",
                    remote_alert_id
                ))
            } else {
                e.into()
            }
        })?;

        audit::append(
            &txn,
            actor,
            "binding.create",
            RESOURCE_TYPE,
            binding.id,
            None,
            Some(serde_json::to_value(&binding).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(
            binding_id = %binding.id,
            profile_id = %binding.profile_id,
            remote_alert_id = %binding.remote_alert_id,
            validation_status = ?binding.validation_status,
            "Alert binding created"
        );
        Ok(binding)
    }

    /// Apply a patch. A status change recomputes the sync state unless one
    /// is supplied explicitly; rebinding to a new remote identity resets all
    /// sync progress and records the fresh validation outcome. A connector
    /// reassignment alone never touches sync progress.
    pub async fn update(
        &self,
        actor: &Actor,
        binding_id: Uuid,
        patch: UpdateBinding,
        validation: Option<&ValidationOutcome>,
    ) -> Result<Model, Error> {
        if patch.is_empty() {
            return Err(Error::conflict("update contains no changes"));
        }
        if let Some(remote_alert_id) = &patch.remote_alert_id {
            if remote_alert_id.trim().is_empty() {
                return Err(Error::validation("remote alert id must not be empty"));
            }
        }

        let txn = self.db.begin().await?;

        let existing = Entity::find_by_id(binding_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("alert binding"))?;
        let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;

        let current_state = existing.sync_state;
        let current_status = existing.status;
        let has_completed_backfill = existing.backfill_completed_at.is_some();
        let identity_changed = patch
            .remote_alert_id
            .as_deref()
            .map(str::trim)
            .is_some_and(|id| id != existing.remote_alert_id);

        let mut active = existing.into_active_model();

        if let Some(connector_id) = patch.connector_id {
            active.connector_id = Set(connector_id);
        }
        if let Some(metadata) = patch.metadata {
            active.metadata = Set(metadata);
        }

        let new_status = patch.status.unwrap_or(current_status);
        if patch.status.is_some() {
            active.status = Set(new_status);
        }

        let mut next_state = current_state;
        if identity_changed {
            // Sync history belongs to the old identity.
            let remote_alert_id = patch
                .remote_alert_id
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            active.remote_alert_id = Set(remote_alert_id);
            active.backfill_started_at = Set(None);
            active.backfill_completed_at = Set(None);
            active.last_sync_at = Set(None);
            active.last_sync_error = Set(None);
            next_state = initial_sync_state(new_status);

            if let Some(validation) = validation {
                active.validation_status = Set(validation.status);
                active.last_validated_at = Set(validation.checked_at);
                active.last_validation_error = Set(validation.error.clone());
            }
        } else if patch.status.is_some() {
            next_state = derive_sync_state(current_state, new_status, has_completed_backfill);
        }
        if let Some(explicit) = patch.sync_state {
            next_state = explicit;
        }

        if next_state != current_state || identity_changed {
            active.sync_state = Set(next_state);
        }
        if next_state != SyncState::Backfilling {
            active.backfill_cursor = Set(None);
        }

        active.updated_by = Set(actor.user_id);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                Error::conflict("remote alert is already bound")
            } else {
                e.into()
            }
        })?;

        audit::append(
            &txn,
            actor,
            "binding.update",
            RESOURCE_TYPE,
            updated.id,
            Some(before),
            Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(
            binding_id = %updated.id,
            status = ?updated.status,
            sync_state = ?updated.sync_state,
            "Alert binding updated"
        );
        Ok(updated)
    }

    /// Link a remote alert, keyed by the remote identity alone. When the
    /// alert is unbound this creates a query profile (named from the alias,
    /// the remote alert's name, or a synthesized fallback) and a binding in
    /// one transaction. When a binding already exists it is updated in place
    /// and its sync progress is reset, since re-linking implies the operator
    /// wants a clean resync. Fails only when the provider definitively
    /// reported the alert absent.
    pub async fn link_remote_alert(
        &self,
        actor: &Actor,
        input: LinkRemoteAlert,
        validation: &ValidationOutcome,
    ) -> Result<Model, Error> {
        let remote_alert_id = input.remote_alert_id.trim().to_string();
        if remote_alert_id.is_empty() {
            return Err(Error::validation("remote alert id must not be empty"));
        }
        if validation.definitely_absent() {
            return Err(Error::not_found(format!(
                "remote alert '{}'",
                remote_alert_id
            )));
        }

        let txn = self.db.begin().await?;

        let existing = Entity::find()
            .filter(Column::RemoteAlertId.eq(remote_alert_id.clone()))
            .one(&txn)
            .await?;

        let now = Utc::now().fixed_offset();
        let linked = match existing {
            Some(existing) => {
                let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;
                let status = input.status.unwrap_or(existing.status);
                let metadata = input.metadata.or(existing.metadata.clone());
                let mut active = existing.into_active_model();

                if let Some(connector_id) = input.connector_id {
                    active.connector_id = Set(Some(connector_id));
                }
                active.status = Set(status);
                active.metadata = Set(metadata);

                // Re-linking always restarts the sync lifecycle.
                active.sync_state = Set(initial_sync_state(status));
                active.backfill_started_at = Set(None);
                active.backfill_completed_at = Set(None);
                active.backfill_cursor = Set(None);
                active.last_sync_at = Set(None);
                active.last_sync_error = Set(None);

                active.validation_status = Set(validation.status);
                active.last_validated_at = Set(validation.checked_at);
                active.last_validation_error = Set(validation.error.clone());
                active.updated_by = Set(actor.user_id);
                active.updated_at = Set(now);

                let updated = active.update(&txn).await?;
                audit::append(
                    &txn,
                    actor,
                    "binding.link",
                    RESOURCE_TYPE,
                    updated.id,
                    Some(before),
                    Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
                )
                .await?;
                updated
            }
            None => {
                let name = input
                    .alias
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .or_else(|| validation.alert.as_ref().map(|a| a.name.clone()))
                    .unwrap_or_else(|| format!("remote-alert-{}", remote_alert_id));

                let profile = QueryProfileRepository::create_in(
                    &txn,
                    actor,
                    CreateQueryProfile {
                        name: name.clone(),
                        query_text: name,
                        ..Default::default()
                    },
                )
                .await?;

                // Linking provenance travels in the metadata bag.
                let metadata = match &validation.alert {
                    Some(alert) => {
                        let mut bag = input
                            .metadata
                            .unwrap_or_else(|| serde_json::json!({}));
                        if let Some(object) = bag.as_object_mut() {
                            object.insert(
                                "linked_alert_name".to_string(),
                                JsonValue::String(alert.name.clone()),
                            );
                        }
                        Some(bag)
                    }
                    None => input.metadata,
                };

                let status = input.status.unwrap_or_default();
                let binding = ActiveModel {
                    id: Set(Uuid::new_v4()),
                    profile_id: Set(profile.id),
                    connector_id: Set(input.connector_id),
                    remote_alert_id: Set(remote_alert_id.clone()),
                    status: Set(status),
                    sync_state: Set(initial_sync_state(status)),
                    validation_status: Set(validation.status),
                    last_validated_at: Set(validation.checked_at),
                    last_validation_error: Set(validation.error.clone()),
                    last_sync_at: Set(None),
                    last_sync_error: Set(None),
                    backfill_started_at: Set(None),
                    backfill_completed_at: Set(None),
                    backfill_cursor: Set(None),
                    metadata: Set(metadata),
                    created_by: Set(actor.user_id),
                    updated_by: Set(actor.user_id),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                let binding = binding.insert(&txn).await.map_err(|e| {
                    if is_unique_violation(&e) {
                        Error::conflict(format!(
                            "remote alert '{}' is already bound",
                            remote_alert_id
                        ))
                    } else {
                        e.into()
                    }
                })?;

                audit::append(
                    &txn,
                    actor,
                    "binding.link",
                    RESOURCE_TYPE,
                    binding.id,
                    None,
                    Some(serde_json::to_value(&binding).map_err(anyhow::Error::new)?),
                )
                .await?;
                binding
            }
        };

        txn.commit().await?;

        tracing::info!(
            binding_id = %linked.id,
            remote_alert_id = %linked.remote_alert_id,
            sync_state = ?linked.sync_state,
            "Remote alert linked"
        );
        Ok(linked)
    }

    /// Reset backfill progress so the next sync pass restarts the
    /// retrospective window from scratch. Only active bindings can be
    /// requeued.
    pub async fn requeue_backfill(&self, actor: &Actor, binding_id: Uuid) -> Result<Model, Error> {
        let txn = self.db.begin().await?;

        let existing = Entity::find_by_id(binding_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("alert binding"))?;

        if existing.status != BindingStatus::Active {
            return Err(Error::conflict(format!(
                "cannot requeue backfill for a {:?} binding",
                existing.status
            )));
        }

        let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;
        let mut active = existing.into_active_model();

        active.sync_state = Set(SyncState::PendingBackfill);
        active.backfill_started_at = Set(None);
        active.backfill_completed_at = Set(None);
        active.backfill_cursor = Set(None);
        active.last_sync_error = Set(None);
        active.updated_by = Set(actor.user_id);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(&txn).await?;

        audit::append(
            &txn,
            actor,
            "binding.requeue_backfill",
            RESOURCE_TYPE,
            updated.id,
            Some(before),
            Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(binding_id = %updated.id, "Backfill requeued");
        Ok(updated)
    }

    /// Record that a sync pass started. Historical passes move the binding
    /// into `backfilling`, stamping the start time only on first entry;
    /// incremental passes require an already-active binding. Both clear any
    /// prior sync error.
    pub async fn mark_sync_started(
        &self,
        actor: &Actor,
        binding_id: Uuid,
        mode: SyncMode,
    ) -> Result<Model, Error> {
        let txn = self.db.begin().await?;

        let existing = Entity::find_by_id(binding_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("alert binding"))?;

        if existing.status != BindingStatus::Active {
            return Err(Error::conflict(format!(
                "cannot sync a {:?} binding",
                existing.status
            )));
        }

        // Error is admissible in both modes: automated retry re-enters the
        // lifecycle based on whether a backfill ever completed.
        let allowed = match mode {
            SyncMode::Historical => matches!(
                existing.sync_state,
                SyncState::PendingBackfill | SyncState::Backfilling | SyncState::Error
            ),
            SyncMode::Incremental => matches!(
                existing.sync_state,
                SyncState::Active | SyncState::Error
            ),
        };
        if !allowed {
            return Err(Error::conflict(format!(
                "cannot start {:?} sync from state {:?}",
                mode, existing.sync_state
            )));
        }

        let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;
        let backfill_started_at = existing.backfill_started_at;
        let mut active = existing.into_active_model();

        let action = match mode {
            SyncMode::Historical => {
                active.sync_state = Set(SyncState::Backfilling);
                if backfill_started_at.is_none() {
                    active.backfill_started_at = Set(Some(Utc::now().fixed_offset()));
                }
                "binding.sync_started_historical"
            }
            SyncMode::Incremental => "binding.sync_started_incremental",
        };

        active.last_sync_error = Set(None);
        active.updated_by = Set(actor.user_id);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(&txn).await?;

        audit::append(
            &txn,
            actor,
            action,
            RESOURCE_TYPE,
            updated.id,
            Some(before),
            Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Persist backfill pagination progress so an interrupted run resumes
    /// where it stopped.
    pub async fn mark_historical_progress(
        &self,
        actor: &Actor,
        binding_id: Uuid,
        cursor: Option<String>,
        metrics: Option<JsonValue>,
    ) -> Result<Model, Error> {
        let txn = self.db.begin().await?;

        let existing = Entity::find_by_id(binding_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("alert binding"))?;

        if existing.sync_state != SyncState::Backfilling {
            return Err(Error::conflict(format!(
                "cannot record backfill progress in state {:?}",
                existing.sync_state
            )));
        }

        let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;
        let metadata = existing.metadata.clone();
        let mut active = existing.into_active_model();

        active.backfill_cursor = Set(cursor);
        if let Some(metrics) = metrics {
            active.metadata = Set(Some(merge_sync_metrics(metadata, metrics)));
        }
        active.updated_by = Set(actor.user_id);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(&txn).await?;

        audit::append(
            &txn,
            actor,
            "binding.sync_progress",
            RESOURCE_TYPE,
            updated.id,
            Some(before),
            Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Finish a historical backfill: the binding becomes active, the cursor
    /// is cleared, and the incremental watermark starts from now. Metrics
    /// are folded into the metadata bag.
    pub async fn mark_historical_completed(
        &self,
        actor: &Actor,
        binding_id: Uuid,
        metrics: Option<JsonValue>,
    ) -> Result<Model, Error> {
        let txn = self.db.begin().await?;

        let existing = Entity::find_by_id(binding_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("alert binding"))?;

        if existing.sync_state != SyncState::Backfilling {
            return Err(Error::conflict(format!(
                "cannot complete backfill from state {:?}",
                existing.sync_state
            )));
        }

        let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;
        let metadata = existing.metadata.clone();
        let mut active = existing.into_active_model();

        let now = Utc::now().fixed_offset();
        active.sync_state = Set(SyncState::Active);
        active.backfill_completed_at = Set(Some(now));
        active.backfill_cursor = Set(None);
        active.last_sync_at = Set(Some(now));
        active.last_sync_error = Set(None);
        if let Some(metrics) = metrics {
            active.metadata = Set(Some(merge_sync_metrics(metadata, metrics)));
        }
        active.updated_by = Set(actor.user_id);
        active.updated_at = Set(now);

        let updated = active.update(&txn).await?;

        audit::append(
            &txn,
            actor,
            "binding.backfill_completed",
            RESOURCE_TYPE,
            updated.id,
            Some(before),
            Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(binding_id = %updated.id, "Historical backfill completed");
        Ok(updated)
    }

    /// Finish an incremental pass: advance the watermark, clear any stale
    /// sync error, and fold metrics into the metadata bag.
    pub async fn mark_incremental_completed(
        &self,
        actor: &Actor,
        binding_id: Uuid,
        metrics: Option<JsonValue>,
    ) -> Result<Model, Error> {
        let txn = self.db.begin().await?;

        let existing = Entity::find_by_id(binding_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("alert binding"))?;

        let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;
        let status = existing.status;
        let metadata = existing.metadata.clone();
        let mut active = existing.into_active_model();

        let now = Utc::now().fixed_offset();
        if status == BindingStatus::Active {
            active.sync_state = Set(SyncState::Active);
            // A racing backfill may have left a cursor behind; active
            // bindings never carry one.
            active.backfill_cursor = Set(None);
        }
        active.last_sync_at = Set(Some(now));
        active.last_sync_error = Set(None);
        if let Some(metrics) = metrics {
            active.metadata = Set(Some(merge_sync_metrics(metadata, metrics)));
        }
        active.updated_by = Set(actor.user_id);
        active.updated_at = Set(now);

        let updated = active.update(&txn).await?;

        audit::append(
            &txn,
            actor,
            "binding.sync_completed",
            RESOURCE_TYPE,
            updated.id,
            Some(before),
            Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Record a sync failure: the binding moves to `error` with a truncated
    /// message, and its cursor is dropped so a requeue restarts cleanly.
    pub async fn mark_sync_failed(
        &self,
        actor: &Actor,
        binding_id: Uuid,
        mode: SyncMode,
        message: &str,
    ) -> Result<Model, Error> {
        let txn = self.db.begin().await?;

        let existing = Entity::find_by_id(binding_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("alert binding"))?;
        if existing.status != BindingStatus::Active {
            // Paused and archived bindings keep their mirrored sync state,
            // even when a pass that selected them earlier comes back failing.
            return Err(Error::conflict(
                "cannot record a sync failure for a non-active binding",
            ));
        }
        let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;
        let mut active = existing.into_active_model();

        active.sync_state = Set(SyncState::Error);
        active.backfill_cursor = Set(None);
        active.last_sync_error = Set(Some(truncate_sync_error(message)));
        active.updated_by = Set(actor.user_id);
        active.updated_at = Set(Utc::now().fixed_offset());

        let updated = active.update(&txn).await?;

        let action = match mode {
            SyncMode::Historical => "binding.sync_failed_historical",
            SyncMode::Incremental => "binding.sync_failed_incremental",
        };
        audit::append(
            &txn,
            actor,
            action,
            RESOURCE_TYPE,
            updated.id,
            Some(before),
            Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;

        tracing::warn!(
            binding_id = %updated.id,
            mode = ?mode,
            error = %updated.last_sync_error.as_deref().unwrap_or_default(),
            "Sync failed for binding"
        );
        Ok(updated)
    }

    /// Fetch one binding by id.
    pub async fn get(&self, binding_id: Uuid) -> Result<Model, Error> {
        Entity::find_by_id(binding_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("alert binding"))
    }

    /// Look up a binding by its remote alert identity.
    pub async fn find_by_remote_alert_id(
        &self,
        remote_alert_id: &str,
    ) -> Result<Option<Model>, Error> {
        let binding = Entity::find()
            .filter(Column::RemoteAlertId.eq(remote_alert_id))
            .one(&self.db)
            .await?;
        Ok(binding)
    }

    /// List bindings with optional filters, most recently updated first.
    pub async fn list(
        &self,
        profile_id: Option<Uuid>,
        status: Option<BindingStatus>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Model>, Error> {
        let mut query = Entity::find().order_by_desc(Column::UpdatedAt);

        if let Some(profile_id) = profile_id {
            query = query.filter(Column::ProfileId.eq(profile_id));
        }
        if let Some(status) = status {
            query = query.filter(Column::Status.eq(status));
        }

        let bindings = query.offset(offset).limit(limit).all(&self.db).await?;
        Ok(bindings)
    }

    /// All remote alert ids currently bound, for pick-list decoration.
    pub async fn bound_remote_alert_ids(&self) -> Result<Vec<String>, Error> {
        #[derive(FromQueryResult)]
        struct Row {
            remote_alert_id: String,
        }

        let rows = Entity::find()
            .select_only()
            .column(Column::RemoteAlertId)
            .into_model::<Row>()
            .all(&self.db)
            .await?;

        Ok(rows.into_iter().map(|r| r.remote_alert_id).collect())
    }

    /// Select bindings due for a sync pass: active bindings whose sync state
    /// is eligible, oldest-updated first so no binding starves.
    pub async fn list_sync_candidates(
        &self,
        limit: u64,
        connector_id: Option<Uuid>,
    ) -> Result<Vec<SyncCandidate>, Error> {
        let mut query = Entity::find()
            .select_only()
            .column(Column::Id)
            .column(Column::RemoteAlertId)
            .column(Column::SyncState)
            .column(Column::ConnectorId)
            .column(Column::BackfillCursor)
            .column(Column::BackfillCompletedAt)
            .column(Column::LastSyncAt)
            .filter(Column::Status.eq(BindingStatus::Active))
            .filter(Column::SyncState.is_in([
                SyncState::PendingBackfill,
                SyncState::Backfilling,
                SyncState::Active,
                SyncState::Error,
            ]))
            .order_by_asc(Column::UpdatedAt)
            .limit(limit);

        if let Some(connector_id) = connector_id {
            query = query.filter(Column::ConnectorId.eq(connector_id));
        }

        let candidates = query.into_model::<SyncCandidate>().all(&self.db).await?;
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_and_archive_mirror_status() {
        for current in [
            SyncState::PendingBackfill,
            SyncState::Backfilling,
            SyncState::Active,
            SyncState::Error,
        ] {
            assert_eq!(
                derive_sync_state(current, BindingStatus::Paused, false),
                SyncState::Paused
            );
            assert_eq!(
                derive_sync_state(current, BindingStatus::Archived, true),
                SyncState::Archived
            );
        }
    }

    #[test]
    fn test_activation_preserves_in_flight_states() {
        for current in [
            SyncState::PendingBackfill,
            SyncState::Backfilling,
            SyncState::Active,
        ] {
            assert_eq!(
                derive_sync_state(current, BindingStatus::Active, false),
                current
            );
        }
    }

    #[test]
    fn test_reactivation_restarts_failed_bindings() {
        assert_eq!(
            derive_sync_state(SyncState::Error, BindingStatus::Active, true),
            SyncState::PendingBackfill
        );
    }

    #[test]
    fn test_resume_depends_on_backfill_completion() {
        assert_eq!(
            derive_sync_state(SyncState::Paused, BindingStatus::Active, true),
            SyncState::Active
        );
        assert_eq!(
            derive_sync_state(SyncState::Paused, BindingStatus::Active, false),
            SyncState::PendingBackfill
        );
        assert_eq!(
            derive_sync_state(SyncState::Archived, BindingStatus::Active, true),
            SyncState::Active
        );
        assert_eq!(
            derive_sync_state(SyncState::Archived, BindingStatus::Active, false),
            SyncState::PendingBackfill
        );
    }

    #[test]
    fn test_initial_state_follows_status() {
        assert_eq!(
            initial_sync_state(BindingStatus::Active),
            SyncState::PendingBackfill
        );
        assert_eq!(initial_sync_state(BindingStatus::Paused), SyncState::Paused);
        assert_eq!(
            initial_sync_state(BindingStatus::Archived),
            SyncState::Archived
        );
    }

    #[test]
    fn test_truncate_sync_error_char_safe() {
        let short = "fetch failed";
        assert_eq!(truncate_sync_error(short), short);

        let long = "é".repeat(MAX_SYNC_ERROR_LEN + 50);
        let truncated = truncate_sync_error(&long);
        assert_eq!(truncated.chars().count(), MAX_SYNC_ERROR_LEN);
    }

    #[test]
    fn test_merge_sync_metrics_preserves_existing_keys() {
        let merged = merge_sync_metrics(
            Some(serde_json::json!({"linked_alert_name": "Brand"})),
            serde_json::json!({"pages": 3}),
        );
        assert_eq!(
            merged.get("linked_alert_name").and_then(|v| v.as_str()),
            Some("Brand")
        );
        assert_eq!(
            merged
                .get("last_sync_metrics")
                .and_then(|m| m.get("pages"))
                .and_then(|v| v.as_i64()),
            Some(3)
        );
    }

    #[test]
    fn test_empty_patch_detection() {
        assert!(UpdateBinding::default().is_empty());
        assert!(
            !UpdateBinding {
                connector_id: Some(None),
                ..Default::default()
            }
            .is_empty()
        );
    }
}
