//! # ConnectorRun Repository
//!
//! Run history for provider-level sync invocations. A row is opened when a
//! run starts and closed with aggregate metrics when it finishes, giving
//! operators a durable record alongside the live metrics.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::error::Error;
use crate::models::connector_run::{ActiveModel, Column, Entity, Model, RunStatus};

use super::{Actor, audit};

const RESOURCE_TYPE: &str = "connector_run";

/// Aggregate metrics recorded when a run finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunMetrics {
    pub bindings_processed: i32,
    pub pages_fetched: i32,
    pub error_count: i32,
}

/// Repository for connector run database operations
pub struct ConnectorRunRepository {
    db: DatabaseConnection,
}

impl ConnectorRunRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open a run row in `running` state.
    pub async fn start(&self, connector_id: Option<Uuid>) -> Result<Model, Error> {
        let now = Utc::now().fixed_offset();
        let run = ActiveModel {
            id: Set(Uuid::new_v4()),
            connector_id: Set(connector_id),
            status: Set(RunStatus::Running),
            started_at: Set(now),
            finished_at: Set(None),
            bindings_processed: Set(0),
            pages_fetched: Set(0),
            error_count: Set(0),
            last_error: Set(None),
            latency_ms: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let run = run.insert(&self.db).await?;
        tracing::info!(run_id = %run.id, connector_id = ?connector_id, "Connector run started");
        Ok(run)
    }

    /// Close a run with its final status and metrics.
    pub async fn complete(
        &self,
        actor: &Actor,
        run_id: Uuid,
        status: RunStatus,
        metrics: RunMetrics,
        last_error: Option<String>,
    ) -> Result<Model, Error> {
        let txn = self.db.begin().await?;

        let existing = Entity::find_by_id(run_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("connector run"))?;

        if existing.status != RunStatus::Running {
            return Err(Error::conflict(format!(
                "connector run is already {:?}",
                existing.status
            )));
        }

        let before = serde_json::to_value(&existing).map_err(anyhow::Error::new)?;
        let started_at = existing.started_at;
        let mut active = existing.into_active_model();

        let now = Utc::now().fixed_offset();
        let latency_ms = (now - started_at).num_milliseconds();

        active.status = Set(status);
        active.finished_at = Set(Some(now));
        active.bindings_processed = Set(metrics.bindings_processed);
        active.pages_fetched = Set(metrics.pages_fetched);
        active.error_count = Set(metrics.error_count);
        active.last_error = Set(last_error);
        active.latency_ms = Set(Some(latency_ms));
        active.updated_at = Set(now);

        let updated = active.update(&txn).await?;

        audit::append(
            &txn,
            actor,
            "connector_run.finished",
            RESOURCE_TYPE,
            updated.id,
            Some(before),
            Some(serde_json::to_value(&updated).map_err(anyhow::Error::new)?),
        )
        .await?;

        txn.commit().await?;

        tracing::info!(
            run_id = %updated.id,
            status = ?updated.status,
            bindings_processed = updated.bindings_processed,
            pages_fetched = updated.pages_fetched,
            error_count = updated.error_count,
            latency_ms = latency_ms,
            "Connector run finished"
        );
        Ok(updated)
    }

    /// Fetch one run by id.
    pub async fn get(&self, run_id: Uuid) -> Result<Model, Error> {
        Entity::find_by_id(run_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::not_found("connector run"))
    }

    /// List recent runs, newest first, optionally scoped to one connector.
    pub async fn list_recent(
        &self,
        connector_id: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<Model>, Error> {
        let mut query = Entity::find()
            .order_by_desc(Column::StartedAt)
            .limit(limit);

        if let Some(connector_id) = connector_id {
            query = query.filter(Column::ConnectorId.eq(connector_id));
        }

        let runs = query.all(&self.db).await?;
        Ok(runs)
    }
}
