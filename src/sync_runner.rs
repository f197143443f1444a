//! # Sync Runner
//!
//! Orchestrates synchronization passes over alert bindings. Each connector
//! run selects a batch of eligible bindings, drives every binding through a
//! historical or incremental pass with bounded page budgets, and records the
//! outcome as a run row plus binding transitions. One failing binding never
//! aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use metrics::{counter, histogram};
use rand::Rng;
use sea_orm::DatabaseConnection;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::Error;
use crate::ingest::{ContentStore, IngestStats};
use crate::models::connector_run::RunStatus;
use crate::models::alert_binding as binding;
use crate::provider::{AlertDirectoryCache, AlertProvider, MentionPage, MentionQuery, validate_alert};
use crate::repositories::alert_binding::{
    CreateBinding, LinkRemoteAlert, SyncCandidate, SyncMode, UpdateBinding,
};
use crate::repositories::connector_run::RunMetrics;
use crate::repositories::{Actor, AlertBindingRepository, ConnectorRunRepository};

/// Outcome of one connector run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub bindings_processed: u64,
    pub pages_fetched: u64,
    pub error_count: u64,
    pub mentions_persisted: u64,
}

/// One remote alert decorated for the linking pick-list.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RemoteAlertListing {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    /// Whether a binding already claims this alert
    pub is_bound: bool,
}

struct CandidateOutcome {
    pages_fetched: u64,
    stats: IngestStats,
}

impl CandidateOutcome {
    /// Metrics snapshot stored on the binding's metadata bag at completion.
    fn metrics(&self) -> serde_json::Value {
        serde_json::json!({
            "pages_fetched": self.pages_fetched,
            "persisted": self.stats.persisted,
            "skipped": self.stats.skipped,
        })
    }
}

/// Sync orchestration service.
pub struct SyncRunner {
    config: Arc<AppConfig>,
    provider: Arc<dyn AlertProvider>,
    content: Arc<dyn ContentStore>,
    bindings: AlertBindingRepository,
    runs: ConnectorRunRepository,
    cache: AlertDirectoryCache,
}

impl SyncRunner {
    pub fn new(
        config: Arc<AppConfig>,
        db: DatabaseConnection,
        provider: Arc<dyn AlertProvider>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        let cache = AlertDirectoryCache::new(
            provider.clone(),
            Duration::from_secs(config.alert_cache_ttl_seconds),
        );
        Self {
            config,
            provider,
            content,
            bindings: AlertBindingRepository::new(db.clone()),
            runs: ConnectorRunRepository::new(db),
            cache,
        }
    }

    /// Run one sync pass, optionally scoped to a single connector grouping.
    #[instrument(skip(self))]
    pub async fn run_connector_sync(
        &self,
        connector_id: Option<Uuid>,
    ) -> Result<RunSummary, Error> {
        let actor = Actor::system();
        let started = Instant::now();
        let run = self.runs.start(connector_id).await?;

        let candidates = self
            .bindings
            .list_sync_candidates(self.config.sync.candidate_batch, connector_id)
            .await;

        let candidates = match candidates {
            Ok(candidates) => candidates,
            Err(err) => {
                // Run-level failure: close the row before propagating.
                self.runs
                    .complete(
                        &actor,
                        run.id,
                        RunStatus::Failed,
                        RunMetrics::default(),
                        Some(err.to_string()),
                    )
                    .await?;
                return Err(err);
            }
        };

        info!(
            run_id = %run.id,
            candidates = candidates.len(),
            connector_id = ?connector_id,
            "Starting connector sync"
        );

        let mut summary = RunSummary {
            run_id: run.id,
            bindings_processed: 0,
            pages_fetched: 0,
            error_count: 0,
            mentions_persisted: 0,
        };
        let mut last_error: Option<String> = None;

        for candidate in candidates {
            let binding_id = candidate.id;
            let mode = select_mode(&candidate);

            summary.bindings_processed += 1;
            match self.sync_candidate(&actor, &candidate, mode).await {
                Ok(outcome) => {
                    summary.pages_fetched += outcome.pages_fetched;
                    summary.mentions_persisted += outcome.stats.persisted;
                    counter!("alertsync_bindings_synced_total").increment(1);
                }
                Err(Error::Conflict(reason)) => {
                    // The binding was paused, archived, or re-linked between
                    // candidate selection and this pass. Not a failure.
                    debug!(
                        binding_id = %binding_id,
                        reason = %reason,
                        "Binding no longer eligible, skipping"
                    );
                    counter!("alertsync_sync_skipped_total").increment(1);
                }
                Err(err) => {
                    summary.error_count += 1;
                    let message = err.to_string();
                    counter!("alertsync_sync_failures_total").increment(1);
                    error!(
                        binding_id = %binding_id,
                        mode = ?mode,
                        error = %message,
                        "Binding sync failed"
                    );
                    if let Err(mark_err) = self
                        .bindings
                        .mark_sync_failed(&actor, binding_id, mode, &message)
                        .await
                    {
                        error!(
                            binding_id = %binding_id,
                            error = %mark_err,
                            "Failed to record binding sync failure"
                        );
                    }
                    last_error = Some(message);
                }
            }

            if self.config.sync.throttle_ms > 0 {
                sleep(Duration::from_millis(self.config.sync.throttle_ms)).await;
            }
        }

        let status = if summary.bindings_processed > 0
            && summary.error_count == summary.bindings_processed
        {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        self.runs
            .complete(
                &actor,
                run.id,
                status,
                RunMetrics {
                    bindings_processed: summary.bindings_processed as i32,
                    pages_fetched: summary.pages_fetched as i32,
                    error_count: summary.error_count as i32,
                },
                last_error,
            )
            .await?;

        histogram!("alertsync_run_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1_000.0);

        info!(
            run_id = %summary.run_id,
            bindings_processed = summary.bindings_processed,
            pages_fetched = summary.pages_fetched,
            errors = summary.error_count,
            mentions_persisted = summary.mentions_persisted,
            "Connector sync finished"
        );
        Ok(summary)
    }

    async fn sync_candidate(
        &self,
        actor: &Actor,
        candidate: &SyncCandidate,
        mode: SyncMode,
    ) -> Result<CandidateOutcome, Error> {
        self.bindings
            .mark_sync_started(actor, candidate.id, mode)
            .await?;

        match mode {
            SyncMode::Historical => self.run_historical(actor, candidate).await,
            SyncMode::Incremental => self.run_incremental(actor, candidate).await,
        }
    }

    /// Drive a historical backfill over the retrospective window, resuming
    /// from a persisted cursor and yielding after the page budget so one
    /// large alert cannot monopolize a run.
    async fn run_historical(
        &self,
        actor: &Actor,
        candidate: &SyncCandidate,
    ) -> Result<CandidateOutcome, Error> {
        let since =
            Utc::now() - ChronoDuration::days(self.config.sync.historical_lookback_days as i64);
        let mut cursor = candidate.backfill_cursor.clone();
        let mut outcome = CandidateOutcome {
            pages_fetched: 0,
            stats: IngestStats::default(),
        };

        for _ in 0..self.config.sync.pages_per_binding {
            let page = self
                .fetch_with_retry(&MentionQuery {
                    remote_alert_id: candidate.remote_alert_id.clone(),
                    since,
                    cursor: cursor.clone(),
                    page_size: self.config.provider_page_size,
                })
                .await?;

            outcome.pages_fetched += 1;
            counter!("alertsync_pages_fetched_total").increment(1);

            let stats = self
                .content
                .ingest(candidate.id, &page)
                .await
                .map_err(|e| Error::Internal(anyhow::Error::new(e)))?;
            outcome.stats.merge(stats);

            if page.has_more {
                cursor = page.next_cursor;
                self.bindings
                    .mark_historical_progress(
                        actor,
                        candidate.id,
                        cursor.clone(),
                        Some(outcome.metrics()),
                    )
                    .await?;
            } else {
                self.bindings
                    .mark_historical_completed(actor, candidate.id, Some(outcome.metrics()))
                    .await?;
                return Ok(outcome);
            }
        }

        // Budget exhausted with pages remaining; the binding stays in
        // backfilling with its cursor and resumes next run.
        debug!(
            binding_id = %candidate.id,
            pages = outcome.pages_fetched,
            "Backfill page budget exhausted, will resume"
        );
        Ok(outcome)
    }

    /// Catch up from the incremental watermark, falling back to the
    /// configured window for bindings that have never synced.
    async fn run_incremental(
        &self,
        actor: &Actor,
        candidate: &SyncCandidate,
    ) -> Result<CandidateOutcome, Error> {
        let fallback =
            Utc::now() - ChronoDuration::hours(self.config.sync.incremental_window_hours as i64);
        let since = candidate
            .last_sync_at
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(fallback);

        let mut cursor: Option<String> = None;
        let mut outcome = CandidateOutcome {
            pages_fetched: 0,
            stats: IngestStats::default(),
        };

        for _ in 0..self.config.sync.pages_per_binding {
            let page = self
                .fetch_with_retry(&MentionQuery {
                    remote_alert_id: candidate.remote_alert_id.clone(),
                    since,
                    cursor: cursor.clone(),
                    page_size: self.config.provider_page_size,
                })
                .await?;

            outcome.pages_fetched += 1;
            counter!("alertsync_pages_fetched_total").increment(1);

            let stats = self
                .content
                .ingest(candidate.id, &page)
                .await
                .map_err(|e| Error::Internal(anyhow::Error::new(e)))?;
            outcome.stats.merge(stats);

            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
        }

        self.bindings
            .mark_incremental_completed(actor, candidate.id, Some(outcome.metrics()))
            .await?;
        Ok(outcome)
    }

    /// Fetch one mention page, retrying transient provider failures with
    /// exponential backoff and jitter.
    async fn fetch_with_retry(&self, query: &MentionQuery) -> Result<MentionPage, Error> {
        let max_attempts = self.config.sync.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.provider.fetch_mentions(query).await {
                Ok(page) => return Ok(page),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let backoff = backoff_with_jitter(self.config.sync.throttle_ms, attempt);
                    warn!(
                        remote_alert_id = %query.remote_alert_id,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Retrying mention fetch"
                    );
                    counter!("alertsync_fetch_retries_total").increment(1);
                    sleep(backoff).await;
                }
                Err(err) => return Err(Error::provider(err.to_string())),
            }
        }
    }

    /// List remote alerts for the linking pick-list, each flagged with
    /// whether a binding already claims it. Served from the directory cache.
    pub async fn list_remote_alerts(
        &self,
        filter: Option<&str>,
        include_inactive: bool,
    ) -> Result<Vec<RemoteAlertListing>, Error> {
        let alerts = self
            .cache
            .get()
            .await
            .map_err(|e| Error::provider(e.to_string()))?;

        let bound: std::collections::HashSet<String> = self
            .bindings
            .bound_remote_alert_ids()
            .await?
            .into_iter()
            .collect();

        let needle = filter.map(str::to_lowercase);
        let listings = alerts
            .into_iter()
            .filter(|alert| include_inactive || alert.is_active)
            .filter(|alert| match &needle {
                Some(needle) => {
                    alert.name.to_lowercase().contains(needle)
                        || alert.id.to_lowercase().contains(needle)
                }
                None => true,
            })
            .map(|alert| RemoteAlertListing {
                is_bound: bound.contains(&alert.id),
                id: alert.id,
                name: alert.name,
                is_active: alert.is_active,
            })
            .collect();

        Ok(listings)
    }

    /// Drop the cached alert directory so the next pick-list read refetches.
    pub async fn invalidate_alert_cache(&self) {
        self.cache.invalidate().await;
    }

    /// Validate the remote identity against the provider, then create the
    /// binding with the outcome. The provider call happens before the store
    /// transaction opens.
    pub async fn create_binding(
        &self,
        actor: &Actor,
        input: CreateBinding,
    ) -> Result<binding::Model, Error> {
        let validation = validate_alert(self.provider.as_ref(), &input.remote_alert_id).await;
        self.bindings.create(actor, input, &validation).await
    }

    /// Apply a patch, re-validating against the provider only when the
    /// remote identity changes.
    pub async fn update_binding(
        &self,
        actor: &Actor,
        binding_id: Uuid,
        patch: UpdateBinding,
    ) -> Result<binding::Model, Error> {
        let validation = match patch.remote_alert_id.as_deref() {
            Some(remote_alert_id) => {
                Some(validate_alert(self.provider.as_ref(), remote_alert_id).await)
            }
            None => None,
        };
        self.bindings
            .update(actor, binding_id, patch, validation.as_ref())
            .await
    }

    /// Validate, then link the remote alert (creating a profile and binding
    /// for a fresh identity, resetting sync progress for a known one).
    pub async fn link_remote_alert(
        &self,
        actor: &Actor,
        input: LinkRemoteAlert,
    ) -> Result<binding::Model, Error> {
        let validation = validate_alert(self.provider.as_ref(), &input.remote_alert_id).await;
        self.bindings
            .link_remote_alert(actor, input, &validation)
            .await
    }

    /// Run the periodic sync loop until the shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run_scheduler(&self, shutdown: CancellationToken) {
        info!(
            tick_interval_seconds = self.config.scheduler.tick_interval_seconds,
            "Starting sync scheduler"
        );
        let tick_interval = Duration::from_secs(self.config.scheduler.tick_interval_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sync scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = Instant::now();
                    if let Err(err) = self.run_connector_sync(None).await {
                        error!(error = %err, "Scheduled sync pass failed");
                    }
                    histogram!("alertsync_scheduler_tick_duration_ms")
                        .record(tick_started.elapsed().as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Sync scheduler stopped");
    }
}

/// Pick the sync mode for a candidate. Failed bindings retry in whichever
/// mode matches how far they got: incremental if a backfill ever completed,
/// historical otherwise.
fn select_mode(candidate: &SyncCandidate) -> SyncMode {
    use crate::models::alert_binding::SyncState;

    match candidate.sync_state {
        SyncState::Active => SyncMode::Incremental,
        SyncState::Error if candidate.backfill_completed_at.is_some() => SyncMode::Incremental,
        _ => SyncMode::Historical,
    }
}

fn backoff_with_jitter(base_ms: u64, attempt: u32) -> Duration {
    let base = base_ms.max(50);
    let exp = base.saturating_mul(1u64 << attempt.min(8));
    let jitter = rand::thread_rng().gen_range(0..=base);
    Duration::from_millis(exp + jitter)
}
