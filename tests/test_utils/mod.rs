//! Test utilities for database and provider testing.
//!
//! Provides an in-memory SQLite database with migrations applied, a
//! scriptable mock alert provider, and a recording content store.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use alertsync::ingest::{ContentStore, IngestError, IngestStats};
use alertsync::migration::{Migrator, MigratorTrait};
use alertsync::models::alert_binding::ValidationStatus;
use alertsync::provider::{
    AlertProvider, Mention, MentionPage, MentionQuery, ProviderError, RemoteAlert,
    ValidationOutcome,
};
use alertsync::repositories::query_profile::CreateQueryProfile;
use alertsync::repositories::{Actor, QueryProfileRepository};
use sea_orm::{Database, DatabaseConnection};

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Create a profile fixture and return its id.
pub async fn create_test_profile(db: &DatabaseConnection) -> Result<Uuid> {
    let repo = QueryProfileRepository::new(db.clone());
    let profile = repo
        .create(
            &Actor::system(),
            CreateQueryProfile {
                name: format!("Profile {}", Uuid::new_v4()),
                query_text: "brand OR product".to_string(),
                ..Default::default()
            },
        )
        .await?;
    Ok(profile.id)
}

/// A validation outcome for tests that skip the network entirely.
pub fn validation_unknown() -> ValidationOutcome {
    ValidationOutcome {
        status: ValidationStatus::Unknown,
        error: Some("no provider credential configured".to_string()),
        checked_at: None,
        alert: None,
        found: None,
    }
}

/// A validation outcome for an alert the provider confirmed.
pub fn validation_valid(remote_alert_id: &str) -> ValidationOutcome {
    ValidationOutcome {
        status: ValidationStatus::Valid,
        error: None,
        checked_at: Some(chrono::Utc::now().fixed_offset()),
        alert: Some(remote_alert(remote_alert_id, true)),
        found: Some(true),
    }
}

pub fn remote_alert(id: &str, is_active: bool) -> RemoteAlert {
    RemoteAlert {
        id: id.to_string(),
        name: format!("Alert {}", id),
        is_active,
        raw: serde_json::json!({"id": id}),
    }
}

pub fn mention(id: &str) -> Mention {
    Mention {
        id: id.to_string(),
        published_at: Some(chrono::Utc::now()),
        raw: serde_json::json!({"id": id}),
    }
}

pub fn page(mentions: Vec<Mention>, next_cursor: Option<&str>) -> MentionPage {
    MentionPage {
        mentions,
        next_cursor: next_cursor.map(str::to_string),
        has_more: next_cursor.is_some(),
    }
}

/// One scripted provider response for a mention fetch.
pub enum MockResponse {
    Page(MentionPage),
    Http(u16),
    Malformed,
}

/// Scriptable in-memory alert provider. Mention fetches pop scripted
/// responses per remote alert id; an exhausted script yields empty pages.
pub struct MockProvider {
    alerts: Vec<RemoteAlert>,
    scripts: Mutex<HashMap<String, VecDeque<MockResponse>>>,
    pub fetch_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(alerts: Vec<RemoteAlert>) -> Self {
        Self {
            alerts,
            scripts: Mutex::new(HashMap::new()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub async fn script(&self, remote_alert_id: &str, responses: Vec<MockResponse>) {
        self.scripts
            .lock()
            .await
            .insert(remote_alert_id.to_string(), responses.into_iter().collect());
    }
}

#[async_trait]
impl AlertProvider for MockProvider {
    async fn list_alerts(&self) -> Result<Vec<RemoteAlert>, ProviderError> {
        Ok(self.alerts.clone())
    }

    async fn fetch_mentions(&self, query: &MentionQuery) -> Result<MentionPage, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let mut scripts = self.scripts.lock().await;
        let response = scripts
            .get_mut(&query.remote_alert_id)
            .and_then(VecDeque::pop_front);

        match response {
            Some(MockResponse::Page(page)) => Ok(page),
            Some(MockResponse::Http(status)) => Err(ProviderError::Http {
                status,
                body: "scripted failure".to_string(),
            }),
            Some(MockResponse::Malformed) => {
                Err(ProviderError::Malformed("scripted failure".to_string()))
            }
            None => Ok(MentionPage::default()),
        }
    }
}

/// Content store that records every ingested page.
#[derive(Default)]
pub struct RecordingContentStore {
    pub ingested: Mutex<Vec<(Uuid, usize)>>,
}

#[async_trait]
impl ContentStore for RecordingContentStore {
    async fn ingest(&self, binding_id: Uuid, page: &MentionPage) -> Result<IngestStats, IngestError> {
        self.ingested
            .lock()
            .await
            .push((binding_id, page.mentions.len()));
        Ok(IngestStats {
            persisted: page.mentions.len() as u64,
            skipped: 0,
        })
    }
}

/// Test sync configuration: no throttling, small budgets.
pub fn test_config() -> Arc<alertsync::config::AppConfig> {
    let mut config = alertsync::config::AppConfig::default();
    config.sync.throttle_ms = 0;
    config.sync.pages_per_binding = 5;
    config.sync.max_attempts = 2;
    config.alert_cache_ttl_seconds = 60;
    Arc::new(config)
}
