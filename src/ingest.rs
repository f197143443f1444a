//! Content ingestion collaborator interface
//!
//! The engine hands every fetched mention page to a [`ContentStore`] and
//! folds the returned counts into sync metrics. Implementations must be
//! idempotent: ingesting overlapping pages twice may not duplicate content.

use async_trait::async_trait;
use uuid::Uuid;

use crate::provider::MentionPage;

/// Counts returned by one ingestion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IngestStats {
    /// Mentions newly persisted by this call
    pub persisted: u64,
    /// Mentions skipped as duplicates of already-stored content
    pub skipped: u64,
}

impl IngestStats {
    pub fn merge(&mut self, other: IngestStats) {
        self.persisted += other.persisted;
        self.skipped += other.skipped;
    }
}

/// Errors surfaced by a content store.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("content store error: {0}")]
    Store(String),
}

/// Collaborator that persists fetched mention pages.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist one page of mentions for a binding. Must be safe to call
    /// twice with overlapping data.
    async fn ingest(&self, binding_id: Uuid, page: &MentionPage) -> Result<IngestStats, IngestError>;
}

/// Stand-in store used when the real ingestion pipeline is wired externally.
/// Logs page sizes and reports everything as skipped.
#[derive(Debug, Default)]
pub struct NullContentStore;

#[async_trait]
impl ContentStore for NullContentStore {
    async fn ingest(&self, binding_id: Uuid, page: &MentionPage) -> Result<IngestStats, IngestError> {
        tracing::debug!(
            binding_id = %binding_id,
            mentions = page.mentions.len(),
            "Discarding mention page (no content store configured)"
        );
        Ok(IngestStats {
            persisted: 0,
            skipped: page.mentions.len() as u64,
        })
    }
}
