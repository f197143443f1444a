//! Remote alert provider interface
//!
//! Defines the collaborator interface the engine uses to talk to the social
//! listening provider: listing alert definitions for identity validation and
//! fetching mention pages for synchronization. The HTTP implementation lives
//! in [`http`]; [`cache`] provides the injected directory cache and
//! [`validation`] the per-id validation protocol.

pub mod cache;
pub mod http;
pub mod validation;

pub use cache::AlertDirectoryCache;
pub use http::HttpAlertProvider;
pub use validation::{ValidationOutcome, validate_alert};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One alert definition at the remote provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAlert {
    /// Provider-side identity of the alert
    pub id: String,
    /// Display name at the provider
    pub name: String,
    /// Whether the alert is currently enabled at the provider
    pub is_active: bool,
    /// Raw provider payload for provenance
    pub raw: JsonValue,
}

/// One mention (piece of content) returned by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    /// Provider-side identity of the mention
    pub id: String,
    /// Publication timestamp, when the provider supplies one
    pub published_at: Option<DateTime<Utc>>,
    /// Raw provider payload
    pub raw: JsonValue,
}

/// One page of mentions plus pagination state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MentionPage {
    pub mentions: Vec<Mention>,
    /// Opaque token for the next page, if any
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Parameters for a mention fetch.
#[derive(Debug, Clone)]
pub struct MentionQuery {
    /// Remote alert to fetch content for
    pub remote_alert_id: String,
    /// Lower bound of the retrospective window
    pub since: DateTime<Utc>,
    /// Opaque cursor from a previous page, if resuming
    pub cursor: Option<String>,
    /// Page size hint
    pub page_size: u32,
}

/// Errors surfaced by a remote alert provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No API credential is configured; treated as a soft failure by
    /// validation and never blocks a local write
    #[error("no provider credential configured")]
    MissingCredential,

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether a retry of the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::MissingCredential => false,
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Network(_) => true,
            ProviderError::Malformed(_) => false,
        }
    }
}

/// Collaborator interface to the social listening provider.
#[async_trait]
pub trait AlertProvider: Send + Sync {
    /// List all alert definitions, paginating internally and returning a
    /// flat, deduplicated list.
    async fn list_alerts(&self) -> Result<Vec<RemoteAlert>, ProviderError>;

    /// Fetch one page of mentions for an alert within a retrospective window.
    async fn fetch_mentions(&self, query: &MentionQuery) -> Result<MentionPage, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(!ProviderError::MissingCredential.is_retryable());
        assert!(!ProviderError::Malformed("bad json".into()).is_retryable());
        assert!(
            ProviderError::Http {
                status: 429,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            ProviderError::Http {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ProviderError::Http {
                status: 404,
                body: String::new()
            }
            .is_retryable()
        );
    }
}
