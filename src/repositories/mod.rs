//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for the engine's entities. Every mutation runs inside one
//! transaction together with the audit entry that describes it, so a row can
//! never change without a matching audit record.

pub mod alert_binding;
pub mod audit;
pub mod connector_run;
pub mod query_profile;

pub use alert_binding::AlertBindingRepository;
pub use audit::AuditRepository;
pub use connector_run::ConnectorRunRepository;
pub use query_profile::QueryProfileRepository;

use uuid::Uuid;

/// Identity under which a mutation is performed, captured into audit entries.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    /// Acting user; `None` for scheduler-driven transitions
    pub user_id: Option<Uuid>,
    /// Client request id, when the mutation traces back to a request
    pub request_id: Option<String>,
}

impl Actor {
    /// Actor for system-triggered mutations (scheduler, sync runner).
    pub fn system() -> Self {
        Self::default()
    }

    /// Actor for a user-initiated mutation.
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            request_id: None,
        }
    }

    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}
