use async_trait::async_trait;

use billport_core::AppResult;
use billport_domain::{AuditAction, UserId};

/// Structured audit event appended after administrative mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Acting user.
    pub actor: UserId,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Resource type the action touched.
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
    /// Optional human-readable detail.
    pub detail: Option<String>,
}

/// Port for appending audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
