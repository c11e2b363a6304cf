use std::sync::Arc;

use billport_core::{AppError, AppResult};
use billport_domain::{BillingDocument, Capability, DocumentId, Principal};

use crate::{DocumentQuery, DocumentRepository, PermissionGate, ScopeResolver};

/// Application service for scoped billing-document reads.
#[derive(Clone)]
pub struct DocumentService {
    gate: PermissionGate,
    scope_resolver: ScopeResolver,
    repository: Arc<dyn DocumentRepository>,
}

impl DocumentService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        gate: PermissionGate,
        scope_resolver: ScopeResolver,
        repository: Arc<dyn DocumentRepository>,
    ) -> Self {
        Self {
            gate,
            scope_resolver,
            repository,
        }
    }

    /// Lists the documents visible to the caller.
    pub async fn list_documents(
        &self,
        actor: &Principal,
        query: DocumentQuery,
    ) -> AppResult<Vec<BillingDocument>> {
        self.gate.require(actor, Capability::DocumentsView)?;

        let filter = self.scope_resolver.document_filter(actor).await?;
        self.repository.list_documents(&filter, query).await
    }

    /// Returns one document visible to the caller.
    ///
    /// A document outside the caller's scope surfaces as not found, exactly
    /// like a document that does not exist, so scope never leaks existence.
    pub async fn document(&self, actor: &Principal, id: DocumentId) -> AppResult<BillingDocument> {
        self.gate.require(actor, Capability::DocumentsView)?;

        let filter = self.scope_resolver.document_filter(actor).await?;
        let document = self.repository.find_document(id).await?;

        match document {
            Some(document) if filter.matches(document.company_id()) => Ok(document),
            _ => Err(AppError::NotFound(format!("document '{id}' not found"))),
        }
    }
}
