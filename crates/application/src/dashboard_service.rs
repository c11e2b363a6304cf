use std::sync::Arc;

use serde::Serialize;

use billport_core::AppResult;
use billport_domain::{Capability, DocumentKind, Principal};

use crate::{
    CompanyRepository, DocumentRepository, PermissionGate, ScopeResolver, UserRepository,
};

/// Aggregated dashboard statistics scoped to the caller.
///
/// The company and user counts are capability-gated: a caller without the
/// matching view capability receives an absent value, never zero, so "no
/// items" and "no permission" stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardStatistics {
    /// Invoices visible to the caller.
    pub invoice_count: u64,
    /// Credit notes visible to the caller.
    pub credit_note_count: u64,
    /// Statements visible to the caller.
    pub statement_count: u64,
    /// Companies visible to the caller.
    pub company_count: Option<u64>,
    /// Users visible to the caller.
    pub user_count: Option<u64>,
}

/// Application service for the dashboard statistics read path.
#[derive(Clone)]
pub struct DashboardService {
    gate: PermissionGate,
    scope_resolver: ScopeResolver,
    document_repository: Arc<dyn DocumentRepository>,
    company_repository: Arc<dyn CompanyRepository>,
    user_repository: Arc<dyn UserRepository>,
}

impl DashboardService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        gate: PermissionGate,
        scope_resolver: ScopeResolver,
        document_repository: Arc<dyn DocumentRepository>,
        company_repository: Arc<dyn CompanyRepository>,
        user_repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            gate,
            scope_resolver,
            document_repository,
            company_repository,
            user_repository,
        }
    }

    /// Computes scoped dashboard statistics for the caller.
    pub async fn statistics(&self, actor: &Principal) -> AppResult<DashboardStatistics> {
        self.gate.require(actor, Capability::DashboardView)?;

        let filter = self.scope_resolver.document_filter(actor).await?;

        let invoice_count = self
            .document_repository
            .count_documents(&filter, DocumentKind::Invoice)
            .await?;
        let credit_note_count = self
            .document_repository
            .count_documents(&filter, DocumentKind::CreditNote)
            .await?;
        let statement_count = self
            .document_repository
            .count_documents(&filter, DocumentKind::Statement)
            .await?;

        let company_count = if self.gate.allows(actor, Capability::CompaniesView)? {
            Some(self.company_repository.count_companies(&filter).await?)
        } else {
            None
        };

        let user_count = if self.gate.allows(actor, Capability::UsersView)? {
            Some(self.user_repository.count_users(&filter).await?)
        } else {
            None
        };

        Ok(DashboardStatistics {
            invoice_count,
            credit_note_count,
            statement_count,
            company_count,
            user_count,
        })
    }
}
