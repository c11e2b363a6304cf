use std::collections::BTreeSet;
use std::sync::Arc;

use billport_core::AppResult;
use billport_domain::{
    AccessibleCompanySet, CompanyTree, DocumentFilter, Principal, resolve_scope,
};

use crate::CompanyRepository;

/// Computes the accessible-company set for a principal on demand.
///
/// Results are never cached or persisted; every resolution loads a fresh
/// hierarchy snapshot, so role, assignment, and re-parenting changes take
/// effect on the next request. Unrestricted roles resolve without touching
/// storage at all.
#[derive(Clone)]
pub struct ScopeResolver {
    companies: Arc<dyn CompanyRepository>,
}

impl ScopeResolver {
    /// Creates a resolver over the company storage port.
    #[must_use]
    pub fn new(companies: Arc<dyn CompanyRepository>) -> Self {
        Self { companies }
    }

    /// Resolves the accessible-company set for the principal.
    pub async fn resolve(&self, principal: &Principal) -> AppResult<AccessibleCompanySet> {
        if principal.role().has_unrestricted_scope() {
            return Ok(AccessibleCompanySet::Unrestricted);
        }

        if principal.assigned_companies().is_empty() {
            return Ok(AccessibleCompanySet::Companies(BTreeSet::new()));
        }

        let tree = CompanyTree::new(self.companies.list_companies().await?)?;
        Ok(resolve_scope(principal, &tree))
    }

    /// Resolves the scope and converts it into a storage predicate.
    pub async fn document_filter(&self, principal: &Principal) -> AppResult<DocumentFilter> {
        Ok(DocumentFilter::from_scope(self.resolve(principal).await?))
    }
}
