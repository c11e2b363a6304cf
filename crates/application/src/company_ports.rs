use async_trait::async_trait;

use billport_core::AppResult;
use billport_domain::{Company, CompanyId, CompanyKind, DocumentFilter};

/// Input payload for creating companies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCompanyInput {
    /// Display name.
    pub name: String,
    /// Structural kind.
    pub kind: CompanyKind,
    /// Parent company for subsidiaries and branches.
    pub parent_id: Option<CompanyId>,
    /// Optional external reference number.
    pub reference: Option<String>,
    /// Whether document notifications are emailed to company contacts.
    pub notify_by_email: bool,
}

/// Port for company storage.
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Finds one company by id.
    async fn find_company(&self, id: CompanyId) -> AppResult<Option<Company>>;

    /// Lists the direct children of a parent company.
    async fn list_children(&self, parent_id: CompanyId) -> AppResult<Vec<Company>>;

    /// Lists every company; the hierarchy snapshot source.
    async fn list_companies(&self) -> AppResult<Vec<Company>>;

    /// Counts companies matching the scoping filter.
    async fn count_companies(&self, filter: &DocumentFilter) -> AppResult<u64>;

    /// Persists a new company.
    async fn insert_company(&self, company: &Company) -> AppResult<()>;

    /// Moves a company under a new parent.
    async fn update_parent(&self, id: CompanyId, parent_id: CompanyId) -> AppResult<()>;

    /// Sets the active flag of a company.
    async fn set_company_active(&self, id: CompanyId, active: bool) -> AppResult<()>;

    /// Removes a company. Children keep their stored parent id.
    async fn delete_company(&self, id: CompanyId) -> AppResult<()>;
}
