//! In-memory adapter implementing every storage port.
//!
//! Backs the engine in tests and embedded setups without a database; the
//! scoping filters are evaluated with the same semantics the PostgreSQL
//! adapters express in SQL.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use billport_application::{
    AuditEvent, AuditRepository, CompanyRepository, DocumentQuery, DocumentRepository,
    UserRepository,
};
use billport_core::{AppError, AppResult};
use billport_domain::{
    BillingDocument, Company, CompanyId, DocumentFilter, DocumentId, DocumentKind, EmailAddress,
    PortalUser, Role, UserId,
};

#[derive(Default)]
struct StoreState {
    companies: BTreeMap<CompanyId, Company>,
    users: BTreeMap<UserId, PortalUser>,
    documents: BTreeMap<DocumentId, BillingDocument>,
    audit_events: Vec<AuditEvent>,
}

/// In-memory store for companies, users, documents, and audit events.
#[derive(Clone, Default)]
pub struct InMemoryPortalStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryPortalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a billing document directly, for seeding.
    pub async fn seed_document(&self, document: BillingDocument) {
        self.state
            .write()
            .await
            .documents
            .insert(document.id(), document);
    }

    /// Returns the audit events appended so far.
    pub async fn audit_events(&self) -> Vec<AuditEvent> {
        self.state.read().await.audit_events.clone()
    }
}

#[async_trait]
impl CompanyRepository for InMemoryPortalStore {
    async fn find_company(&self, id: CompanyId) -> AppResult<Option<Company>> {
        Ok(self.state.read().await.companies.get(&id).cloned())
    }

    async fn list_children(&self, parent_id: CompanyId) -> AppResult<Vec<Company>> {
        Ok(self
            .state
            .read()
            .await
            .companies
            .values()
            .filter(|company| company.parent_id() == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn list_companies(&self) -> AppResult<Vec<Company>> {
        Ok(self.state.read().await.companies.values().cloned().collect())
    }

    async fn count_companies(&self, filter: &DocumentFilter) -> AppResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .companies
            .keys()
            .filter(|id| filter.matches(**id))
            .count() as u64)
    }

    async fn insert_company(&self, company: &Company) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.companies.contains_key(&company.id()) {
            return Err(AppError::Conflict(format!(
                "company '{}' already exists",
                company.id()
            )));
        }
        state.companies.insert(company.id(), company.clone());
        Ok(())
    }

    async fn update_parent(&self, id: CompanyId, parent_id: CompanyId) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(stored) = state.companies.get(&id) else {
            return Err(AppError::NotFound(format!("company '{id}' not found")));
        };
        let updated = Company::new(
            stored.id(),
            stored.name().as_str(),
            stored.kind(),
            Some(parent_id),
            stored.is_active(),
            stored.reference().map(str::to_owned),
            stored.notify_by_email(),
        )?;
        state.companies.insert(id, updated);
        Ok(())
    }

    async fn set_company_active(&self, id: CompanyId, active: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(stored) = state.companies.get(&id) else {
            return Err(AppError::NotFound(format!("company '{id}' not found")));
        };
        let updated = Company::new(
            stored.id(),
            stored.name().as_str(),
            stored.kind(),
            stored.parent_id(),
            active,
            stored.reference().map(str::to_owned),
            stored.notify_by_email(),
        )?;
        state.companies.insert(id, updated);
        Ok(())
    }

    async fn delete_company(&self, id: CompanyId) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.companies.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("company '{id}' not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryPortalStore {
    async fn find_user(&self, id: UserId) -> AppResult<Option<PortalUser>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &EmailAddress) -> AppResult<Option<PortalUser>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|user| user.email() == email)
            .cloned())
    }

    async fn list_users(&self, filter: &DocumentFilter) -> AppResult<Vec<PortalUser>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .filter(|user| filter.matches_any(user.assigned_companies()))
            .cloned()
            .collect())
    }

    async fn count_users(&self, filter: &DocumentFilter) -> AppResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .filter(|user| filter.matches_any(user.assigned_companies()))
            .count() as u64)
    }

    async fn insert_user(&self, user: &PortalUser) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id()) {
            return Err(AppError::Conflict(format!(
                "user '{}' already exists",
                user.id()
            )));
        }
        state.users.insert(user.id(), user.clone());
        Ok(())
    }

    async fn update_role(&self, id: UserId, role: Role) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(stored) = state.users.get(&id) else {
            return Err(AppError::NotFound(format!("user '{id}' not found")));
        };
        let updated = PortalUser::new(
            stored.id(),
            stored.email().clone(),
            stored.display_name().as_str(),
            role,
            stored.assigned_companies().clone(),
            stored.is_active(),
        )?;
        state.users.insert(id, updated);
        Ok(())
    }

    async fn update_assigned_companies(
        &self,
        id: UserId,
        assigned_companies: &BTreeSet<CompanyId>,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(stored) = state.users.get(&id) else {
            return Err(AppError::NotFound(format!("user '{id}' not found")));
        };
        let updated = PortalUser::new(
            stored.id(),
            stored.email().clone(),
            stored.display_name().as_str(),
            stored.role(),
            assigned_companies.clone(),
            stored.is_active(),
        )?;
        state.users.insert(id, updated);
        Ok(())
    }

    async fn set_user_active(&self, id: UserId, active: bool) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(stored) = state.users.get(&id) else {
            return Err(AppError::NotFound(format!("user '{id}' not found")));
        };
        let updated = PortalUser::new(
            stored.id(),
            stored.email().clone(),
            stored.display_name().as_str(),
            stored.role(),
            stored.assigned_companies().clone(),
            active,
        )?;
        state.users.insert(id, updated);
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("user '{id}' not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for InMemoryPortalStore {
    async fn find_document(&self, id: DocumentId) -> AppResult<Option<BillingDocument>> {
        Ok(self.state.read().await.documents.get(&id).cloned())
    }

    async fn list_documents(
        &self,
        filter: &DocumentFilter,
        query: DocumentQuery,
    ) -> AppResult<Vec<BillingDocument>> {
        Ok(self
            .state
            .read()
            .await
            .documents
            .values()
            .filter(|document| filter.matches(document.company_id()))
            .filter(|document| query.kind.is_none_or(|kind| document.kind() == kind))
            .filter(|document| query.status.is_none_or(|status| document.status() == status))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn count_documents(
        &self,
        filter: &DocumentFilter,
        kind: DocumentKind,
    ) -> AppResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .documents
            .values()
            .filter(|document| document.kind() == kind && filter.matches(document.company_id()))
            .count() as u64)
    }
}

#[async_trait]
impl AuditRepository for InMemoryPortalStore {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.state.write().await.audit_events.push(event);
        Ok(())
    }
}
