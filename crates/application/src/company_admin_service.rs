use std::sync::Arc;

use billport_core::{AppError, AppResult};
use billport_domain::{
    AuditAction, Capability, Company, CompanyId, CompanyKind, CompanyTree, Principal,
};

use crate::{
    AuditEvent, AuditRepository, CompanyRepository, CreateCompanyInput, PermissionGate,
    ScopeResolver,
};

/// Application service for company administration and scoped company reads.
///
/// Every read is narrowed to the caller's accessible-company set; every
/// mutation passes the permission gate first and appends an audit event.
#[derive(Clone)]
pub struct CompanyAdminService {
    gate: PermissionGate,
    scope_resolver: ScopeResolver,
    repository: Arc<dyn CompanyRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl CompanyAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        gate: PermissionGate,
        scope_resolver: ScopeResolver,
        repository: Arc<dyn CompanyRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            gate,
            scope_resolver,
            repository,
            audit_repository,
        }
    }

    /// Lists the companies visible to the caller.
    pub async fn list_companies(&self, actor: &Principal) -> AppResult<Vec<Company>> {
        self.gate.require(actor, Capability::CompaniesView)?;

        let scope = self.scope_resolver.resolve(actor).await?;
        let mut companies = self.repository.list_companies().await?;
        companies.retain(|company| scope.contains(company.id()));
        Ok(companies)
    }

    /// Returns one company visible to the caller.
    ///
    /// A company outside the caller's scope surfaces as not found, exactly
    /// like a company that does not exist.
    pub async fn company(&self, actor: &Principal, id: CompanyId) -> AppResult<Company> {
        self.gate.require(actor, Capability::CompaniesView)?;

        let scope = self.scope_resolver.resolve(actor).await?;
        if !scope.contains(id) {
            return Err(AppError::NotFound(format!("company '{id}' not found")));
        }

        self.repository
            .find_company(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{id}' not found")))
    }

    /// Lists the direct children of a company visible to the caller.
    pub async fn children(&self, actor: &Principal, id: CompanyId) -> AppResult<Vec<Company>> {
        // Children of an in-scope company are in scope themselves: the
        // accessible set is closed under descendants.
        self.company(actor, id).await?;
        self.repository.list_children(id).await
    }

    /// Creates a company and emits an audit event.
    pub async fn create_company(
        &self,
        actor: &Principal,
        input: CreateCompanyInput,
    ) -> AppResult<Company> {
        self.gate.require(actor, Capability::CompaniesManage)?;

        if let Some(parent_id) = input.parent_id {
            if self.repository.find_company(parent_id).await?.is_none() {
                return Err(AppError::NotFound(format!(
                    "parent company '{parent_id}' not found"
                )));
            }
        }

        let company = Company::new(
            CompanyId::new(),
            input.name,
            input.kind,
            input.parent_id,
            true,
            input.reference,
            input.notify_by_email,
        )?;

        self.repository.insert_company(&company).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::CompanyCreated,
                resource_type: "company".to_owned(),
                resource_id: company.id().to_string(),
                detail: Some(format!(
                    "created {} company '{}'",
                    company.kind().as_str(),
                    company.name().as_str()
                )),
            })
            .await?;

        Ok(company)
    }

    /// Moves a company under a new parent and emits an audit event.
    ///
    /// The proposed parent is validated against a fresh hierarchy snapshot;
    /// an assignment that would introduce a cycle never reaches storage.
    pub async fn reparent_company(
        &self,
        actor: &Principal,
        id: CompanyId,
        new_parent_id: CompanyId,
    ) -> AppResult<()> {
        self.gate.require(actor, Capability::CompaniesManage)?;

        let tree = CompanyTree::new(self.repository.list_companies().await?)?;
        let company = tree
            .company(id)
            .ok_or_else(|| AppError::NotFound(format!("company '{id}' not found")))?;

        if company.kind() == CompanyKind::Corporate {
            return Err(AppError::Validation(
                "corporate root companies cannot be re-parented".to_owned(),
            ));
        }

        tree.validate_parent(id, new_parent_id)?;

        let previous = company.parent_id();
        self.repository.update_parent(id, new_parent_id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::CompanyReparented,
                resource_type: "company".to_owned(),
                resource_id: id.to_string(),
                detail: Some(match previous {
                    Some(previous) => {
                        format!("moved from parent '{previous}' to '{new_parent_id}'")
                    }
                    None => format!("moved under parent '{new_parent_id}'"),
                }),
            })
            .await
    }

    /// Deactivates a company and emits an audit event.
    pub async fn deactivate_company(&self, actor: &Principal, id: CompanyId) -> AppResult<()> {
        self.gate.require(actor, Capability::CompaniesManage)?;

        if self.repository.find_company(id).await?.is_none() {
            return Err(AppError::NotFound(format!("company '{id}' not found")));
        }

        self.repository.set_company_active(id, false).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::CompanyDeactivated,
                resource_type: "company".to_owned(),
                resource_id: id.to_string(),
                detail: None,
            })
            .await
    }

    /// Deletes a company and emits an audit event.
    ///
    /// Children are not re-parented; they keep their stored parent id and
    /// behave as detached roots until re-parented explicitly.
    pub async fn delete_company(&self, actor: &Principal, id: CompanyId) -> AppResult<()> {
        self.gate.require(actor, Capability::CompaniesManage)?;

        let company = self
            .repository
            .find_company(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company '{id}' not found")))?;

        self.repository.delete_company(id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::CompanyDeleted,
                resource_type: "company".to_owned(),
                resource_id: id.to_string(),
                detail: Some(format!("deleted company '{}'", company.name().as_str())),
            })
            .await
    }
}
