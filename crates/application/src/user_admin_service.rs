use std::collections::BTreeSet;
use std::sync::Arc;

use billport_core::{AppError, AppResult};
use billport_domain::{
    AccessPolicy, AuditAction, Capability, CompanyId, EmailAddress, PortalUser, Principal, Role,
    UserId,
};

use crate::{
    AuditEvent, AuditRepository, CompanyRepository, CreateUserInput, PermissionGate,
    ScopeResolver, UserRepository,
};

/// Application service for portal-user administration.
///
/// Role changes are double-checked: the actor must be able to manage both
/// the user's current role and the proposed one, so privileges can never be
/// escalated through an intermediate step the actor could not perform
/// directly.
#[derive(Clone)]
pub struct UserAdminService {
    gate: PermissionGate,
    policy: Arc<AccessPolicy>,
    scope_resolver: ScopeResolver,
    repository: Arc<dyn UserRepository>,
    company_repository: Arc<dyn CompanyRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl UserAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        gate: PermissionGate,
        policy: Arc<AccessPolicy>,
        scope_resolver: ScopeResolver,
        repository: Arc<dyn UserRepository>,
        company_repository: Arc<dyn CompanyRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            gate,
            policy,
            scope_resolver,
            repository,
            company_repository,
            audit_repository,
        }
    }

    /// Lists the users visible to the caller.
    pub async fn list_users(&self, actor: &Principal) -> AppResult<Vec<PortalUser>> {
        self.gate.require(actor, Capability::UsersView)?;

        let filter = self.scope_resolver.document_filter(actor).await?;
        self.repository.list_users(&filter).await
    }

    /// Returns one user visible to the caller.
    pub async fn user(&self, actor: &Principal, id: UserId) -> AppResult<PortalUser> {
        self.gate.require(actor, Capability::UsersView)?;

        let filter = self.scope_resolver.document_filter(actor).await?;
        let user = self.repository.find_user(id).await?;

        match user {
            Some(user) if filter.matches_any(user.assigned_companies()) => Ok(user),
            _ => Err(AppError::NotFound(format!("user '{id}' not found"))),
        }
    }

    /// Returns the roles the caller may assign.
    pub fn manageable_roles(&self, actor: &Principal) -> AppResult<Vec<Role>> {
        self.gate.require(actor, Capability::UsersManage)?;
        self.policy.manageable_roles(actor.role())
    }

    /// Creates a portal user and emits an audit event.
    pub async fn create_user(
        &self,
        actor: &Principal,
        input: CreateUserInput,
    ) -> AppResult<PortalUser> {
        self.gate.require(actor, Capability::UsersManage)?;

        if !self.policy.can_manage(actor.role(), input.role)? {
            return Err(AppError::Forbidden(format!(
                "role '{}' cannot create a '{}' user",
                actor.role().as_str(),
                input.role.as_str()
            )));
        }

        self.ensure_companies_exist(&input.assigned_companies)
            .await?;

        let email = EmailAddress::new(input.email)?;
        if self.repository.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "a user with email '{}' already exists",
                email.as_str()
            )));
        }

        let user = PortalUser::new(
            UserId::new(),
            email,
            input.display_name,
            input.role,
            input.assigned_companies,
            true,
        )?;

        self.repository.insert_user(&user).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::UserCreated,
                resource_type: "portal_user".to_owned(),
                resource_id: user.id().to_string(),
                detail: Some(format!(
                    "created '{}' user '{}'",
                    user.role().as_str(),
                    user.email().as_str()
                )),
            })
            .await?;

        Ok(user)
    }

    /// Reassigns a user's role and emits an audit event.
    ///
    /// Both the current and the new role must be manageable by the actor.
    pub async fn change_role(
        &self,
        actor: &Principal,
        id: UserId,
        new_role: Role,
    ) -> AppResult<()> {
        self.gate.require(actor, Capability::UsersManage)?;

        let user = self.require_user(id).await?;
        self.require_manageable(actor, user.role())?;
        if !self.policy.can_manage(actor.role(), new_role)? {
            return Err(AppError::Forbidden(format!(
                "role '{}' cannot assign role '{}'",
                actor.role().as_str(),
                new_role.as_str()
            )));
        }

        self.repository.update_role(id, new_role).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::UserRoleChanged,
                resource_type: "portal_user".to_owned(),
                resource_id: id.to_string(),
                detail: Some(format!(
                    "changed role from '{}' to '{}'",
                    user.role().as_str(),
                    new_role.as_str()
                )),
            })
            .await
    }

    /// Replaces a user's company assignments and emits an audit event.
    pub async fn assign_companies(
        &self,
        actor: &Principal,
        id: UserId,
        assigned_companies: BTreeSet<CompanyId>,
    ) -> AppResult<()> {
        self.gate.require(actor, Capability::UsersManage)?;

        let user = self.require_user(id).await?;
        self.require_manageable(actor, user.role())?;
        self.ensure_companies_exist(&assigned_companies).await?;

        self.repository
            .update_assigned_companies(id, &assigned_companies)
            .await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::UserCompaniesChanged,
                resource_type: "portal_user".to_owned(),
                resource_id: id.to_string(),
                detail: Some(format!(
                    "assigned {} companies",
                    assigned_companies.len()
                )),
            })
            .await
    }

    /// Deactivates a user and emits an audit event.
    pub async fn deactivate_user(&self, actor: &Principal, id: UserId) -> AppResult<()> {
        self.gate.require(actor, Capability::UsersDelete)?;

        let user = self.require_user(id).await?;
        self.require_manageable(actor, user.role())?;

        self.repository.set_user_active(id, false).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::UserDeactivated,
                resource_type: "portal_user".to_owned(),
                resource_id: id.to_string(),
                detail: None,
            })
            .await
    }

    /// Deletes a user and emits an audit event.
    pub async fn delete_user(&self, actor: &Principal, id: UserId) -> AppResult<()> {
        self.gate.require(actor, Capability::UsersDelete)?;

        let user = self.require_user(id).await?;
        self.require_manageable(actor, user.role())?;

        self.repository.delete_user(id).await?;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::UserDeleted,
                resource_type: "portal_user".to_owned(),
                resource_id: id.to_string(),
                detail: Some(format!("deleted user '{}'", user.email().as_str())),
            })
            .await
    }

    async fn require_user(&self, id: UserId) -> AppResult<PortalUser> {
        self.repository
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{id}' not found")))
    }

    fn require_manageable(&self, actor: &Principal, target_role: Role) -> AppResult<()> {
        if self.policy.can_manage(actor.role(), target_role)? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "role '{}' cannot manage a '{}' user",
            actor.role().as_str(),
            target_role.as_str()
        )))
    }

    async fn ensure_companies_exist(&self, ids: &BTreeSet<CompanyId>) -> AppResult<()> {
        for id in ids {
            if self.company_repository.find_company(*id).await?.is_none() {
                return Err(AppError::NotFound(format!("company '{id}' not found")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use billport_core::{AppError, AppResult};
    use billport_domain::{
        AccessPolicy, Company, CompanyId, CompanyKind, DocumentFilter, EmailAddress, PortalUser,
        Principal, Role, UserId,
    };

    use crate::{
        AuditEvent, AuditRepository, CompanyRepository, CreateUserInput, PermissionGate,
        ScopeResolver, UserRepository,
    };

    use super::UserAdminService;

    #[derive(Default)]
    struct FakeUserRepository {
        users: Mutex<Vec<PortalUser>>,
    }

    #[async_trait]
    impl UserRepository for FakeUserRepository {
        async fn find_user(&self, id: UserId) -> AppResult<Option<PortalUser>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.id() == id)
                .cloned())
        }

        async fn find_user_by_email(
            &self,
            email: &EmailAddress,
        ) -> AppResult<Option<PortalUser>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .find(|user| user.email() == email)
                .cloned())
        }

        async fn list_users(&self, filter: &DocumentFilter) -> AppResult<Vec<PortalUser>> {
            Ok(self
                .users
                .lock()
                .await
                .iter()
                .filter(|user| filter.matches_any(user.assigned_companies()))
                .cloned()
                .collect())
        }

        async fn count_users(&self, filter: &DocumentFilter) -> AppResult<u64> {
            Ok(self.list_users(filter).await?.len() as u64)
        }

        async fn insert_user(&self, user: &PortalUser) -> AppResult<()> {
            self.users.lock().await.push(user.clone());
            Ok(())
        }

        async fn update_role(&self, id: UserId, role: Role) -> AppResult<()> {
            let mut users = self.users.lock().await;
            let Some(stored) = users.iter_mut().find(|user| user.id() == id) else {
                return Err(AppError::NotFound(format!("user '{id}' not found")));
            };
            *stored = PortalUser::new(
                stored.id(),
                stored.email().clone(),
                stored.display_name().as_str(),
                role,
                stored.assigned_companies().clone(),
                stored.is_active(),
            )?;
            Ok(())
        }

        async fn update_assigned_companies(
            &self,
            id: UserId,
            assigned_companies: &BTreeSet<CompanyId>,
        ) -> AppResult<()> {
            let mut users = self.users.lock().await;
            let Some(stored) = users.iter_mut().find(|user| user.id() == id) else {
                return Err(AppError::NotFound(format!("user '{id}' not found")));
            };
            *stored = PortalUser::new(
                stored.id(),
                stored.email().clone(),
                stored.display_name().as_str(),
                stored.role(),
                assigned_companies.clone(),
                stored.is_active(),
            )?;
            Ok(())
        }

        async fn set_user_active(&self, id: UserId, active: bool) -> AppResult<()> {
            let mut users = self.users.lock().await;
            let Some(stored) = users.iter_mut().find(|user| user.id() == id) else {
                return Err(AppError::NotFound(format!("user '{id}' not found")));
            };
            *stored = PortalUser::new(
                stored.id(),
                stored.email().clone(),
                stored.display_name().as_str(),
                stored.role(),
                stored.assigned_companies().clone(),
                active,
            )?;
            Ok(())
        }

        async fn delete_user(&self, id: UserId) -> AppResult<()> {
            self.users.lock().await.retain(|user| user.id() != id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeCompanyRepository {
        companies: Mutex<Vec<Company>>,
    }

    #[async_trait]
    impl CompanyRepository for FakeCompanyRepository {
        async fn find_company(&self, id: CompanyId) -> AppResult<Option<Company>> {
            Ok(self
                .companies
                .lock()
                .await
                .iter()
                .find(|company| company.id() == id)
                .cloned())
        }

        async fn list_children(&self, parent_id: CompanyId) -> AppResult<Vec<Company>> {
            Ok(self
                .companies
                .lock()
                .await
                .iter()
                .filter(|company| company.parent_id() == Some(parent_id))
                .cloned()
                .collect())
        }

        async fn list_companies(&self) -> AppResult<Vec<Company>> {
            Ok(self.companies.lock().await.clone())
        }

        async fn count_companies(&self, filter: &DocumentFilter) -> AppResult<u64> {
            Ok(self
                .companies
                .lock()
                .await
                .iter()
                .filter(|company| filter.matches(company.id()))
                .count() as u64)
        }

        async fn insert_company(&self, company: &Company) -> AppResult<()> {
            self.companies.lock().await.push(company.clone());
            Ok(())
        }

        async fn update_parent(&self, _id: CompanyId, _parent_id: CompanyId) -> AppResult<()> {
            Ok(())
        }

        async fn set_company_active(&self, _id: CompanyId, _active: bool) -> AppResult<()> {
            Ok(())
        }

        async fn delete_company(&self, _id: CompanyId) -> AppResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeAuditRepository {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for FakeAuditRepository {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    fn company_id(index: u128) -> CompanyId {
        CompanyId::from_uuid(Uuid::from_u128(index + 1))
    }

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(), role, BTreeSet::new())
    }

    fn portal_user(role: Role, assigned: &[u128]) -> PortalUser {
        PortalUser::new(
            UserId::new(),
            EmailAddress::new(format!("{}@example.com", Uuid::new_v4()))
                .unwrap_or_else(|_| unreachable!()),
            "Test User",
            role,
            assigned.iter().map(|index| company_id(*index)).collect(),
            true,
        )
        .unwrap_or_else(|_| unreachable!())
    }

    async fn seeded_service() -> (
        UserAdminService,
        Arc<FakeUserRepository>,
        Arc<FakeAuditRepository>,
    ) {
        let users = Arc::new(FakeUserRepository::default());
        let companies = Arc::new(FakeCompanyRepository::default());
        {
            let mut stored = companies.companies.lock().await;
            stored.push(
                Company::new(
                    company_id(0),
                    "Corp A",
                    CompanyKind::Corporate,
                    None,
                    true,
                    None,
                    false,
                )
                .unwrap_or_else(|_| unreachable!()),
            );
            stored.push(
                Company::new(
                    company_id(1),
                    "Sub B",
                    CompanyKind::Subsidiary,
                    Some(company_id(0)),
                    true,
                    None,
                    false,
                )
                .unwrap_or_else(|_| unreachable!()),
            );
        }

        let audit_repository = Arc::new(FakeAuditRepository::default());
        let policy = Arc::new(AccessPolicy::standard());
        let service = UserAdminService::new(
            PermissionGate::new(policy.clone()),
            policy,
            ScopeResolver::new(companies.clone()),
            users.clone(),
            companies,
            audit_repository.clone(),
        );
        (service, users, audit_repository)
    }

    #[tokio::test]
    async fn create_user_requires_manage_capability() {
        let (service, _, _) = seeded_service().await;
        let result = service
            .create_user(
                &principal(Role::CreditSenior),
                CreateUserInput {
                    email: "contact@example.com".to_owned(),
                    display_name: "Contact".to_owned(),
                    role: Role::ExternalUser,
                    assigned_companies: BTreeSet::from([company_id(0)]),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn manager_cannot_create_an_administrator() {
        let (service, _, _) = seeded_service().await;
        let result = service
            .create_user(
                &principal(Role::Manager),
                CreateUserInput {
                    email: "admin@example.com".to_owned(),
                    display_name: "Admin".to_owned(),
                    role: Role::Administrator,
                    assigned_companies: BTreeSet::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn create_user_with_unknown_company_is_rejected() {
        let (service, _, _) = seeded_service().await;
        let result = service
            .create_user(
                &principal(Role::Administrator),
                CreateUserInput {
                    email: "contact@example.com".to_owned(),
                    display_name: "Contact".to_owned(),
                    role: Role::ExternalUser,
                    assigned_companies: BTreeSet::from([company_id(9)]),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (service, users, _) = seeded_service().await;
        let existing = portal_user(Role::ExternalUser, &[0]);
        let email = existing.email().as_str().to_owned();
        users.users.lock().await.push(existing);

        let result = service
            .create_user(
                &principal(Role::Administrator),
                CreateUserInput {
                    email,
                    display_name: "Duplicate".to_owned(),
                    role: Role::ExternalUser,
                    assigned_companies: BTreeSet::from([company_id(0)]),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn create_user_writes_audit_event() {
        let (service, _, audit_repository) = seeded_service().await;
        let result = service
            .create_user(
                &principal(Role::Manager),
                CreateUserInput {
                    email: "contact@example.com".to_owned(),
                    display_name: "Contact".to_owned(),
                    role: Role::ExternalUser,
                    assigned_companies: BTreeSet::from([company_id(1)]),
                },
            )
            .await;
        assert!(result.is_ok());
        assert_eq!(audit_repository.events.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn change_role_checks_both_current_and_new_role() {
        let (service, users, _) = seeded_service().await;

        // A manager may not touch an administrator at all.
        let admin = portal_user(Role::Administrator, &[]);
        let admin_id = admin.id();
        users.users.lock().await.push(admin);
        let result = service
            .change_role(&principal(Role::Manager), admin_id, Role::ExternalUser)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        // A manager may manage an external user but not promote them to a
        // role the manager could not create directly.
        let external = portal_user(Role::ExternalUser, &[0]);
        let external_id = external.id();
        users.users.lock().await.push(external);
        let result = service
            .change_role(&principal(Role::Manager), external_id, Role::GlobalAdmin)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let result = service
            .change_role(&principal(Role::Manager), external_id, Role::CreditController)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn global_admin_may_demote_another_global_admin() {
        let (service, users, _) = seeded_service().await;
        let other = portal_user(Role::GlobalAdmin, &[]);
        let other_id = other.id();
        users.users.lock().await.push(other);

        let result = service
            .change_role(&principal(Role::GlobalAdmin), other_id, Role::Administrator)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn delete_user_requires_delete_capability() {
        let (service, users, _) = seeded_service().await;
        let target = portal_user(Role::ExternalUser, &[0]);
        let target_id = target.id();
        users.users.lock().await.push(target);

        let result = service
            .delete_user(&principal(Role::Manager), target_id)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let result = service
            .delete_user(&principal(Role::Administrator), target_id)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn scoped_viewer_sees_only_users_in_scope() {
        let (service, users, _) = seeded_service().await;
        {
            let mut stored = users.users.lock().await;
            stored.push(portal_user(Role::ExternalUser, &[0]));
            stored.push(portal_user(Role::ExternalUser, &[1]));
        }

        // Staff see everyone, including users with no assignments.
        let listed = service.list_users(&principal(Role::Manager)).await;
        assert_eq!(listed.map(|users| users.len()).ok(), Some(2));
    }

    #[tokio::test]
    async fn manageable_roles_follow_the_hierarchy() {
        let (service, _, _) = seeded_service().await;
        let roles = service.manageable_roles(&principal(Role::Manager));
        assert!(roles.is_ok());
        let roles = roles.unwrap_or_default();
        assert!(!roles.contains(&Role::Manager));
        assert!(!roles.contains(&Role::Administrator));
        assert!(roles.contains(&Role::CreditSenior));
        assert!(roles.contains(&Role::NotificationContact));
    }
}
