use std::collections::BTreeSet;

use async_trait::async_trait;

use billport_core::AppResult;
use billport_domain::{CompanyId, DocumentFilter, EmailAddress, PortalUser, Role, UserId};

/// Input payload for creating portal users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateUserInput {
    /// Login email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Initial role.
    pub role: Role,
    /// Companies the user is directly assigned to.
    pub assigned_companies: BTreeSet<CompanyId>,
}

/// Port for portal-user storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds one user by id.
    async fn find_user(&self, id: UserId) -> AppResult<Option<PortalUser>>;

    /// Finds one user by email address.
    async fn find_user_by_email(&self, email: &EmailAddress) -> AppResult<Option<PortalUser>>;

    /// Lists users matching the scoping filter on assigned companies.
    async fn list_users(&self, filter: &DocumentFilter) -> AppResult<Vec<PortalUser>>;

    /// Counts users matching the scoping filter.
    async fn count_users(&self, filter: &DocumentFilter) -> AppResult<u64>;

    /// Persists a new user with their company assignments.
    async fn insert_user(&self, user: &PortalUser) -> AppResult<()>;

    /// Reassigns the role of a user.
    async fn update_role(&self, id: UserId, role: Role) -> AppResult<()>;

    /// Replaces the company assignments of a user.
    async fn update_assigned_companies(
        &self,
        id: UserId,
        assigned_companies: &BTreeSet<CompanyId>,
    ) -> AppResult<()>;

    /// Sets the active flag of a user.
    async fn set_user_active(&self, id: UserId, active: bool) -> AppResult<()>;

    /// Removes a user and their company assignments.
    async fn delete_user(&self, id: UserId) -> AppResult<()>;
}
