use std::collections::HashMap;
use std::str::FromStr;

use billport_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::Role;

/// Capabilities enforced by request-time permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Allows listing and reading portal users.
    UsersView,
    /// Allows creating users and changing roles or company assignments.
    UsersManage,
    /// Allows deactivating and deleting portal users.
    UsersDelete,
    /// Allows listing and reading companies.
    CompaniesView,
    /// Allows creating, re-parenting, and deleting companies.
    CompaniesManage,
    /// Allows listing and reading billing documents.
    DocumentsView,
    /// Allows reading the dashboard statistics.
    DashboardView,
}

impl Capability {
    /// Returns a stable storage value for this capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsersView => "users.view",
            Self::UsersManage => "users.manage",
            Self::UsersDelete => "users.delete",
            Self::CompaniesView => "companies.view",
            Self::CompaniesManage => "companies.manage",
            Self::DocumentsView => "documents.view",
            Self::DashboardView => "dashboard.view",
        }
    }

    /// Returns all known capabilities.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Capability] = &[
            Capability::UsersView,
            Capability::UsersManage,
            Capability::UsersDelete,
            Capability::CompaniesView,
            Capability::CompaniesManage,
            Capability::DocumentsView,
            Capability::DashboardView,
        ];

        ALL
    }
}

impl FromStr for Capability {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "users.view" => Ok(Self::UsersView),
            "users.manage" => Ok(Self::UsersManage),
            "users.delete" => Ok(Self::UsersDelete),
            "companies.view" => Ok(Self::CompaniesView),
            "companies.manage" => Ok(Self::CompaniesManage),
            "documents.view" => Ok(Self::DocumentsView),
            "dashboard.view" => Ok(Self::DashboardView),
            _ => Err(AppError::UnknownCapability(value.to_owned())),
        }
    }
}

/// Rule mapping one capability to the roles allowed to use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityRule {
    /// Allows any role whose level is at least the level of the given role.
    MinimumRole(Role),
    /// Allows exactly the listed roles.
    AllowList(Vec<Role>),
}

/// Immutable access-control configuration: role levels plus the capability
/// table.
///
/// Constructed once at startup and shared read-only across request handlers;
/// tests may build alternate tables without touching process-wide state.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    levels: HashMap<Role, u8>,
    capabilities: HashMap<Capability, CapabilityRule>,
}

impl AccessPolicy {
    /// Creates a policy from explicit tables.
    #[must_use]
    pub fn new(
        levels: HashMap<Role, u8>,
        capabilities: HashMap<Capability, CapabilityRule>,
    ) -> Self {
        Self {
            levels,
            capabilities,
        }
    }

    /// Builds the production role hierarchy and capability table.
    #[must_use]
    pub fn standard() -> Self {
        let levels = Role::all()
            .iter()
            .map(|role| {
                let level = match role {
                    Role::GlobalAdmin => 7,
                    Role::Administrator => 6,
                    Role::Manager => 5,
                    Role::CreditSenior => 4,
                    Role::CreditController => 3,
                    Role::ExternalUser => 2,
                    Role::NotificationContact => 1,
                };
                (*role, level)
            })
            .collect();

        let staff = vec![Role::GlobalAdmin, Role::Administrator, Role::Manager];
        let capabilities = HashMap::from([
            (Capability::UsersView, CapabilityRule::AllowList(staff.clone())),
            (
                Capability::UsersManage,
                CapabilityRule::AllowList(staff),
            ),
            (
                Capability::UsersDelete,
                CapabilityRule::AllowList(vec![Role::GlobalAdmin, Role::Administrator]),
            ),
            (
                Capability::CompaniesView,
                CapabilityRule::MinimumRole(Role::CreditController),
            ),
            (
                Capability::CompaniesManage,
                CapabilityRule::AllowList(vec![Role::GlobalAdmin, Role::Administrator]),
            ),
            (
                Capability::DocumentsView,
                CapabilityRule::MinimumRole(Role::ExternalUser),
            ),
            (
                Capability::DashboardView,
                CapabilityRule::MinimumRole(Role::ExternalUser),
            ),
        ]);

        Self {
            levels,
            capabilities,
        }
    }

    /// Returns the privilege level configured for a role.
    pub fn level(&self, role: Role) -> AppResult<u8> {
        self.levels
            .get(&role)
            .copied()
            .ok_or_else(|| AppError::UnknownRole(role.as_str().to_owned()))
    }

    /// Returns whether the acting role may manage the target role.
    ///
    /// Global admins manage every role including other global admins; all
    /// other roles manage strictly lower levels only, never peers.
    pub fn can_manage(&self, acting: Role, target: Role) -> AppResult<bool> {
        let acting_level = self.level(acting)?;
        let target_level = self.level(target)?;

        if acting == Role::GlobalAdmin {
            return Ok(true);
        }

        Ok(acting_level > target_level)
    }

    /// Returns the roles the acting role may assign or administer.
    pub fn manageable_roles(&self, acting: Role) -> AppResult<Vec<Role>> {
        if acting == Role::GlobalAdmin {
            return Ok(Role::all().to_vec());
        }

        let acting_level = self.level(acting)?;
        let mut manageable = Vec::new();
        for role in Role::all() {
            if self.level(*role)? < acting_level {
                manageable.push(*role);
            }
        }

        Ok(manageable)
    }

    /// Returns whether a role holds a capability.
    pub fn has_capability(&self, role: Role, capability: Capability) -> AppResult<bool> {
        let rule = self
            .capabilities
            .get(&capability)
            .ok_or_else(|| AppError::UnknownCapability(capability.as_str().to_owned()))?;

        match rule {
            CapabilityRule::AllowList(roles) => Ok(roles.contains(&role)),
            CapabilityRule::MinimumRole(minimum) => {
                Ok(self.level(role)? >= self.level(*minimum)?)
            }
        }
    }
}

/// Stable audit actions emitted by administrative use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a company is created.
    CompanyCreated,
    /// Emitted when a company is moved under a new parent.
    CompanyReparented,
    /// Emitted when a company is deactivated.
    CompanyDeactivated,
    /// Emitted when a company is deleted.
    CompanyDeleted,
    /// Emitted when a portal user is created.
    UserCreated,
    /// Emitted when a portal user's role changes.
    UserRoleChanged,
    /// Emitted when a portal user's company assignments change.
    UserCompaniesChanged,
    /// Emitted when a portal user is deactivated.
    UserDeactivated,
    /// Emitted when a portal user is deleted.
    UserDeleted,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyCreated => "company.created",
            Self::CompanyReparented => "company.reparented",
            Self::CompanyDeactivated => "company.deactivated",
            Self::CompanyDeleted => "company.deleted",
            Self::UserCreated => "user.created",
            Self::UserRoleChanged => "user.role_changed",
            Self::UserCompaniesChanged => "user.companies_changed",
            Self::UserDeactivated => "user.deactivated",
            Self::UserDeleted => "user.deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use billport_core::AppError;

    use super::{AccessPolicy, Capability, CapabilityRule};
    use crate::Role;

    #[test]
    fn levels_are_strictly_descending() {
        let policy = AccessPolicy::standard();
        let levels: Vec<u8> = Role::all()
            .iter()
            .map(|role| policy.level(*role).unwrap_or(0))
            .collect();
        assert_eq!(levels, vec![7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn can_manage_matches_level_order_exactly() {
        let policy = AccessPolicy::standard();
        for acting in Role::all() {
            for target in Role::all() {
                let decision = policy.can_manage(*acting, *target);
                assert!(decision.is_ok());
                let expected = *acting == Role::GlobalAdmin
                    || policy.level(*acting).unwrap_or(0) > policy.level(*target).unwrap_or(0);
                assert_eq!(decision.unwrap_or(!expected), expected);
            }
        }
    }

    #[test]
    fn no_role_manages_a_peer_except_global_admin() {
        let policy = AccessPolicy::standard();
        for role in Role::all() {
            let decision = policy.can_manage(*role, *role);
            assert!(decision.is_ok());
            assert_eq!(
                decision.unwrap_or(false),
                *role == Role::GlobalAdmin,
                "self-management for {}",
                role.as_str()
            );
        }
    }

    #[test]
    fn manageable_roles_excludes_self_below_global_admin() {
        let policy = AccessPolicy::standard();
        for role in Role::all() {
            let manageable = policy.manageable_roles(*role);
            assert!(manageable.is_ok());
            let manageable = manageable.unwrap_or_default();
            if *role == Role::GlobalAdmin {
                assert_eq!(manageable, Role::all().to_vec());
            } else {
                assert!(!manageable.contains(role));
            }
        }
    }

    #[test]
    fn administrator_manages_manager_but_not_the_reverse() {
        let policy = AccessPolicy::standard();
        assert_eq!(
            policy.can_manage(Role::Administrator, Role::Manager).ok(),
            Some(true)
        );
        assert_eq!(
            policy.can_manage(Role::Manager, Role::Administrator).ok(),
            Some(false)
        );
        assert_eq!(
            policy.can_manage(Role::GlobalAdmin, Role::GlobalAdmin).ok(),
            Some(true)
        );
    }

    #[test]
    fn manager_holds_users_manage_but_credit_controller_does_not() {
        let policy = AccessPolicy::standard();
        assert_eq!(
            policy
                .has_capability(Role::Manager, Capability::UsersManage)
                .ok(),
            Some(true)
        );
        assert_eq!(
            policy
                .has_capability(Role::CreditController, Capability::UsersManage)
                .ok(),
            Some(false)
        );
    }

    #[test]
    fn minimum_role_rule_includes_the_minimum_itself() {
        let policy = AccessPolicy::standard();
        assert_eq!(
            policy
                .has_capability(Role::CreditController, Capability::CompaniesView)
                .ok(),
            Some(true)
        );
        assert_eq!(
            policy
                .has_capability(Role::ExternalUser, Capability::CompaniesView)
                .ok(),
            Some(false)
        );
    }

    #[test]
    fn missing_capability_entry_fails_closed() {
        let policy = AccessPolicy::new(
            AccessPolicy::standard().levels.clone(),
            HashMap::new(),
        );
        let result = policy.has_capability(Role::GlobalAdmin, Capability::UsersView);
        assert!(matches!(result, Err(AppError::UnknownCapability(_))));
    }

    #[test]
    fn missing_role_level_fails_closed() {
        let policy = AccessPolicy::new(
            HashMap::from([(Role::GlobalAdmin, 7)]),
            HashMap::from([(
                Capability::UsersView,
                CapabilityRule::MinimumRole(Role::Manager),
            )]),
        );
        let result = policy.has_capability(Role::Manager, Capability::UsersView);
        assert!(matches!(result, Err(AppError::UnknownRole(_))));
    }

    #[test]
    fn capability_roundtrip_storage_value() {
        for capability in Capability::all() {
            let restored = Capability::from_str(capability.as_str());
            assert!(restored.is_ok());
            assert_eq!(restored.unwrap_or(Capability::UsersView), *capability);
        }
    }
}
