use std::str::FromStr;

use billport_core::AppError;
use serde::{Deserialize, Serialize};

/// Portal roles, from internal staff down to external contacts.
///
/// The enumeration is closed: every consumer matches exhaustively, so adding
/// or removing a role is a compile-time-checked change. Privilege levels are
/// not encoded here; they live in the [`crate::AccessPolicy`] value built at
/// startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Highest privilege; manages every role including other global admins.
    GlobalAdmin,
    /// Internal administrator with organization-wide responsibility.
    Administrator,
    /// Internal operations manager.
    Manager,
    /// Senior credit-control staff tied to assigned companies.
    CreditSenior,
    /// Credit-control staff tied to assigned companies.
    CreditController,
    /// External customer contact with portal access.
    ExternalUser,
    /// External contact that only receives document notifications.
    NotificationContact,
}

impl Role {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlobalAdmin => "global_admin",
            Self::Administrator => "administrator",
            Self::Manager => "manager",
            Self::CreditSenior => "credit_senior",
            Self::CreditController => "credit_controller",
            Self::ExternalUser => "external_user",
            Self::NotificationContact => "notification_contact",
        }
    }

    /// Returns all known roles, highest privilege first.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Role] = &[
            Role::GlobalAdmin,
            Role::Administrator,
            Role::Manager,
            Role::CreditSenior,
            Role::CreditController,
            Role::ExternalUser,
            Role::NotificationContact,
        ];

        ALL
    }

    /// Returns whether this role carries organization-wide visibility.
    ///
    /// Internal staff see every company; the remaining roles see only their
    /// hierarchy-expanded company assignments.
    #[must_use]
    pub fn has_unrestricted_scope(&self) -> bool {
        matches!(self, Self::GlobalAdmin | Self::Administrator | Self::Manager)
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "global_admin" => Ok(Self::GlobalAdmin),
            "administrator" => Ok(Self::Administrator),
            "manager" => Ok(Self::Manager),
            "credit_senior" => Ok(Self::CreditSenior),
            "credit_controller" => Ok(Self::CreditController),
            "external_user" => Ok(Self::ExternalUser),
            "notification_contact" => Ok(Self::NotificationContact),
            _ => Err(AppError::UnknownRole(value.to_owned())),
        }
    }
}
