//! Portal user types and the per-request principal.

use std::collections::BTreeSet;

use billport_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CompanyId, Role};

/// Unique identifier for a portal user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated, lowercased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Structural checks only: one `@`, non-empty local part, a domain with
    /// at least one dot, and an overall length limit of 254 characters.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let normalized = value.into().trim().to_lowercase();

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain '@'".to_owned(),
            ));
        };

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || domain.contains('@') || !domain.contains('.') {
            return Err(AppError::Validation(format!(
                "email domain '{domain}' is not valid"
            )));
        }

        if normalized.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(normalized))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// One portal user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalUser {
    id: UserId,
    email: EmailAddress,
    display_name: NonEmptyString,
    role: Role,
    assigned_companies: BTreeSet<CompanyId>,
    active: bool,
}

impl PortalUser {
    /// Creates a validated portal user.
    pub fn new(
        id: UserId,
        email: EmailAddress,
        display_name: impl Into<String>,
        role: Role,
        assigned_companies: BTreeSet<CompanyId>,
        active: bool,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            email,
            display_name: NonEmptyString::new(display_name)?,
            role,
            assigned_companies,
            active,
        })
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &NonEmptyString {
        &self.display_name
    }

    /// Returns the assigned role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the companies directly assigned to the user.
    #[must_use]
    pub fn assigned_companies(&self) -> &BTreeSet<CompanyId> {
        &self.assigned_companies
    }

    /// Returns whether the account is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// The authenticated actor behind one request.
///
/// Reconstructed per request from the external authentication collaborator
/// and trusted as-is; this crate performs no token verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    user_id: UserId,
    role: Role,
    assigned_companies: BTreeSet<CompanyId>,
}

impl Principal {
    /// Creates a principal from authentication data.
    #[must_use]
    pub fn new(user_id: UserId, role: Role, assigned_companies: BTreeSet<CompanyId>) -> Self {
        Self {
            user_id,
            role,
            assigned_companies,
        }
    }

    /// Returns the acting user's identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the acting user's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the companies directly assigned to the acting user.
    #[must_use]
    pub fn assigned_companies(&self) -> &BTreeSet<CompanyId> {
        &self.assigned_companies
    }
}

#[cfg(test)]
mod tests {
    use super::EmailAddress;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let email = EmailAddress::new("  Billing@Example.COM ");
        assert!(email.is_ok());
        assert_eq!(
            email.map(|value| value.as_str().to_owned()).ok(),
            Some("billing@example.com".to_owned())
        );
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("billing.example.com").is_err());
    }

    #[test]
    fn email_with_empty_local_part_is_rejected() {
        assert!(EmailAddress::new("@example.com").is_err());
    }

    #[test]
    fn email_without_domain_dot_is_rejected() {
        assert!(EmailAddress::new("billing@example").is_err());
    }

    #[test]
    fn email_with_two_at_signs_is_rejected() {
        assert!(EmailAddress::new("billing@foo@example.com").is_err());
    }

    #[test]
    fn overlong_email_is_rejected() {
        let local = "a".repeat(250);
        assert!(EmailAddress::new(format!("{local}@example.com")).is_err());
    }
}
