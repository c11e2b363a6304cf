use std::str::FromStr;

use billport_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a company record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CompanyId(Uuid);

impl CompanyId {
    /// Creates a new random company identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a company identifier from an existing UUID value.
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

impl Default for CompanyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CompanyId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Structural kind of a company node in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyKind {
    /// Corporate root; never has a parent.
    Corporate,
    /// Subsidiary; always has exactly one parent.
    Subsidiary,
    /// Branch office; always has exactly one parent.
    Branch,
}

impl CompanyKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Corporate => "corporate",
            Self::Subsidiary => "subsidiary",
            Self::Branch => "branch",
        }
    }
}

impl FromStr for CompanyKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "corporate" => Ok(Self::Corporate),
            "subsidiary" => Ok(Self::Subsidiary),
            "branch" => Ok(Self::Branch),
            _ => Err(AppError::Validation(format!(
                "unknown company kind '{value}'"
            ))),
        }
    }
}

/// One company in the tenant hierarchy.
///
/// The hierarchy is modeled as a parent back-pointer; child resolution is
/// the job of [`crate::CompanyTree`]. Acyclicity across nodes cannot be
/// checked here and is guarded at write time by the tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    id: CompanyId,
    name: NonEmptyString,
    kind: CompanyKind,
    parent_id: Option<CompanyId>,
    active: bool,
    reference: Option<String>,
    notify_by_email: bool,
}

impl Company {
    /// Creates a validated company.
    ///
    /// Corporate companies must not carry a parent; subsidiaries and
    /// branches must carry exactly one. A company can never be its own
    /// parent.
    pub fn new(
        id: CompanyId,
        name: impl Into<String>,
        kind: CompanyKind,
        parent_id: Option<CompanyId>,
        active: bool,
        reference: Option<String>,
        notify_by_email: bool,
    ) -> AppResult<Self> {
        match (kind, parent_id) {
            (CompanyKind::Corporate, Some(_)) => {
                return Err(AppError::Validation(
                    "corporate companies must not have a parent".to_owned(),
                ));
            }
            (CompanyKind::Subsidiary | CompanyKind::Branch, None) => {
                return Err(AppError::Validation(format!(
                    "{} companies require a parent",
                    kind.as_str()
                )));
            }
            _ => {}
        }

        if parent_id == Some(id) {
            return Err(AppError::CycleDetected(format!(
                "company '{id}' cannot be its own parent"
            )));
        }

        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            kind,
            parent_id,
            active,
            reference,
            notify_by_email,
        })
    }

    /// Returns the company identifier.
    #[must_use]
    pub fn id(&self) -> CompanyId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the structural kind.
    #[must_use]
    pub fn kind(&self) -> CompanyKind {
        self.kind
    }

    /// Returns the parent company, if any.
    #[must_use]
    pub fn parent_id(&self) -> Option<CompanyId> {
        self.parent_id
    }

    /// Returns whether the company is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the optional external reference number.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Returns whether document notifications are emailed to contacts.
    #[must_use]
    pub fn notify_by_email(&self) -> bool {
        self.notify_by_email
    }
}
