use std::str::FromStr;

use billport_core::{AppError, AppResult, NonEmptyString};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CompanyId;

/// Unique identifier for a billing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new random document identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a document identifier from an existing UUID value.
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

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Billing document categories served by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Invoice issued to a company.
    Invoice,
    /// Credit note issued against earlier invoices.
    CreditNote,
    /// Periodic account statement.
    Statement,
}

impl DocumentKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::CreditNote => "credit_note",
            Self::Statement => "statement",
        }
    }

    /// Returns all known document kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[DocumentKind] = &[
            DocumentKind::Invoice,
            DocumentKind::CreditNote,
            DocumentKind::Statement,
        ];

        ALL
    }
}

impl FromStr for DocumentKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "invoice" => Ok(Self::Invoice),
            "credit_note" => Ok(Self::CreditNote),
            "statement" => Ok(Self::Statement),
            _ => Err(AppError::Validation(format!(
                "unknown document kind '{value}'"
            ))),
        }
    }
}

/// Settlement state of a billing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Issued and awaiting settlement.
    Open,
    /// Fully settled.
    Paid,
    /// Past the due date without settlement.
    Overdue,
}

impl DocumentStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "paid" => Ok(Self::Paid),
            "overdue" => Ok(Self::Overdue),
            _ => Err(AppError::Validation(format!(
                "unknown document status '{value}'"
            ))),
        }
    }
}

/// One billing document owned by a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDocument {
    id: DocumentId,
    company_id: CompanyId,
    kind: DocumentKind,
    number: NonEmptyString,
    issued_on: NaiveDate,
    due_on: Option<NaiveDate>,
    amount_minor: i64,
    currency: String,
    status: DocumentStatus,
}

impl BillingDocument {
    /// Creates a validated billing document.
    ///
    /// Amounts are minor currency units; the currency is an ISO 4217
    /// alphabetic code. A due date must not precede the issue date.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: DocumentId,
        company_id: CompanyId,
        kind: DocumentKind,
        number: impl Into<String>,
        issued_on: NaiveDate,
        due_on: Option<NaiveDate>,
        amount_minor: i64,
        currency: impl Into<String>,
        status: DocumentStatus,
    ) -> AppResult<Self> {
        let currency = currency.into().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|character| character.is_ascii_alphabetic())
        {
            return Err(AppError::Validation(format!(
                "currency must be a three-letter ISO 4217 code, got '{currency}'"
            )));
        }

        if let Some(due_on) = due_on {
            if due_on < issued_on {
                return Err(AppError::Validation(format!(
                    "due date {due_on} precedes issue date {issued_on}"
                )));
            }
        }

        Ok(Self {
            id,
            company_id,
            kind,
            number: NonEmptyString::new(number)?,
            issued_on,
            due_on,
            amount_minor,
            currency,
            status,
        })
    }

    /// Returns the document identifier.
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Returns the owning company.
    #[must_use]
    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    /// Returns the document kind.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Returns the document number.
    #[must_use]
    pub fn number(&self) -> &NonEmptyString {
        &self.number
    }

    /// Returns the issue date.
    #[must_use]
    pub fn issued_on(&self) -> NaiveDate {
        self.issued_on
    }

    /// Returns the due date, if any.
    #[must_use]
    pub fn due_on(&self) -> Option<NaiveDate> {
        self.due_on
    }

    /// Returns the gross amount in minor currency units.
    #[must_use]
    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Returns the ISO 4217 currency code.
    #[must_use]
    pub fn currency(&self) -> &str {
        self.currency.as_str()
    }

    /// Returns the settlement status.
    #[must_use]
    pub fn status(&self) -> DocumentStatus {
        self.status
    }
}
