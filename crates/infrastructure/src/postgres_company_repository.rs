//! PostgreSQL-backed company repository.

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use billport_application::CompanyRepository;
use billport_core::{AppError, AppResult};
use billport_domain::{Company, CompanyId, CompanyKind, DocumentFilter};

/// PostgreSQL implementation of the company repository port.
#[derive(Clone)]
pub struct PostgresCompanyRepository {
    pool: PgPool,
}

impl PostgresCompanyRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    kind: String,
    parent_id: Option<Uuid>,
    active: bool,
    reference: Option<String>,
    notify_by_email: bool,
}

impl TryFrom<CompanyRow> for Company {
    type Error = AppError;

    fn try_from(row: CompanyRow) -> Result<Self, Self::Error> {
        Company::new(
            CompanyId::from_uuid(row.id),
            row.name,
            CompanyKind::from_str(row.kind.as_str())?,
            row.parent_id.map(CompanyId::from_uuid),
            row.active,
            row.reference,
            row.notify_by_email,
        )
    }
}

fn bindable_ids(ids: &BTreeSet<CompanyId>) -> Vec<Uuid> {
    ids.iter().map(CompanyId::as_uuid).collect()
}

#[async_trait]
impl CompanyRepository for PostgresCompanyRepository {
    async fn find_company(&self, id: CompanyId) -> AppResult<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, name, kind, parent_id, active, reference, notify_by_email
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load company '{id}': {error}")))?;

        row.map(Company::try_from).transpose()
    }

    async fn list_children(&self, parent_id: CompanyId) -> AppResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, name, kind, parent_id, active, reference, notify_by_email
            FROM companies
            WHERE parent_id = $1
            ORDER BY name
            "#,
        )
        .bind(parent_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list children of company '{parent_id}': {error}"
            ))
        })?;

        rows.into_iter().map(Company::try_from).collect()
    }

    async fn list_companies(&self) -> AppResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(
            r#"
            SELECT id, name, kind, parent_id, active, reference, notify_by_email
            FROM companies
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list companies: {error}")))?;

        rows.into_iter().map(Company::try_from).collect()
    }

    async fn count_companies(&self, filter: &DocumentFilter) -> AppResult<u64> {
        let count = match filter {
            DocumentFilter::Unrestricted => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM companies")
                    .fetch_one(&self.pool)
                    .await
            }
            DocumentFilter::CompanyIn(ids) => {
                // An empty id list binds an empty array and matches no rows.
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM companies WHERE id = ANY($1)")
                    .bind(bindable_ids(ids))
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|error| AppError::Internal(format!("failed to count companies: {error}")))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert_company(&self, company: &Company) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO companies (id, name, kind, parent_id, active, reference, notify_by_email)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(company.id().as_uuid())
        .bind(company.name().as_str())
        .bind(company.kind().as_str())
        .bind(company.parent_id().map(|parent_id| parent_id.as_uuid()))
        .bind(company.is_active())
        .bind(company.reference())
        .bind(company.notify_by_email())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to insert company '{}': {error}",
                company.id()
            ))
        })?;

        Ok(())
    }

    async fn update_parent(&self, id: CompanyId, parent_id: CompanyId) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE companies
            SET parent_id = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(parent_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to re-parent company '{id}': {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("company '{id}' not found")));
        }

        Ok(())
    }

    async fn set_company_active(&self, id: CompanyId, active: bool) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE companies
            SET active = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to update company '{id}': {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("company '{id}' not found")));
        }

        Ok(())
    }

    async fn delete_company(&self, id: CompanyId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete company '{id}': {error}"))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("company '{id}' not found")));
        }

        Ok(())
    }
}
