//! PostgreSQL-backed billing-document repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use billport_application::{DocumentQuery, DocumentRepository};
use billport_core::{AppError, AppResult};
use billport_domain::{
    BillingDocument, CompanyId, DocumentFilter, DocumentId, DocumentKind, DocumentStatus,
};

/// PostgreSQL implementation of the billing-document repository port.
#[derive(Clone)]
pub struct PostgresDocumentRepository {
    pool: PgPool,
}

impl PostgresDocumentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    company_id: Uuid,
    kind: String,
    number: String,
    issued_on: NaiveDate,
    due_on: Option<NaiveDate>,
    amount_minor: i64,
    currency: String,
    status: String,
}

impl TryFrom<DocumentRow> for BillingDocument {
    type Error = AppError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        BillingDocument::new(
            DocumentId::from_uuid(row.id),
            CompanyId::from_uuid(row.company_id),
            DocumentKind::from_str(row.kind.as_str())?,
            row.number,
            row.issued_on,
            row.due_on,
            row.amount_minor,
            row.currency,
            DocumentStatus::from_str(row.status.as_str())?,
        )
    }
}

/// Appends the scoping clause for the filter.
///
/// The empty company set binds an empty array, which matches no rows.
fn push_scope_clause(builder: &mut QueryBuilder<'_, Postgres>, filter: &DocumentFilter) {
    match filter {
        DocumentFilter::Unrestricted => {}
        DocumentFilter::CompanyIn(ids) => {
            let ids: Vec<Uuid> = ids.iter().map(CompanyId::as_uuid).collect();
            builder.push(" AND company_id = ANY(");
            builder.push_bind(ids);
            builder.push(")");
        }
    }
}

#[async_trait]
impl DocumentRepository for PostgresDocumentRepository {
    async fn find_document(&self, id: DocumentId) -> AppResult<Option<BillingDocument>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, company_id, kind, number, issued_on, due_on, amount_minor, currency, status
            FROM billing_documents
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load document '{id}': {error}"))
        })?;

        row.map(BillingDocument::try_from).transpose()
    }

    async fn list_documents(
        &self,
        filter: &DocumentFilter,
        query: DocumentQuery,
    ) -> AppResult<Vec<BillingDocument>> {
        let limit = i64::try_from(query.limit).map_err(|error| {
            AppError::Validation(format!("invalid document query limit: {error}"))
        })?;
        let offset = i64::try_from(query.offset).map_err(|error| {
            AppError::Validation(format!("invalid document query offset: {error}"))
        })?;

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT id, company_id, kind, number, issued_on, due_on, amount_minor, currency, status \
             FROM billing_documents WHERE TRUE",
        );

        push_scope_clause(&mut builder, filter);

        if let Some(kind) = query.kind {
            builder.push(" AND kind = ");
            builder.push_bind(kind.as_str());
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }

        builder.push(" ORDER BY issued_on DESC, number");
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list documents: {error}")))?;

        rows.into_iter().map(BillingDocument::try_from).collect()
    }

    async fn count_documents(
        &self,
        filter: &DocumentFilter,
        kind: DocumentKind,
    ) -> AppResult<u64> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM billing_documents WHERE kind = ");
        builder.push_bind(kind.as_str());

        push_scope_clause(&mut builder, filter);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to count documents: {error}")))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests;
