//! PostgreSQL-backed portal-user repository.

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use billport_application::UserRepository;
use billport_core::{AppError, AppResult};
use billport_domain::{CompanyId, DocumentFilter, EmailAddress, PortalUser, Role, UserId};

/// PostgreSQL implementation of the portal-user repository port.
///
/// Company assignments live in a join table; the scoping filter is applied
/// with an `EXISTS` clause over that table, so a user matches when any of
/// their assignments falls inside the filter.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn assignments_for(
        &self,
        user_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, BTreeSet<CompanyId>>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid)>(
            r#"
            SELECT user_id, company_id
            FROM user_company_assignments
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load company assignments: {error}"))
        })?;

        let mut assignments: HashMap<Uuid, BTreeSet<CompanyId>> = HashMap::new();
        for (user_id, company_id) in rows {
            assignments
                .entry(user_id)
                .or_default()
                .insert(CompanyId::from_uuid(company_id));
        }

        Ok(assignments)
    }

    async fn hydrate(&self, rows: Vec<UserRow>) -> AppResult<Vec<PortalUser>> {
        let user_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut assignments = self.assignments_for(&user_ids).await?;

        rows.into_iter()
            .map(|row| {
                let assigned = assignments.remove(&row.id).unwrap_or_default();
                row.into_user(assigned)
            })
            .collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    role: String,
    active: bool,
}

impl UserRow {
    fn into_user(self, assigned_companies: BTreeSet<CompanyId>) -> AppResult<PortalUser> {
        PortalUser::new(
            UserId::from_uuid(self.id),
            EmailAddress::new(self.email)?,
            self.display_name,
            Role::from_str(self.role.as_str())?,
            assigned_companies,
            self.active,
        )
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user(&self, id: UserId) -> AppResult<Option<PortalUser>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, display_name, role, active
            FROM portal_users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load user '{id}': {error}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let assignments = self.assignments_for(&[row.id]).await?;
        let assigned = assignments
            .get(&row.id)
            .cloned()
            .unwrap_or_default();
        Ok(Some(row.into_user(assigned)?))
    }

    async fn find_user_by_email(&self, email: &EmailAddress) -> AppResult<Option<PortalUser>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, display_name, role, active
            FROM portal_users
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load user by email '{}': {error}",
                email.as_str()
            ))
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let assignments = self.assignments_for(&[row.id]).await?;
        let assigned = assignments
            .get(&row.id)
            .cloned()
            .unwrap_or_default();
        Ok(Some(row.into_user(assigned)?))
    }

    async fn list_users(&self, filter: &DocumentFilter) -> AppResult<Vec<PortalUser>> {
        let rows = match filter {
            DocumentFilter::Unrestricted => {
                sqlx::query_as::<_, UserRow>(
                    r#"
                    SELECT id, email, display_name, role, active
                    FROM portal_users
                    ORDER BY email
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
            DocumentFilter::CompanyIn(ids) => {
                let ids: Vec<Uuid> = ids.iter().map(CompanyId::as_uuid).collect();
                sqlx::query_as::<_, UserRow>(
                    r#"
                    SELECT u.id, u.email, u.display_name, u.role, u.active
                    FROM portal_users u
                    WHERE EXISTS (
                        SELECT 1
                        FROM user_company_assignments a
                        WHERE a.user_id = u.id AND a.company_id = ANY($1)
                    )
                    ORDER BY u.email
                    "#,
                )
                .bind(ids)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|error| AppError::Internal(format!("failed to list users: {error}")))?;

        self.hydrate(rows).await
    }

    async fn count_users(&self, filter: &DocumentFilter) -> AppResult<u64> {
        let count = match filter {
            DocumentFilter::Unrestricted => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM portal_users")
                    .fetch_one(&self.pool)
                    .await
            }
            DocumentFilter::CompanyIn(ids) => {
                let ids: Vec<Uuid> = ids.iter().map(CompanyId::as_uuid).collect();
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*)
                    FROM portal_users u
                    WHERE EXISTS (
                        SELECT 1
                        FROM user_company_assignments a
                        WHERE a.user_id = u.id AND a.company_id = ANY($1)
                    )
                    "#,
                )
                .bind(ids)
                .fetch_one(&self.pool)
                .await
            }
        }
        .map_err(|error| AppError::Internal(format!("failed to count users: {error}")))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert_user(&self, user: &PortalUser) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        sqlx::query(
            r#"
            INSERT INTO portal_users (id, email, display_name, role, active)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email().as_str())
        .bind(user.display_name().as_str())
        .bind(user.role().as_str())
        .bind(user.is_active())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to insert user '{}': {error}", user.id()))
        })?;

        let company_ids: Vec<Uuid> = user
            .assigned_companies()
            .iter()
            .map(CompanyId::as_uuid)
            .collect();
        sqlx::query(
            r#"
            INSERT INTO user_company_assignments (user_id, company_id)
            SELECT $1, unnest($2::uuid[])
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(company_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to insert company assignments for user '{}': {error}",
                user.id()
            ))
        })?;

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    async fn update_role(&self, id: UserId, role: Role) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE portal_users
            SET role = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to update role of user '{id}': {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user '{id}' not found")));
        }

        Ok(())
    }

    async fn update_assigned_companies(
        &self,
        id: UserId,
        assigned_companies: &BTreeSet<CompanyId>,
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        sqlx::query("DELETE FROM user_company_assignments WHERE user_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to clear company assignments for user '{id}': {error}"
                ))
            })?;

        let company_ids: Vec<Uuid> = assigned_companies.iter().map(CompanyId::as_uuid).collect();
        sqlx::query(
            r#"
            INSERT INTO user_company_assignments (user_id, company_id)
            SELECT $1, unnest($2::uuid[])
            "#,
        )
        .bind(id.as_uuid())
        .bind(company_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to insert company assignments for user '{id}': {error}"
            ))
        })?;

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
    }

    async fn set_user_active(&self, id: UserId, active: bool) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE portal_users
            SET active = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(active)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update user '{id}': {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user '{id}' not found")));
        }

        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM portal_users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete user '{id}': {error}"))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("user '{id}' not found")));
        }

        Ok(())
    }
}
