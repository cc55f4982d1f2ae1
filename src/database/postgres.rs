//! [`TenantStore`] over a direct Postgres connection.
//!
//! User calls run inside a transaction that assumes the `authenticated` role
//! and publishes the caller's claims as `request.jwt.claims`, which is what
//! the row-level security policies read (`auth.uid()`). Service calls run as
//! the pool's own role.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::{
    ActiveMembership, BackendError, Caller, Membership, NewMembership, NewTenant, PostRef,
    Profile, ReadReceipt, Tenant, TenantStore,
};
use crate::auth::AUTHENTICATED_ROLE;

const SCOPE_TO_USER: &str =
    "SELECT set_config('role', $1, true), set_config('request.jwt.claims', $2, true)";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    user_role: String,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self::with_user_role(pool, AUTHENTICATED_ROLE)
    }

    /// Database role assumed for user calls.
    pub fn with_user_role(pool: PgPool, user_role: impl Into<String>) -> Self {
        Self {
            pool,
            user_role: user_role.into(),
        }
    }

    /// Opens a transaction for `caller`. Failures here are never answers to
    /// the query itself, so they always surface as transport errors.
    async fn begin(&self, caller: Caller<'_>) -> Result<Transaction<'static, Postgres>, BackendError> {
        let mut tx = self.pool.begin().await.map_err(scope_failed)?;
        if let Caller::User(user) = caller {
            sqlx::query(SCOPE_TO_USER)
                .bind(&self.user_role)
                .bind(user.rls_claims().to_string())
                .execute(&mut *tx)
                .await
                .map_err(scope_failed)?;
        }
        Ok(tx)
    }
}

fn scope_failed(err: sqlx::Error) -> BackendError {
    BackendError::Transport(format!("failed to open scoped transaction: {}", err))
}

#[async_trait]
impl TenantStore for PgStore {
    fn has_service_credential(&self) -> bool {
        true
    }

    async fn find_post(&self, caller: Caller<'_>, post_id: &str) -> Result<Option<PostRef>, BackendError> {
        let mut tx = self.begin(caller).await?;
        let post = sqlx::query_as::<_, PostRef>(
            "SELECT id::text AS id, tenant_id::text AS tenant_id FROM posts WHERE id = $1::uuid LIMIT 1",
        )
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(post)
    }

    async fn upsert_read_receipt(&self, caller: Caller<'_>, receipt: &ReadReceipt) -> Result<(), BackendError> {
        let mut tx = self.begin(caller).await?;
        sqlx::query(
            r#"
            INSERT INTO read_receipts (tenant_id, post_id, user_id, read_at)
            VALUES ($1::uuid, $2::uuid, $3::uuid, $4)
            ON CONFLICT (post_id, user_id)
            DO UPDATE SET read_at = EXCLUDED.read_at, tenant_id = EXCLUDED.tenant_id
            "#,
        )
        .bind(&receipt.tenant_id)
        .bind(&receipt.post_id)
        .bind(&receipt.user_id)
        .bind(receipt.read_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_tenant(&self, caller: Caller<'_>, tenant: &NewTenant) -> Result<Tenant, BackendError> {
        let mut tx = self.begin(caller).await?;
        let row = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, slug, status)
            VALUES ($1, $2, $3)
            RETURNING id::text AS id, name, slug, status, created_at
            "#,
        )
        .bind(&tenant.name)
        .bind(&tenant.slug)
        .bind(&tenant.status)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn insert_membership(
        &self,
        caller: Caller<'_>,
        membership: &NewMembership,
    ) -> Result<Membership, BackendError> {
        let mut tx = self.begin(caller).await?;
        let row = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (tenant_id, user_id, role, status)
            VALUES ($1::uuid, $2::uuid, $3, $4)
            RETURNING id::text AS id, tenant_id::text AS tenant_id, user_id::text AS user_id,
                      role, status, created_at
            "#,
        )
        .bind(&membership.tenant_id)
        .bind(&membership.user_id)
        .bind(&membership.role)
        .bind(&membership.status)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn delete_tenant(&self, caller: Caller<'_>, tenant_id: &str) -> Result<(), BackendError> {
        let mut tx = self.begin(caller).await?;
        sqlx::query("DELETE FROM tenants WHERE id = $1::uuid")
            .bind(tenant_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_active_membership(
        &self,
        caller: Caller<'_>,
        user_id: &str,
    ) -> Result<Option<ActiveMembership>, BackendError> {
        let mut tx = self.begin(caller).await?;
        let row = sqlx::query_as::<_, ActiveMembership>(
            r#"
            SELECT m.tenant_id::text AS tenant_id, m.role, t.slug
            FROM memberships m
            JOIN tenants t ON t.id = m.tenant_id
            WHERE m.user_id = $1::uuid AND m.status = 'active'
            ORDER BY m.created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn find_profile(&self, caller: Caller<'_>, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let mut tx = self.begin(caller).await?;
        let row = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id::text AS id, email, name, avatar_url, created_at, updated_at
            FROM profiles
            WHERE id = $1::uuid
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn sample_tenants(&self, caller: Caller<'_>) -> Result<usize, BackendError> {
        let mut tx = self.begin(caller).await?;
        let rows = sqlx::query("SELECT 1 FROM tenants LIMIT 1")
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(rows.len())
    }
}
