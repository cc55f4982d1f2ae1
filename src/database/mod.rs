//! Tenant-scoped data access.
//!
//! Every call names its [`Caller`]: an end user, whose queries are filtered by
//! the database's row-level security policies, or the privileged service
//! role, which bypasses them. Access control itself lives in the database.

use async_trait::async_trait;

use crate::auth::AuthUser;

pub mod error;
pub mod manager;
pub mod models;
pub mod postgres;
pub mod rest;

pub use error::{BackendError, UNIQUE_VIOLATION};
pub use manager::DatabaseManager;
pub use models::{
    ActiveMembership, Membership, NewMembership, NewTenant, PostRef, Profile, ReadReceipt, Tenant,
};
pub use postgres::PgStore;
pub use rest::PostgrestStore;

/// Identity a query runs under.
#[derive(Debug, Clone, Copy)]
pub enum Caller<'a> {
    User(&'a AuthUser),
    Service,
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Whether service-role calls can be made at all.
    fn has_service_credential(&self) -> bool;

    async fn find_post(
        &self,
        caller: Caller<'_>,
        post_id: &str,
    ) -> Result<Option<PostRef>, BackendError>;

    /// Insert or refresh the receipt for `(post_id, user_id)`.
    async fn upsert_read_receipt(
        &self,
        caller: Caller<'_>,
        receipt: &ReadReceipt,
    ) -> Result<(), BackendError>;

    async fn insert_tenant(
        &self,
        caller: Caller<'_>,
        tenant: &NewTenant,
    ) -> Result<Tenant, BackendError>;

    async fn insert_membership(
        &self,
        caller: Caller<'_>,
        membership: &NewMembership,
    ) -> Result<Membership, BackendError>;

    async fn delete_tenant(&self, caller: Caller<'_>, tenant_id: &str) -> Result<(), BackendError>;

    /// Oldest active membership of `user_id`, with its tenant's slug.
    async fn find_active_membership(
        &self,
        caller: Caller<'_>,
        user_id: &str,
    ) -> Result<Option<ActiveMembership>, BackendError>;

    async fn find_profile(
        &self,
        caller: Caller<'_>,
        user_id: &str,
    ) -> Result<Option<Profile>, BackendError>;

    /// Read at most one tenant row; returns how many came back.
    async fn sample_tenants(&self, caller: Caller<'_>) -> Result<usize, BackendError>;
}
