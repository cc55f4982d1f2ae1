use std::sync::Arc;

use tracing::{error, info, warn};

use crate::auth::AuthUser;
use crate::database::{BackendError, Caller, NewMembership, NewTenant, Tenant, TenantStore};
use crate::error::ApiError;
use crate::validation::CreateTenantRequest;

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Tenant slug already taken: {0}")]
    SlugTaken(String),
    #[error("Admin membership for tenant {tenant_id} failed: {source}")]
    MembershipFailed {
        tenant_id: String,
        source: BackendError,
    },
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::SlugTaken(_) => ApiError::conflict("A tenant with this slug already exists"),
            TenantError::MembershipFailed { .. } => ApiError::internal_server_error(
                "Tenant was created but the admin membership could not be assigned",
            ),
            TenantError::Backend(e) => e.into(),
        }
    }
}

pub struct TenantService {
    store: Arc<dyn TenantStore>,
}

impl TenantService {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }

    /// Create a trial tenant and make `user` its administrator.
    ///
    /// Both inserts run with the service role. There is no cross-call
    /// transaction, so a failed membership insert is compensated by deleting
    /// the tenant it would have belonged to.
    pub async fn create_with_admin(
        &self,
        user: &AuthUser,
        request: &CreateTenantRequest,
    ) -> Result<Tenant, TenantError> {
        let new_tenant = NewTenant::trial(&request.name, &request.slug);

        let tenant = self
            .store
            .insert_tenant(Caller::Service, &new_tenant)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    warn!("Tenant slug '{}' already exists", new_tenant.slug);
                    TenantError::SlugTaken(new_tenant.slug.clone())
                } else {
                    TenantError::Backend(e)
                }
            })?;

        let membership = NewMembership::tenant_admin(&tenant.id, &user.id);
        if let Err(source) = self.store.insert_membership(Caller::Service, &membership).await {
            error!("Failed to assign admin {} to tenant {}: {}", user.id, tenant.id, source);
            self.discard_tenant(&tenant.id).await;
            return Err(TenantError::MembershipFailed {
                tenant_id: tenant.id,
                source,
            });
        }

        info!("Created tenant '{}' ({}) with admin {}", tenant.slug, tenant.id, user.id);
        Ok(tenant)
    }

    async fn discard_tenant(&self, tenant_id: &str) {
        match self.store.delete_tenant(Caller::Service, tenant_id).await {
            Ok(()) => info!("Removed orphaned tenant {}", tenant_id),
            Err(e) => error!("Orphaned tenant {} could not be removed: {}", tenant_id, e),
        }
    }
}
