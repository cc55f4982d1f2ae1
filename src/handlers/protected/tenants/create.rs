use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use tracing::debug;

use crate::database::Tenant;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::TenantService;
use crate::validation::CreateTenantRequest;
use crate::AppState;

/// POST /api/tenants - Create a tenant owned by the caller
///
/// Expected Input:
/// ```json
/// { "name": "Acme Franchise", "slug": "acme" }
/// ```
///
/// Responds `201` with the tenant row. The caller becomes its
/// `tenant_admin`.
pub async fn tenant_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateTenantRequest>, JsonRejection>,
) -> ApiResult<Tenant> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected tenant payload: {}", rejection);
        ApiError::bad_request("Invalid JSON body")
    })?;
    request.validate()?;

    let user = state.sessions.require_user(&headers).await?;

    let tenant = TenantService::new(state.store.clone())
        .create_with_admin(&user, &request)
        .await?;

    Ok(ApiResponse::created(tenant))
}
