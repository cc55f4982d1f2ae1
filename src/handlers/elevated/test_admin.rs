use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::error;

use crate::database::Caller;
use crate::error::ApiError;
use crate::AppState;

/// GET /api/test-admin - Service role connectivity check
///
/// Unlike every other endpoint this one echoes backend error details, which
/// is why it is disabled by default in production.
pub async fn test_admin_get(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if !state.store.has_service_credential() {
        return Err(ApiError::internal_server_error(
            "Service role key is not configured",
        ));
    }

    let tenant_rows = state.store.sample_tenants(Caller::Service).await.map_err(|e| {
        error!("Admin tenant query failed: {}", e);
        ApiError::internal_server_error(format!("Admin query failed: {}", e))
    })?;

    Ok(Json(json!({
        "status": "ok",
        "service_role_configured": true,
        "backend_url_configured": true,
        "query_ok": true,
        "tenant_rows": tenant_rows,
    })))
}
