use axum::{extract::State, http::HeaderMap};

use crate::database::Profile;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ProfileService;
use crate::AppState;

/// GET /api/auth/me - Profile of the signed-in user
///
/// Expected Output:
/// ```json
/// {
///   "id": "user_uuid",
///   "email": "owner@example.com",
///   "name": "Owner",
///   "avatar_url": null,
///   "created_at": "2025-01-01T00:00:00Z"
/// }
/// ```
pub async fn me_get(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Profile> {
    let user = state.sessions.require_user(&headers).await?;
    let profile = ProfileService::new(state.store.clone()).current_profile(&user).await?;
    Ok(ApiResponse::success(profile))
}
