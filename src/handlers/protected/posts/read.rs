use axum::{
    extract::{Path, State},
    http::HeaderMap,
};
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::ReadReceiptService;
use crate::validation::validate_post_id;
use crate::AppState;

/// POST /api/posts/:post_id/read - Mark a post as read by the caller
///
/// Idempotent: repeating it only refreshes the receipt's `read_at`.
pub async fn post_read(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Value> {
    validate_post_id(&post_id)?;
    let user = state.sessions.require_user(&headers).await?;

    ReadReceiptService::new(state.store.clone())
        .mark_read(&user, &post_id)
        .await?;

    Ok(ApiResponse::success(json!({ "message": "Post marked as read" })))
}
