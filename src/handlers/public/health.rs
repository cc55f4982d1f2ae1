use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

/// GET / - Service information
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Franchise Communications API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health (public)",
            "auth_callback": "GET /auth/callback (public)",
            "me": "GET /api/auth/me (session)",
            "tenants": "POST /api/tenants (session)",
            "read_receipts": "POST /api/posts/:post_id/read (session)",
            "diagnostics": "GET /api/test-admin (service role)",
        }
    }))
}

/// GET /health - Liveness check
///
/// Does not call the backend, so it stays green while the database is
/// unreachable.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}
