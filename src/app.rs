use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::handlers::{elevated, protected, public};
use crate::AppState;

/// Assemble the HTTP application.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_public_routes())
        // Session required
        .merge(protected_routes());

    if state.config.api.enable_admin_diagnostics {
        router = router.merge(elevated_routes());
    }

    let mut router = router
        .fallback(route_not_found)
        .layer(cors_layer(&state.config.security));

    if state.config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    Router::new().route("/auth/callback", get(public::callback_get))
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/me", get(protected::me_get))
        .route("/api/tenants", post(protected::tenant_create))
        .route("/api/posts/:post_id/read", post(protected::post_read))
}

fn elevated_routes() -> Router<AppState> {
    Router::new().route("/api/test-admin", get(elevated::test_admin_get))
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
