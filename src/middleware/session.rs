use std::sync::Arc;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use crate::auth::{AuthProvider, AuthUser};
use crate::error::ApiError;

/// Resolves the caller of a request from its bearer token or session cookie.
///
/// Handlers call this after validating their input, so malformed requests are
/// rejected without touching the auth service.
#[derive(Clone)]
pub struct SessionResolver {
    auth: Arc<dyn AuthProvider>,
    access_cookie: String,
}

impl SessionResolver {
    pub fn new(auth: Arc<dyn AuthProvider>, access_cookie: impl Into<String>) -> Self {
        Self {
            auth,
            access_cookie: access_cookie.into(),
        }
    }

    /// Access token from `Authorization: Bearer`, falling back to the
    /// session cookie when no authorization header is sent.
    pub fn access_token(&self, headers: &HeaderMap) -> Result<String, String> {
        if headers.contains_key("authorization") {
            return extract_bearer(headers);
        }

        CookieJar::from_headers(headers)
            .get(&self.access_cookie)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| "No session credentials".to_string())
    }

    /// The authenticated user, or `None` for any failure.
    pub async fn resolve(&self, headers: &HeaderMap) -> Option<AuthUser> {
        let token = match self.access_token(headers) {
            Ok(token) => token,
            Err(reason) => {
                debug!("No session: {}", reason);
                return None;
            }
        };

        match self.auth.get_user(&token).await {
            Ok(user) => Some(user),
            Err(e) => {
                debug!("Session rejected: {}", e);
                None
            }
        }
    }

    pub async fn require_user(&self, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
        self.resolve(headers)
            .await
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer(headers: &HeaderMap) -> Result<String, String> {
    let auth_str = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
