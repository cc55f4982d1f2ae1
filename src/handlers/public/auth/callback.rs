use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::database::{ActiveMembership, Caller};
use crate::AppState;

pub const AUTH_ERROR_PATH: &str = "/auth/auth-code-error";
pub const ONBOARDING_PATH: &str = "/onboarding";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /auth/callback - Complete a PKCE sign-in
///
/// Exchanges the authorization code for a session, stores the tokens as
/// HttpOnly cookies and redirects to the user's first tenant dashboard, or
/// to onboarding when the user belongs to no tenant yet.
pub async fn callback_get(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
    jar: CookieJar,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            warn!("Unparseable auth callback query: {}", rejection);
            return redirect(&state, jar, AUTH_ERROR_PATH);
        }
    };

    if let Some(error) = &query.error {
        warn!(
            "Auth provider returned error '{}': {}",
            error,
            query.error_description.as_deref().unwrap_or("")
        );
        return redirect(&state, jar, AUTH_ERROR_PATH);
    }

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        warn!("Auth callback without an authorization code");
        return redirect(&state, jar, AUTH_ERROR_PATH);
    };

    let security = &state.config.security;
    let Some(verifier) = jar
        .get(&security.code_verifier_cookie)
        .map(|c| unquote(c.value()))
        .filter(|v| !v.is_empty())
    else {
        warn!("Auth callback without a code verifier cookie");
        return redirect(&state, jar, AUTH_ERROR_PATH);
    };

    let session = match state.auth.exchange_code_for_session(code, &verifier).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Code exchange failed: {}", e);
            return redirect(&state, jar, AUTH_ERROR_PATH);
        }
    };

    let mut jar = jar
        .remove(Cookie::build((security.code_verifier_cookie.clone(), "")).path("/"))
        .add(session_cookie(security, &security.access_cookie, session.access_token.clone()));
    if let Some(refresh) = session.refresh_token.clone() {
        jar = jar.add(session_cookie(security, &security.refresh_cookie, refresh));
    }

    let membership = state
        .store
        .find_active_membership(Caller::User(&session.user), &session.user.id)
        .await;
    let target = match membership {
        Ok(Some(membership)) => {
            info!("User {} signed in to tenant '{}'", session.user.id, membership.slug);
            landing_path(&membership, query.next.as_deref())
        }
        Ok(None) => {
            info!("User {} has no active membership", session.user.id);
            ONBOARDING_PATH.to_string()
        }
        Err(e) => {
            warn!("Membership lookup for {} failed: {}", session.user.id, e);
            ONBOARDING_PATH.to_string()
        }
    };

    redirect(&state, jar, &target)
}

/// Dashboard of the membership's tenant, or `next` when it stays inside
/// that tenant. `next` must be printable ASCII so it can travel in the
/// `Location` header unchanged.
pub fn landing_path(membership: &ActiveMembership, next: Option<&str>) -> String {
    let prefix = format!("/tenant/{}/", membership.slug);
    match next {
        Some(next)
            if next.starts_with(&prefix)
                && next.bytes().all(|b| b.is_ascii_graphic())
                && !next.contains("..")
                && !next.contains('\\') =>
        {
            next.to_string()
        }
        _ => format!("{}dashboard", prefix),
    }
}

fn session_cookie(security: &SecurityConfig, name: &str, value: String) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(security.secure_cookies)
        .same_site(SameSite::Lax)
        .build()
}

/// Browser clients may store the verifier as a JSON string literal.
fn unquote(value: &str) -> String {
    serde_json::from_str::<String>(value).unwrap_or_else(|_| value.to_string())
}

fn redirect(state: &AppState, jar: CookieJar, path: &str) -> Response {
    let location = state.config.redirect_url(path);
    let location = HeaderValue::from_str(&location).unwrap_or_else(|_| {
        warn!("Redirect target {:?} is not a valid header value", location);
        HeaderValue::from_static(AUTH_ERROR_PATH)
    });
    (StatusCode::FOUND, jar, [(header::LOCATION, location)]).into_response()
}
