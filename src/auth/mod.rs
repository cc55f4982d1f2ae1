use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub mod gotrue;

pub use gotrue::GoTrueClient;

/// Audience and database role carried by end-user access tokens.
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// Authenticated principal, as reported by the auth service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Bearer token the user presented; forwarded so row-level security
    /// evaluates queries as this user.
    #[serde(skip)]
    pub access_token: String,
}

impl AuthUser {
    /// Claims published to Postgres as `request.jwt.claims`.
    pub fn rls_claims(&self) -> Value {
        json!({
            "sub": self.id,
            "role": self.role.as_deref().unwrap_or(AUTHENTICATED_ROLE),
            "email": self.email,
            "aud": AUTHENTICATED_ROLE,
        })
    }

    /// First non-empty string among the given `user_metadata` keys.
    pub fn metadata_str(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.user_metadata.get(*k).and_then(Value::as_str))
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Tokens returned by a successful code exchange.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// Claims of an access token minted by the auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub user_metadata: Value,
}

impl Claims {
    pub fn into_user(self, access_token: &str) -> AuthUser {
        AuthUser {
            id: self.sub,
            email: self.email,
            role: self.role,
            user_metadata: self.user_metadata,
            created_at: None,
            access_token: access_token.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid access token: {0}")]
    InvalidToken(String),
    #[error("Auth service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Auth service unreachable: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Transport(err.to_string())
    }
}

/// Managed auth service operations used by the handlers.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the user owning `access_token`.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    /// Trade a PKCE authorization code for a session.
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthError>;
}

/// Verify an HS256 access token locally against the project's JWT secret.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::InvalidToken("JWT secret not configured".to_string()));
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUTHENTICATED_ROLE]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims)
}
