//! Client for the managed auth service (GoTrue-compatible API).
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/auth/v1/user` | Resolve the user behind an access token |
//! | POST   | `/auth/v1/token?grant_type=pkce` | Exchange an authorization code |

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{verify_access_token, AuthError, AuthProvider, AuthSession, AuthUser};
use crate::config::SupabaseConfig;

#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    user_url: Url,
    token_url: Url,
    anon_key: String,
    jwt_secret: Option<String>,
}

impl std::fmt::Debug for GoTrueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoTrueClient")
            .field("user_url", &self.user_url.as_str())
            .field("local_verification", &self.jwt_secret.is_some())
            .finish()
    }
}

#[derive(Serialize)]
struct PkceExchange<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

impl GoTrueClient {
    pub fn new(http: reqwest::Client, config: &SupabaseConfig) -> Result<Self, url::ParseError> {
        let mut token_url = config.endpoint("auth/v1/token")?;
        token_url.query_pairs_mut().append_pair("grant_type", "pkce");

        Ok(Self {
            http,
            user_url: config.endpoint("auth/v1/user")?,
            token_url,
            anon_key: config.anon_key.clone(),
            jwt_secret: config.jwt_secret.clone(),
        })
    }

    async fn fetch_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let resp = self
            .http
            .get(self.user_url.clone())
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }

        let mut user: AuthUser = resp
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("undecodable user payload: {}", e)))?;
        user.access_token = access_token.to_string();
        Ok(user)
    }
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        match &self.jwt_secret {
            Some(secret) => {
                verify_access_token(access_token, secret).map(|claims| claims.into_user(access_token))
            }
            None => self.fetch_user(access_token).await,
        }
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthError> {
        let resp = self
            .http
            .post(self.token_url.clone())
            .header("apikey", &self.anon_key)
            .json(&PkceExchange { auth_code, code_verifier })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(rejected(resp).await);
        }

        let mut session: AuthSession = resp
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("undecodable session payload: {}", e)))?;
        session.user.access_token = session.access_token.clone();
        Ok(session)
    }
}

async fn rejected(resp: reqwest::Response) -> AuthError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    AuthError::Rejected {
        status,
        message: error_message(&body),
    }
}

/// The auth service reports errors under several shapes depending on the
/// endpoint; take the most descriptive field present.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
