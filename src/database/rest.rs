//! [`TenantStore`] over the PostgREST data API (`/rest/v1`).
//!
//! User calls send the anon key as `apikey` and the user's access token as
//! the bearer, so PostgREST switches to the `authenticated` role and row-level
//! security applies. Service calls send the service role key in both places.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{
    ActiveMembership, BackendError, Caller, Membership, NewMembership, NewTenant, PostRef,
    Profile, ReadReceipt, Tenant, TenantStore,
};
use crate::config::SupabaseConfig;

const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";
const UPSERT_MERGE: &str = "resolution=merge-duplicates,return=minimal";

#[derive(Clone)]
pub struct PostgrestStore {
    http: reqwest::Client,
    rest_url: Url,
    anon_key: String,
    service_role_key: Option<String>,
}

impl std::fmt::Debug for PostgrestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestStore")
            .field("rest_url", &self.rest_url.as_str())
            .field("service_role_key", &self.service_role_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Membership row with its embedded tenant, as returned by
/// `select=tenant_id,role,tenants(slug)`.
#[derive(Debug, Deserialize)]
struct MembershipWithTenant {
    tenant_id: String,
    role: String,
    #[serde(default)]
    tenants: Option<TenantSlug>,
}

#[derive(Debug, Deserialize)]
struct TenantSlug {
    slug: String,
}

impl PostgrestStore {
    pub fn new(http: reqwest::Client, config: &SupabaseConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            http,
            rest_url: config.endpoint("rest/v1/")?,
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        self.rest_url
            .join(table)
            .map_err(|e| BackendError::Transport(format!("invalid table url for {}: {}", table, e)))
    }

    fn authorize(&self, req: RequestBuilder, caller: Caller<'_>) -> Result<RequestBuilder, BackendError> {
        match caller {
            Caller::User(user) => Ok(req.header("apikey", &self.anon_key).bearer_auth(&user.access_token)),
            Caller::Service => {
                let key = self
                    .service_role_key
                    .as_ref()
                    .ok_or(BackendError::MissingServiceCredential)?;
                Ok(req.header("apikey", key).bearer_auth(key))
            }
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        caller: Caller<'_>,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, BackendError> {
        let req = self.http.get(self.table_url(table)?).query(query);
        let resp = self.authorize(req, caller)?.send().await?;
        rows(resp).await
    }

    async fn insert_one<B, T>(&self, caller: Caller<'_>, table: &str, body: &B) -> Result<T, BackendError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self
            .http
            .post(self.table_url(table)?)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(body);
        let resp = self.authorize(req, caller)?.send().await?;
        rows(resp)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Transport(format!("insert into {} returned no row", table)))
    }
}

#[async_trait]
impl TenantStore for PostgrestStore {
    fn has_service_credential(&self) -> bool {
        self.service_role_key.is_some()
    }

    async fn find_post(&self, caller: Caller<'_>, post_id: &str) -> Result<Option<PostRef>, BackendError> {
        let id = format!("eq.{}", post_id);
        let posts: Vec<PostRef> = self
            .select(caller, "posts", &[("select", "id,tenant_id"), ("id", id.as_str()), ("limit", "1")])
            .await?;
        Ok(posts.into_iter().next())
    }

    async fn upsert_read_receipt(&self, caller: Caller<'_>, receipt: &ReadReceipt) -> Result<(), BackendError> {
        let req = self
            .http
            .post(self.table_url("read_receipts")?)
            .query(&[("on_conflict", "post_id,user_id")])
            .header("Prefer", UPSERT_MERGE)
            .json(receipt);
        let resp = self.authorize(req, caller)?.send().await?;
        ensure_success(resp).await
    }

    async fn insert_tenant(&self, caller: Caller<'_>, tenant: &NewTenant) -> Result<Tenant, BackendError> {
        self.insert_one(caller, "tenants", tenant).await
    }

    async fn insert_membership(
        &self,
        caller: Caller<'_>,
        membership: &NewMembership,
    ) -> Result<Membership, BackendError> {
        self.insert_one(caller, "memberships", membership).await
    }

    async fn delete_tenant(&self, caller: Caller<'_>, tenant_id: &str) -> Result<(), BackendError> {
        let id = format!("eq.{}", tenant_id);
        let req = self
            .http
            .delete(self.table_url("tenants")?)
            .query(&[("id", id.as_str())])
            .header("Prefer", RETURN_MINIMAL);
        let resp = self.authorize(req, caller)?.send().await?;
        ensure_success(resp).await
    }

    async fn find_active_membership(
        &self,
        caller: Caller<'_>,
        user_id: &str,
    ) -> Result<Option<ActiveMembership>, BackendError> {
        let user = format!("eq.{}", user_id);
        let memberships: Vec<MembershipWithTenant> = self
            .select(
                caller,
                "memberships",
                &[
                    ("select", "tenant_id,role,tenants(slug)"),
                    ("user_id", user.as_str()),
                    ("status", "eq.active"),
                    ("order", "created_at.asc"),
                    ("limit", "1"),
                ],
            )
            .await?;

        Ok(memberships.into_iter().find_map(|m| {
            m.tenants.map(|t| ActiveMembership {
                tenant_id: m.tenant_id,
                role: m.role,
                slug: t.slug,
            })
        }))
    }

    async fn find_profile(&self, caller: Caller<'_>, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let id = format!("eq.{}", user_id);
        let profiles: Vec<Profile> = self
            .select(
                caller,
                "profiles",
                &[
                    ("select", "id,email,name,avatar_url,created_at,updated_at"),
                    ("id", id.as_str()),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(profiles.into_iter().next())
    }

    async fn sample_tenants(&self, caller: Caller<'_>) -> Result<usize, BackendError> {
        let rows: Vec<Value> = self
            .select(caller, "tenants", &[("select", "id"), ("limit", "1")])
            .await?;
        Ok(rows.len())
    }
}

async fn rows<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Vec<T>, BackendError> {
    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }
    resp.json()
        .await
        .map_err(|e| BackendError::Transport(format!("undecodable response: {}", e)))
}

async fn ensure_success(resp: reqwest::Response) -> Result<(), BackendError> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(api_error(resp).await)
    }
}

async fn api_error(resp: reqwest::Response) -> BackendError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let parsed: PostgrestError = serde_json::from_str(&body).unwrap_or_default();

    let message = match (parsed.message, parsed.details) {
        (Some(message), Some(details)) => format!("{} ({})", message, details),
        (Some(message), None) => message,
        (None, _) => body,
    };

    BackendError::Api {
        status,
        code: parsed.code,
        message,
    }
}
