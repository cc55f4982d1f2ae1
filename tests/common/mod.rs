#![allow(dead_code)]

use std::collections::HashMap;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use franchise_comms_api::auth::{AuthError, AuthProvider, AuthSession, AuthUser};
use franchise_comms_api::config::{AppConfig, Environment};
use franchise_comms_api::database::{
    ActiveMembership, BackendError, Caller, Membership, NewMembership, NewTenant, PostRef, Profile,
    ReadReceipt, Tenant, TenantStore, UNIQUE_VIOLATION,
};
use franchise_comms_api::{app, AppState};

pub const ALICE_TOKEN: &str = "alice-token";
pub const ALICE_ID: &str = "11111111-1111-1111-1111-111111111111";
pub const BOB_TOKEN: &str = "bob-token";
pub const BOB_ID: &str = "22222222-2222-2222-2222-222222222222";

pub const ACME_ID: &str = "aaaaaaaa-0000-0000-0000-000000000001";
pub const GLOBEX_ID: &str = "bbbbbbbb-0000-0000-0000-000000000002";
pub const ACME_POST: &str = "post-cccccccc-0000-0000-0000-000000000003";
pub const GLOBEX_POST: &str = "dddddddd-0000-0000-0000-000000000004";

// ---------------------------------------------------------------------------
// Auth service double
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeAuth {
    users: Mutex<HashMap<String, AuthUser>>,
    /// code -> (expected verifier, session)
    codes: Mutex<HashMap<String, (String, AuthSession)>>,
    pub get_user_calls: AtomicUsize,
    pub exchange_calls: AtomicUsize,
}

impl FakeAuth {
    pub fn with_user(self, token: &str, user: AuthUser) -> Self {
        self.users.lock().unwrap().insert(token.to_string(), user);
        self
    }

    pub fn with_code(self, code: &str, verifier: &str, session: AuthSession) -> Self {
        self.codes
            .lock()
            .unwrap()
            .insert(code.to_string(), (verifier.to_string(), session));
        self
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        let mut user = self
            .users
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| AuthError::Rejected {
                status: 401,
                message: "invalid JWT".into(),
            })?;
        user.access_token = access_token.to_string();
        Ok(user)
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, AuthError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        match self.codes.lock().unwrap().get(auth_code) {
            Some((verifier, session)) if verifier == code_verifier => Ok(session.clone()),
            _ => Err(AuthError::Rejected {
                status: 400,
                message: "invalid flow state".into(),
            }),
        }
    }
}

pub fn user(id: &str, email: &str) -> AuthUser {
    AuthUser {
        id: id.to_string(),
        email: Some(email.to_string()),
        role: Some("authenticated".to_string()),
        user_metadata: serde_json::json!({}),
        created_at: None,
        access_token: String::new(),
    }
}

pub fn session_for(user: AuthUser, access_token: &str) -> AuthSession {
    let mut user = user;
    user.access_token = access_token.to_string();
    AuthSession {
        access_token: access_token.to_string(),
        refresh_token: Some(format!("{}-refresh", access_token)),
        expires_in: Some(3600),
        user,
    }
}

// ---------------------------------------------------------------------------
// Data backend double
// ---------------------------------------------------------------------------

/// In-memory tables with row-level security approximated as "a user sees
/// rows of tenants they hold an active membership in".
#[derive(Default)]
pub struct Tables {
    pub tenants: Vec<Tenant>,
    pub memberships: Vec<Membership>,
    /// post id -> tenant id
    pub posts: HashMap<String, String>,
    pub receipts: HashMap<(String, String), ReadReceipt>,
    pub profiles: HashMap<String, Profile>,
}

pub struct FakeStore {
    pub tables: Mutex<Tables>,
    pub service_credential: bool,
    /// Every call fails as if the backend were unreachable.
    pub unreachable: bool,
    pub reject_memberships: bool,
    pub reject_deletes: bool,
    /// Receipt writes hit a unique constraint other than the upsert target.
    pub duplicate_receipts: bool,
    pub calls: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            service_credential: true,
            unreachable: false,
            reject_memberships: false,
            reject_deletes: false,
            duplicate_receipts: false,
            calls: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }
}

impl FakeStore {
    /// Two tenants, one post each; Alice is an active member of Acme only.
    pub fn seeded() -> Self {
        let store = Self::default();
        {
            let mut t = store.tables.lock().unwrap();
            t.tenants.push(tenant(ACME_ID, "Acme", "acme"));
            t.tenants.push(tenant(GLOBEX_ID, "Globex", "globex"));
            t.memberships.push(membership(ACME_ID, ALICE_ID, "member", "active"));
            t.posts.insert(ACME_POST.to_string(), ACME_ID.to_string());
            t.posts.insert(GLOBEX_POST.to_string(), GLOBEX_ID.to_string());
        }
        store
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, caller: Caller<'_>) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(BackendError::Transport("connection refused".into()));
        }
        if matches!(caller, Caller::Service) && !self.service_credential {
            return Err(BackendError::MissingServiceCredential);
        }
        Ok(())
    }

    fn visible(tables: &Tables, caller: Caller<'_>, tenant_id: &str) -> bool {
        match caller {
            Caller::Service => true,
            Caller::User(user) => tables
                .memberships
                .iter()
                .any(|m| m.user_id == user.id && m.tenant_id == tenant_id && m.status == "active"),
        }
    }
}

fn permission_denied() -> BackendError {
    BackendError::Api {
        status: 403,
        code: Some("42501".into()),
        message: "permission denied".into(),
    }
}

pub fn tenant(id: &str, name: &str, slug: &str) -> Tenant {
    Tenant {
        id: id.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        status: "active".to_string(),
        created_at: Utc::now(),
    }
}

pub fn membership(tenant_id: &str, user_id: &str, role: &str, status: &str) -> Membership {
    Membership {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        user_id: user_id.to_string(),
        role: role.to_string(),
        status: status.to_string(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl TenantStore for FakeStore {
    fn has_service_credential(&self) -> bool {
        self.service_credential
    }

    async fn find_post(&self, caller: Caller<'_>, post_id: &str) -> Result<Option<PostRef>, BackendError> {
        self.enter(caller)?;
        let t = self.tables.lock().unwrap();
        Ok(t.posts
            .get(post_id)
            .filter(|tenant_id| Self::visible(&t, caller, tenant_id))
            .map(|tenant_id| PostRef {
                id: post_id.to_string(),
                tenant_id: tenant_id.clone(),
            }))
    }

    async fn upsert_read_receipt(&self, caller: Caller<'_>, receipt: &ReadReceipt) -> Result<(), BackendError> {
        self.enter(caller)?;
        let mut t = self.tables.lock().unwrap();
        if !Self::visible(&t, caller, &receipt.tenant_id) {
            return Err(permission_denied());
        }
        if self.duplicate_receipts {
            return Err(BackendError::Api {
                status: 409,
                code: Some(UNIQUE_VIOLATION.into()),
                message: "duplicate key value violates unique constraint \"read_receipts_pkey\"".into(),
            });
        }
        t.receipts.insert(
            (receipt.post_id.clone(), receipt.user_id.clone()),
            receipt.clone(),
        );
        Ok(())
    }

    async fn insert_tenant(&self, caller: Caller<'_>, new: &NewTenant) -> Result<Tenant, BackendError> {
        self.enter(caller)?;
        if !matches!(caller, Caller::Service) {
            return Err(permission_denied());
        }
        let mut t = self.tables.lock().unwrap();
        if t.tenants.iter().any(|existing| existing.slug == new.slug) {
            return Err(BackendError::Api {
                status: 409,
                code: Some(UNIQUE_VIOLATION.into()),
                message: "duplicate key value violates unique constraint \"tenants_slug_key\"".into(),
            });
        }
        let row = Tenant {
            id: Uuid::new_v4().to_string(),
            name: new.name.clone(),
            slug: new.slug.clone(),
            status: new.status.clone(),
            created_at: Utc::now(),
        };
        t.tenants.push(row.clone());
        Ok(row)
    }

    async fn insert_membership(
        &self,
        caller: Caller<'_>,
        new: &NewMembership,
    ) -> Result<Membership, BackendError> {
        self.enter(caller)?;
        if self.reject_memberships {
            return Err(BackendError::Api {
                status: 409,
                code: Some("23503".into()),
                message: "insert or update on table \"memberships\" violates foreign key constraint".into(),
            });
        }
        let row = membership(&new.tenant_id, &new.user_id, &new.role, &new.status);
        self.tables.lock().unwrap().memberships.push(row.clone());
        Ok(row)
    }

    async fn delete_tenant(&self, caller: Caller<'_>, tenant_id: &str) -> Result<(), BackendError> {
        self.enter(caller)?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.reject_deletes {
            return Err(BackendError::Transport("connection reset".into()));
        }
        self.tables.lock().unwrap().tenants.retain(|t| t.id != tenant_id);
        Ok(())
    }

    async fn find_active_membership(
        &self,
        caller: Caller<'_>,
        user_id: &str,
    ) -> Result<Option<ActiveMembership>, BackendError> {
        self.enter(caller)?;
        let t = self.tables.lock().unwrap();
        let mut active: Vec<&Membership> = t
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.status == "active")
            .collect();
        active.sort_by_key(|m| m.created_at);
        Ok(active.first().and_then(|m| {
            t.tenants.iter().find(|tn| tn.id == m.tenant_id).map(|tn| ActiveMembership {
                tenant_id: m.tenant_id.clone(),
                role: m.role.clone(),
                slug: tn.slug.clone(),
            })
        }))
    }

    async fn find_profile(&self, caller: Caller<'_>, user_id: &str) -> Result<Option<Profile>, BackendError> {
        self.enter(caller)?;
        Ok(self.tables.lock().unwrap().profiles.get(user_id).cloned())
    }

    async fn sample_tenants(&self, caller: Caller<'_>) -> Result<usize, BackendError> {
        self.enter(caller)?;
        Ok(self.tables.lock().unwrap().tenants.len().min(1))
    }
}

// ---------------------------------------------------------------------------
// In-process router
// ---------------------------------------------------------------------------

pub fn test_config() -> AppConfig {
    let url = Url::parse("http://127.0.0.1:9").expect("static url");
    AppConfig::preset(Environment::Development, url, "anon-key".to_string())
}

pub fn router(auth: Arc<FakeAuth>, store: Arc<FakeStore>) -> Router {
    router_with(test_config(), auth, store)
}

pub fn router_with(config: AppConfig, auth: Arc<FakeAuth>, store: Arc<FakeStore>) -> Router {
    app(AppState::new(config, auth, store))
}

/// Alice and Bob can both sign in; neither has a profile row.
pub fn default_auth() -> FakeAuth {
    FakeAuth::default()
        .with_user(ALICE_TOKEN, user(ALICE_ID, "alice@example.com"))
        .with_user(BOB_TOKEN, user(BOB_ID, "bob@example.com"))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    TestResponse { status, headers, body }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

// ---------------------------------------------------------------------------
// Spawned binary
// ---------------------------------------------------------------------------

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    /// Start the compiled server against an unreachable backend; only
    /// routes that never leave the process can succeed.
    pub fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_franchise-comms-api"))
            .env("PORT", port.to_string())
            .env("HOST", "127.0.0.1")
            .env("SUPABASE_URL", "http://127.0.0.1:9")
            .env("SUPABASE_ANON_KEY", "anon-key")
            .env("DATA_BACKEND", "rest")
            .env("APP_ENV", "development")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
