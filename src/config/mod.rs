use serde::Serialize;
use std::env;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
    #[error("Invalid URL in {0}")]
    InvalidUrl(&'static str),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub supabase: SupabaseConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public origin prefixed to redirect targets; relative redirects when unset.
    pub site_url: Option<String>,
}

/// Managed backend endpoints and credentials.
///
/// Custom `Debug` redacts every key.
#[derive(Clone, Serialize)]
pub struct SupabaseConfig {
    pub url: Url,
    #[serde(skip)]
    pub anon_key: String,
    #[serde(skip)]
    pub service_role_key: Option<String>,
    #[serde(skip)]
    pub jwt_secret: Option<String>,
    pub timeout_secs: u64,
}

impl SupabaseConfig {
    /// Resolve a service path (e.g. `rest/v1/posts`) against the project URL,
    /// keeping any path prefix the project URL carries.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("service_role_key", &self.service_role_key.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Which path data queries take to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBackend {
    /// PostgREST data API over HTTP
    Rest,
    /// Direct Postgres connection with row-level security claims set per transaction
    Postgres,
}

#[derive(Clone, Serialize)]
pub struct DatabaseConfig {
    pub backend: DataBackend,
    #[serde(skip)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("max_connections", &self.max_connections)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    pub enable_admin_diagnostics: bool,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub secure_cookies: bool,
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub code_verifier_cookie: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let url = env::var("SUPABASE_URL").map_err(|_| ConfigError::Missing("SUPABASE_URL"))?;
        let url = Url::parse(&url).map_err(|_| ConfigError::InvalidUrl("SUPABASE_URL"))?;
        let anon_key =
            env::var("SUPABASE_ANON_KEY").map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let config = Self::preset(environment, url, anon_key).with_env_overrides()?;
        config.check()?;
        Ok(config)
    }

    /// Environment defaults without any credentials beyond the anon key.
    pub fn preset(environment: Environment, url: Url, anon_key: String) -> Self {
        let mut config = Self::development(url, anon_key);
        config.environment = environment;
        match environment {
            Environment::Development => {}
            Environment::Staging => {
                config.database.max_connections = 20;
                config.database.connection_timeout = 10;
                config.supabase.timeout_secs = 10;
                config.api.enable_admin_diagnostics = true;
                config.security.secure_cookies = true;
                config.security.cors_origins = vec!["https://staging.example.com".to_string()];
            }
            Environment::Production => {
                config.database.max_connections = 50;
                config.database.connection_timeout = 5;
                config.supabase.timeout_secs = 10;
                config.api.enable_admin_diagnostics = false;
                config.api.enable_request_logging = false;
                config.security.secure_cookies = true;
                config.security.cors_origins = vec!["https://app.example.com".to_string()];
            }
        }
        config
    }

    fn development(url: Url, anon_key: String) -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                site_url: None,
            },
            supabase: SupabaseConfig {
                url,
                anon_key,
                service_role_key: None,
                jwt_secret: None,
                timeout_secs: 30,
            },
            database: DatabaseConfig {
                backend: DataBackend::Rest,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_admin_diagnostics: true,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                secure_cookies: false,
                access_cookie: "sb-access-token".to_string(),
                refresh_cookie: "sb-refresh-token".to_string(),
                code_verifier_cookie: "sb-auth-token-code-verifier".to_string(),
            },
        }
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = non_empty("SITE_URL") {
            self.server.site_url = Some(v.trim_end_matches('/').to_string());
        }

        // Backend credentials
        self.supabase.service_role_key = non_empty("SUPABASE_SERVICE_ROLE_KEY");
        self.supabase.jwt_secret = non_empty("SUPABASE_JWT_SECRET");
        if let Ok(v) = env::var("BACKEND_TIMEOUT_SECS") {
            self.supabase.timeout_secs = v.parse().unwrap_or(self.supabase.timeout_secs);
        }

        // Database overrides
        if let Ok(v) = env::var("DATA_BACKEND") {
            self.database.backend = match v.to_ascii_lowercase().as_str() {
                "rest" | "postgrest" => DataBackend::Rest,
                "postgres" | "pg" | "direct" => DataBackend::Postgres,
                _ => return Err(ConfigError::InvalidValue("DATA_BACKEND", v)),
            };
        }
        self.database.url = non_empty("DATABASE_URL");
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_ADMIN_DIAGNOSTICS") {
            self.api.enable_admin_diagnostics =
                v.parse().unwrap_or(self.api.enable_admin_diagnostics);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Some(v) = non_empty("AUTH_ACCESS_COOKIE") {
            self.security.access_cookie = v;
        }
        if let Some(v) = non_empty("AUTH_REFRESH_COOKIE") {
            self.security.refresh_cookie = v;
        }
        if let Some(v) = non_empty("AUTH_CODE_VERIFIER_COOKIE") {
            self.security.code_verifier_cookie = v;
        }

        Ok(self)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.database.backend == DataBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        // Credentialed CORS cannot answer with a wildcard origin.
        if self.security.cors_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::InvalidValue(
                "SECURITY_CORS_ORIGINS",
                "wildcard origin cannot be combined with credentialed requests".to_string(),
            ));
        }
        Ok(())
    }

    /// Absolute or relative redirect target for an application path.
    pub fn redirect_url(&self, path: &str) -> String {
        match &self.server.site_url {
            Some(origin) => format!("{}{}", origin, path),
            None => path.to_string(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
