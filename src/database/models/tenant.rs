use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle status given to every newly created tenant.
pub const TENANT_STATUS_TRIAL: &str = "trial";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTenant {
    pub name: String,
    pub slug: String,
    pub status: String,
}

impl NewTenant {
    /// Stores the trimmed display name with trial status.
    pub fn trial(name: &str, slug: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            slug: slug.to_string(),
            status: TENANT_STATUS_TRIAL.to_string(),
        }
    }
}
