use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ROLE_TENANT_ADMIN: &str = "tenant_admin";
pub const MEMBERSHIP_STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMembership {
    pub tenant_id: String,
    pub user_id: String,
    pub role: String,
    pub status: String,
}

impl NewMembership {
    pub fn tenant_admin(tenant_id: &str, user_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            role: ROLE_TENANT_ADMIN.to_string(),
            status: MEMBERSHIP_STATUS_ACTIVE.to_string(),
        }
    }
}

/// An active membership together with the slug of its tenant, used to pick
/// the post-login dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ActiveMembership {
    pub tenant_id: String,
    pub role: String,
    pub slug: String,
}
