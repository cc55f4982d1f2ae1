use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-user "last read" marker for a post. Unique on `(post_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ReadReceipt {
    pub tenant_id: String,
    pub post_id: String,
    pub user_id: String,
    pub read_at: DateTime<Utc>,
}
