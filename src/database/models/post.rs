use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The slice of a post needed to record a read: its id and owning tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PostRef {
    pub id: String,
    pub tenant_id: String,
}
