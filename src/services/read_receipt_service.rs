use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::auth::AuthUser;
use crate::database::{BackendError, Caller, ReadReceipt, TenantStore};
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum ReadReceiptError {
    #[error("Post not found")]
    PostNotFound,
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<ReadReceiptError> for ApiError {
    fn from(err: ReadReceiptError) -> Self {
        match err {
            ReadReceiptError::PostNotFound => ApiError::not_found("Post not found"),
            ReadReceiptError::Backend(e) => e.into(),
        }
    }
}

pub struct ReadReceiptService {
    store: Arc<dyn TenantStore>,
}

impl ReadReceiptService {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }

    /// Record that `user` has read `post_id`.
    ///
    /// The post lookup runs as the user, so a post in another tenant is
    /// indistinguishable from a missing one. Repeating the call refreshes
    /// `read_at` on the existing receipt.
    pub async fn mark_read(&self, user: &AuthUser, post_id: &str) -> Result<ReadReceipt, ReadReceiptError> {
        let post = match self.store.find_post(Caller::User(user), post_id).await {
            Ok(Some(post)) => post,
            Ok(None) => return Err(ReadReceiptError::PostNotFound),
            Err(e) if e.is_api() => {
                debug!("Post lookup for {} rejected: {}", post_id, e);
                return Err(ReadReceiptError::PostNotFound);
            }
            Err(e) => return Err(e.into()),
        };

        let receipt = ReadReceipt {
            tenant_id: post.tenant_id,
            post_id: post.id,
            user_id: user.id.clone(),
            read_at: Utc::now(),
        };

        self.store.upsert_read_receipt(Caller::User(user), &receipt).await?;

        info!("User {} read post {} in tenant {}", receipt.user_id, receipt.post_id, receipt.tenant_id);
        Ok(receipt)
    }
}
