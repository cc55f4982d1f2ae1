use std::sync::Arc;

use tracing::debug;

use crate::auth::AuthUser;
use crate::database::{BackendError, Caller, Profile, TenantStore};

pub struct ProfileService {
    store: Arc<dyn TenantStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }

    /// The caller's profile row, or a profile derived from the auth record
    /// when the row has not been provisioned yet.
    pub async fn current_profile(&self, user: &AuthUser) -> Result<Profile, BackendError> {
        match self.store.find_profile(Caller::User(user), &user.id).await? {
            Some(profile) => Ok(profile),
            None => {
                debug!("No profile row for {}, using auth record", user.id);
                Ok(profile_from_auth(user))
            }
        }
    }
}

pub fn profile_from_auth(user: &AuthUser) -> Profile {
    Profile {
        id: user.id.clone(),
        email: user.email.clone(),
        name: user.metadata_str(&["name", "full_name"]),
        avatar_url: user.metadata_str(&["avatar_url"]),
        created_at: user.created_at,
        updated_at: None,
    }
}
