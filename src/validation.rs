//! Request input checks run before any backend call.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Accepts canonical UUIDs plus an optional `word-` prefix used by synthetic
/// test identifiers (e.g. `post-0b7e...`).
static LOOSE_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^([a-z]+-)?[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
    )
    .expect("static regex should compile")
});

static SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("static regex should compile"));

pub const MIN_TENANT_NAME_LEN: usize = 2;
pub const MIN_SLUG_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid post ID format")]
    InvalidPostId,
    #[error("Tenant name must be at least 2 characters")]
    TenantNameTooShort,
    #[error(
        "Slug must be at least 2 characters and contain only lowercase letters, numbers, and hyphens"
    )]
    InvalidSlug,
}

pub fn is_loose_uuid(value: &str) -> bool {
    LOOSE_UUID.is_match(value)
}

pub fn validate_post_id(value: &str) -> Result<(), ValidationError> {
    if is_loose_uuid(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPostId)
    }
}

pub fn validate_tenant_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().chars().count() < MIN_TENANT_NAME_LEN {
        return Err(ValidationError::TenantNameTooShort);
    }
    Ok(())
}

pub fn validate_tenant_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.len() < MIN_SLUG_LEN || !SLUG.is_match(slug) {
        return Err(ValidationError::InvalidSlug);
    }
    Ok(())
}

/// Body of `POST /api/tenants`. Missing fields deserialize as empty strings
/// and are rejected by [`CreateTenantRequest::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTenantRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl CreateTenantRequest {
    /// Reports the first violation only: name, then slug.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_tenant_name(&self.name)?;
        validate_tenant_slug(&self.slug)?;
        Ok(())
    }
}
