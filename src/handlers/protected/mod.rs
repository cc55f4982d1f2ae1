// handlers/protected/mod.rs - Protected handlers (session required)
//
// Each handler validates its input first, then resolves the session, then
// runs its queries as the user so row-level security decides visibility.
// Tenant creation is the one flow that escalates to the service role.
pub mod auth;
pub mod posts;
pub mod tenants;

pub use auth::me_get;
pub use posts::post_read;
pub use tenants::tenant_create;
