// handlers/elevated/mod.rs - Elevated handlers (service role)
//
// Diagnostics that run with the privileged backend credential. Mounted only
// when API_ENABLE_ADMIN_DIAGNOSTICS is on.
pub mod test_admin;

pub use test_admin::test_admin_get;
