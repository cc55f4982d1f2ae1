// handlers/public/mod.rs - Public handlers (no session required)
//
// Service info, liveness, and the OAuth/PKCE callback that establishes a
// session in the first place.
pub mod auth;
pub mod health;

pub use auth::callback_get;
pub use health::{health, root};
