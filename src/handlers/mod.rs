// handlers/mod.rs - Handler tiers
//
// Public (no session) → Protected (session required) → Elevated (service role)
pub mod elevated;
pub mod protected;
pub mod public;
