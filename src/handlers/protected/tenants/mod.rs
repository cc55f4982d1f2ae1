pub mod create;

pub use create::tenant_create;
