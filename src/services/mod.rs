//! Multi-step flows over a [`TenantStore`](crate::database::TenantStore).
//!
//! Services return their own error enums; handlers convert them into
//! [`ApiError`](crate::error::ApiError) with `?`.

pub mod profile_service;
pub mod read_receipt_service;
pub mod tenant_service;

pub use profile_service::ProfileService;
pub use read_receipt_service::{ReadReceiptError, ReadReceiptService};
pub use tenant_service::{TenantError, TenantService};
