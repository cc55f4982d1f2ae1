pub mod membership;
pub mod post;
pub mod profile;
pub mod read_receipt;
pub mod tenant;

pub use membership::{ActiveMembership, Membership, NewMembership};
pub use post::PostRef;
pub use profile::Profile;
pub use read_receipt::ReadReceipt;
pub use tenant::{NewTenant, Tenant};
