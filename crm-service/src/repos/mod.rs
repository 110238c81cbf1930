//! Tenant-scoped entity repositories.
//!
//! Every function takes a [`crate::db::TenantDb`] and is mode-agnostic:
//! the handle applies whichever isolation rule the process is configured
//! with. Nothing here mentions tenants.

pub mod companies;
pub mod contacts;
pub mod leads;
