//! Permission catalog and the gate every verification operation passes through first.

mod catalog;
mod gate;

pub use catalog::{CatalogError, PermissionCatalog, PermissionCategory, PermissionEntry};
pub use gate::{
    permission_for, Authorization, AuthorizationGate, Capability, Principal, RoleGrants,
    SYSTEM_ADMIN,
};
