use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use super::catalog::PermissionCatalog;
use crate::workflows::verification::domain::{ActorId, ApplicantKind};
use crate::workflows::verification::error::{ValidationError, VerificationError};

/// Grants every capability in the catalog.
pub const SYSTEM_ADMIN: &str = "system.admin";

/// Capability required by a verification operation, combined with a kind's permission scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    Manage,
    Create,
}

impl Capability {
    pub const fn action(self) -> &'static str {
        match self {
            Capability::View => "view",
            Capability::Manage => "manage",
            Capability::Create => "create",
        }
    }
}

/// Literal catalog entry guarding `capability` on `kind`, e.g. `tenant.manage` or `user.view`.
pub fn permission_for(kind: ApplicantKind, capability: Capability) -> String {
    format!("{}.{}", kind.permission_scope(), capability.action())
}

const STANDARD_ROLE_GRANTS: [(&str, &[&str]); 6] = [
    ("system_admin", &["system.admin", "system.settings"]),
    (
        "company_admin",
        &[
            "company.manage",
            "company.view",
            "user.create",
            "user.manage",
            "user.view",
            "property.create",
            "property.manage",
            "property.view",
            "tenant.create",
            "tenant.manage",
            "tenant.view",
            "report.generate",
            "report.view",
        ],
    ),
    (
        "property_manager",
        &[
            "property.manage",
            "property.view",
            "tenant.create",
            "tenant.manage",
            "tenant.view",
            "maintenance.create",
            "maintenance.manage",
            "maintenance.view",
            "task.create",
            "task.manage",
            "task.view",
            "report.view",
        ],
    ),
    (
        "leasing_specialist",
        &["property.view", "tenant.create", "tenant.view", "task.view"],
    ),
    (
        "compliance_officer",
        &["tenant.view", "user.view", "report.generate", "report.view"],
    ),
    ("data_analyst", &["report.generate", "report.view"]),
];

/// Role name to catalog entries. Every granted name is checked against the catalog when the table
/// is built, so a typo fails at startup instead of silently denying at request time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleGrants {
    grants: HashMap<String, BTreeSet<String>>,
}

impl RoleGrants {
    pub fn standard(catalog: &PermissionCatalog) -> Result<Self, ValidationError> {
        Self::from_table(
            catalog,
            STANDARD_ROLE_GRANTS
                .iter()
                .map(|(role, permissions)| (*role, permissions.iter().copied())),
        )
    }

    pub fn from_table<'a, I, P>(
        catalog: &PermissionCatalog,
        table: I,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (&'a str, P)>,
        P: IntoIterator<Item = &'a str>,
    {
        let mut grants = HashMap::new();
        for (role, permissions) in table {
            let mut granted = BTreeSet::new();
            for permission in permissions {
                catalog.require(permission)?;
                granted.insert(permission.to_string());
            }
            grants
                .entry(role.to_string())
                .or_insert_with(BTreeSet::new)
                .extend(granted);
        }
        Ok(Self { grants })
    }

    /// Unknown roles resolve to no grants.
    pub fn permissions_for(&self, role: &str) -> BTreeSet<String> {
        self.grants.get(role).cloned().unwrap_or_default()
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }
}

/// Acting moderator and the permission set granted to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub actor_id: ActorId,
    pub role: Option<String>,
    permissions: BTreeSet<String>,
}

impl Principal {
    pub fn with_permissions<I, P>(actor_id: ActorId, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            actor_id,
            role: None,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_role(actor_id: ActorId, role: &str, grants: &RoleGrants) -> Self {
        Self {
            actor_id,
            role: Some(role.to_string()),
            permissions: grants.permissions_for(role),
        }
    }

    /// Exact set membership; no prefix or wildcard matching.
    pub fn holds(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn permissions(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied,
}

/// Precondition check run before any store read or write.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    catalog: Arc<PermissionCatalog>,
    grants: Arc<RoleGrants>,
}

impl AuthorizationGate {
    pub fn new(catalog: Arc<PermissionCatalog>, grants: Arc<RoleGrants>) -> Self {
        Self { catalog, grants }
    }

    /// Gate over the seed catalog with the standard role table.
    pub fn standard() -> Result<Self, ValidationError> {
        let catalog = PermissionCatalog::seed();
        let grants = RoleGrants::standard(&catalog)?;
        Ok(Self::new(Arc::new(catalog), Arc::new(grants)))
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    pub fn principal(&self, actor_id: ActorId, role: &str) -> Principal {
        Principal::from_role(actor_id, role, &self.grants)
    }

    /// An unregistered `required` permission is a configuration error, distinct from a denial.
    pub fn authorize(
        &self,
        principal: &Principal,
        required: &str,
    ) -> Result<Authorization, ValidationError> {
        self.catalog.require(required)?;

        if principal.holds(required) || principal.holds(SYSTEM_ADMIN) {
            debug!(actor_id = %principal.actor_id, permission = required, "permission granted");
            Ok(Authorization::Allowed)
        } else {
            Ok(Authorization::Denied)
        }
    }

    /// [`authorize`](Self::authorize) folded into the verification error taxonomy.
    pub fn require(&self, principal: &Principal, required: &str) -> Result<(), VerificationError> {
        match self.authorize(principal, required)? {
            Authorization::Allowed => Ok(()),
            Authorization::Denied => {
                warn!(
                    actor_id = %principal.actor_id,
                    role = principal.role.as_deref().unwrap_or("-"),
                    permission = required,
                    "verification action denied"
                );
                Err(VerificationError::Forbidden {
                    permission: required.to_string(),
                })
            }
        }
    }
}
