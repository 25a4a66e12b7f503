use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::workflows::verification::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    System,
    Company,
    User,
    Property,
    Tenant,
    Maintenance,
    Financial,
    Task,
    Report,
}

impl PermissionCategory {
    pub const fn ordered() -> [PermissionCategory; 9] {
        [
            PermissionCategory::System,
            PermissionCategory::Company,
            PermissionCategory::User,
            PermissionCategory::Property,
            PermissionCategory::Tenant,
            PermissionCategory::Maintenance,
            PermissionCategory::Financial,
            PermissionCategory::Task,
            PermissionCategory::Report,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            PermissionCategory::System => "system",
            PermissionCategory::Company => "company",
            PermissionCategory::User => "user",
            PermissionCategory::Property => "property",
            PermissionCategory::Tenant => "tenant",
            PermissionCategory::Maintenance => "maintenance",
            PermissionCategory::Financial => "financial",
            PermissionCategory::Task => "task",
            PermissionCategory::Report => "report",
        }
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub name: String,
    pub category: PermissionCategory,
    pub description: String,
}

const SEED_VERSION: &str = "2024.1";

const SEED_PERMISSIONS: [(&str, PermissionCategory, &str); 25] = [
    ("system.admin", PermissionCategory::System, "Full system administration"),
    ("system.settings", PermissionCategory::System, "Manage system settings"),
    ("company.create", PermissionCategory::Company, "Create companies"),
    ("company.manage", PermissionCategory::Company, "Manage company settings"),
    ("company.view", PermissionCategory::Company, "View company information"),
    ("user.create", PermissionCategory::User, "Create users"),
    ("user.manage", PermissionCategory::User, "Manage users"),
    ("user.view", PermissionCategory::User, "View users"),
    ("property.create", PermissionCategory::Property, "Create properties"),
    ("property.manage", PermissionCategory::Property, "Manage properties"),
    ("property.view", PermissionCategory::Property, "View properties"),
    ("tenant.create", PermissionCategory::Tenant, "Create tenants"),
    ("tenant.manage", PermissionCategory::Tenant, "Manage tenants"),
    ("tenant.view", PermissionCategory::Tenant, "View tenants"),
    ("maintenance.create", PermissionCategory::Maintenance, "Create maintenance requests"),
    ("maintenance.manage", PermissionCategory::Maintenance, "Manage maintenance requests"),
    ("maintenance.view", PermissionCategory::Maintenance, "View maintenance requests"),
    ("financial.manage", PermissionCategory::Financial, "Manage financial data"),
    ("financial.view", PermissionCategory::Financial, "View financial data"),
    ("payment.process", PermissionCategory::Financial, "Process payments"),
    ("task.create", PermissionCategory::Task, "Create tasks"),
    ("task.manage", PermissionCategory::Task, "Manage tasks"),
    ("task.view", PermissionCategory::Task, "View tasks"),
    ("report.generate", PermissionCategory::Report, "Generate reports"),
    ("report.view", PermissionCategory::Report, "View reports"),
];

/// Immutable, versioned set of capability strings. Built once at startup and shared by
/// reference; there is no way to add or remove entries afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCatalog {
    version: String,
    entries: BTreeMap<String, PermissionEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    version: String,
    permissions: Vec<PermissionEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read permission catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid permission catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("permission '{0}' is listed more than once")]
    DuplicatePermission(String),
    #[error("permission '{0}' must be dot-namespaced, e.g. tenant.manage")]
    InvalidName(String),
    #[error(transparent)]
    Grant(#[from] ValidationError),
}

impl PermissionCatalog {
    /// The 25-entry catalog seeded with every installation.
    pub fn seed() -> Self {
        let entries = SEED_PERMISSIONS
            .iter()
            .map(|(name, category, description)| {
                (
                    name.to_string(),
                    PermissionEntry {
                        name: name.to_string(),
                        category: *category,
                        description: description.to_string(),
                    },
                )
            })
            .collect();

        Self {
            version: SEED_VERSION.to_string(),
            entries,
        }
    }

    pub fn from_entries<I>(version: impl Into<String>, entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = PermissionEntry>,
    {
        let mut catalog = BTreeMap::new();
        for entry in entries {
            if !is_namespaced(&entry.name) {
                return Err(CatalogError::InvalidName(entry.name));
            }
            if catalog.contains_key(&entry.name) {
                return Err(CatalogError::DuplicatePermission(entry.name));
            }
            catalog.insert(entry.name.clone(), entry);
        }

        Ok(Self {
            version: version.into(),
            entries: catalog,
        })
    }

    /// Read `{"version": "...", "permissions": [{name, category, description}, ...]}`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_reader(reader)?;
        Self::from_entries(document.version, document.permissions)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PermissionEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Look up an entry, treating an unregistered name as a configuration error.
    pub fn require(&self, name: &str) -> Result<&PermissionEntry, ValidationError> {
        self.get(name)
            .ok_or_else(|| ValidationError::UnknownPermission(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionEntry> {
        self.entries.values()
    }

    pub fn by_category(&self, category: PermissionCategory) -> Vec<&PermissionEntry> {
        self.entries
            .values()
            .filter(|entry| entry.category == category)
            .collect()
    }
}

fn is_namespaced(name: &str) -> bool {
    match name.split_once('.') {
        Some((namespace, action)) => {
            !namespace.is_empty() && !action.is_empty() && !name.contains(char::is_whitespace)
        }
        None => false,
    }
}
