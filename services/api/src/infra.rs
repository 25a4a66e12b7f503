use metrics_exporter_prometheus::PrometheusHandle;
use property_portal::config::VerificationConfig;
use property_portal::error::AppError;
use property_portal::workflows::verification::{
    ActorId, AuthorizationGate, CatalogError, InMemoryApplicantStore, ListingLimits,
    PermissionCatalog, Principal, RoleGrants, VerificationError, VerificationService,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type PortalService = VerificationService<InMemoryApplicantStore>;

/// Catalog from `catalog_path` when configured, otherwise the built-in seed catalog.
pub(crate) fn load_gate(config: &VerificationConfig) -> Result<AuthorizationGate, AppError> {
    let catalog = match &config.catalog_path {
        Some(path) => PermissionCatalog::from_path(path)?,
        None => PermissionCatalog::seed(),
    };
    let grants = RoleGrants::standard(&catalog).map_err(CatalogError::from)?;

    info!(
        version = catalog.version(),
        permissions = catalog.len(),
        "permission catalog loaded"
    );
    Ok(AuthorizationGate::new(Arc::new(catalog), Arc::new(grants)))
}

/// Seed profiles from `seed_path` (or the config's seed path); an absent path starts empty.
pub(crate) fn load_store(
    config: &VerificationConfig,
    seed_override: Option<&Path>,
) -> Result<InMemoryApplicantStore, AppError> {
    let seed_path = seed_override.or(config.seed_path.as_deref());
    let store = match seed_path {
        Some(path) => InMemoryApplicantStore::from_seed_path(path)?,
        None => InMemoryApplicantStore::default(),
    };

    let profiles = store.len().map_err(VerificationError::from)?;
    info!(profiles, seeded = seed_path.is_some(), "applicant store ready");
    Ok(store)
}

pub(crate) fn build_service(
    config: &VerificationConfig,
    seed_override: Option<&Path>,
) -> Result<PortalService, AppError> {
    let gate = load_gate(config)?;
    let store = load_store(config, seed_override)?;
    let limits = ListingLimits {
        default_page_size: config.default_page_size,
        max_page_size: config.max_page_size,
    };

    Ok(VerificationService::new(Arc::new(store), Arc::new(gate)).with_limits(limits))
}

/// Principal used by CLI commands, which run with operator privileges for the chosen role.
pub(crate) fn cli_principal(service: &PortalService, role: &str) -> Principal {
    service.gate().principal(ActorId("cli".to_string()), role)
}
