//! Applicant verification workflow shared by the tenant, landlord, and manager dashboards.
//!
//! Every applicant profile moves through `pending -> under_review -> verified/rejected` under
//! moderator control. The store keeps one profile per `(kind, id)`, the state machine is the only
//! writer of lifecycle fields, and the authorization gate runs before any read or write.

pub mod authorization;
pub mod domain;
pub mod error;
pub mod export;
pub mod query;
pub mod router;
pub mod service;
pub mod state_machine;
pub mod stats;
pub mod store;

#[cfg(test)]
mod tests;

pub use authorization::{
    permission_for, Authorization, AuthorizationGate, CatalogError, Capability, PermissionCatalog,
    PermissionCategory, PermissionEntry, Principal, RoleGrants,
};
pub use domain::{
    ActorId, ApplicantId, ApplicantKind, ApplicantProfile, KindScope, NewApplicant,
    VerificationNote, VerificationStatus, VerificationType,
};
pub use error::{ValidationError, VerificationError};
pub use export::{export_filename, ExportArtifact, ExportError, ExportFormat, ExportGenerator};
pub use query::{
    PageRequest, PageSize, QueryPage, SortField, SortOrder, SortSpec, VerificationFilter,
    VerificationQueryEngine,
};
pub use router::verification_router;
pub use service::{BulkTransitionOutcome, Clock, ListingLimits, SystemClock, VerificationService};
pub use state_machine::{TransitionCommand, VerificationStateMachine};
pub use stats::{
    verification_rate, RatedSummary, StatsAggregator, VerificationStatsReport, VerificationSummary,
};
pub use store::{load_seed, ApplicantStore, InMemoryApplicantStore, SeedError, StoreError};
