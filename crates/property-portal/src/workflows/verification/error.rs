use super::domain::{ApplicantId, ApplicantKind};
use super::export::ExportError;
use super::store::StoreError;

/// Malformed input rejected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{0}' is not a verification status (expected pending, under_review, verified, or rejected)")]
    InvalidStatus(String),
    #[error("'{0}' is not an applicant kind (expected tenant, landlord, manager, or all)")]
    InvalidKind(String),
    #[error("permission '{0}' is not registered in the catalog")]
    UnknownPermission(String),
    #[error("page numbers start at 1")]
    InvalidPage,
    #[error("page size must be at least 1")]
    InvalidPageSize,
    #[error("'{0}' is not a supported export format (expected csv or json)")]
    UnsupportedFormat(String),
    #[error("'{0}' is not a sortable field")]
    InvalidSortField(String),
    #[error("'{0}' is not a sort order (expected asc or desc)")]
    InvalidSortOrder(String),
    #[error("bulk transition requires at least one applicant id")]
    EmptyBatch,
    #[error("applicant id '{0}' appears more than once in the batch")]
    DuplicateBatchEntry(String),
    #[error("verification type only applies to tenants, not {0}s")]
    TypeNotAllowed(ApplicantKind),
    #[error("{0} must not be blank")]
    BlankField(&'static str),
    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl ValidationError {
    pub const fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidStatus(_) => "invalid_status",
            ValidationError::UnknownPermission(_) => "unknown_permission",
            _ => "invalid_request",
        }
    }
}

/// Error surfaced by every verification operation. Nothing is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ApplicantKind, id: ApplicantId },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} {id} was modified concurrently; re-fetch and retry")]
    Conflict { kind: ApplicantKind, id: ApplicantId },
    #[error("permission '{permission}' is required")]
    Forbidden { permission: String },
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl VerificationError {
    pub fn code(&self) -> &'static str {
        match self {
            VerificationError::NotFound { .. } => "not_found",
            VerificationError::Validation(err) => err.code(),
            VerificationError::Conflict { .. } => "conflict",
            VerificationError::Forbidden { .. } => "forbidden",
            VerificationError::Store(_) => "store_unavailable",
            VerificationError::Export(_) => "export_failed",
        }
    }
}

impl From<StoreError> for VerificationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { kind, id, .. } => VerificationError::Conflict { kind, id },
            other => VerificationError::Store(other),
        }
    }
}
