use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Identifier wrapper for applicant profiles. Unique within a kind only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub String);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ApplicantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of the moderator recorded on audit entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Applicant category partitioning stores, listings, and permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicantKind {
    Tenant,
    Landlord,
    Manager,
}

impl ApplicantKind {
    pub const fn ordered() -> [ApplicantKind; 3] {
        [
            ApplicantKind::Tenant,
            ApplicantKind::Landlord,
            ApplicantKind::Manager,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            ApplicantKind::Tenant => "tenant",
            ApplicantKind::Landlord => "landlord",
            ApplicantKind::Manager => "manager",
        }
    }

    /// Permission namespace guarding this kind. Landlords and managers are platform users, so
    /// they share the `user.*` entries of the catalog.
    pub const fn permission_scope(self) -> &'static str {
        match self {
            ApplicantKind::Tenant => "tenant",
            ApplicantKind::Landlord | ApplicantKind::Manager => "user",
        }
    }

    pub const fn accepts_verification_type(self) -> bool {
        matches!(self, ApplicantKind::Tenant)
    }
}

impl fmt::Display for ApplicantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicantKind {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tenant" | "tenants" => Ok(ApplicantKind::Tenant),
            "landlord" | "landlords" => Ok(ApplicantKind::Landlord),
            "manager" | "managers" => Ok(ApplicantKind::Manager),
            _ => Err(ValidationError::InvalidKind(raw.to_string())),
        }
    }
}

/// Either a single kind or the cross-kind fan-out used by reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindScope {
    All,
    Kind(ApplicantKind),
}

impl KindScope {
    pub fn kinds(self) -> Vec<ApplicantKind> {
        match self {
            KindScope::All => ApplicantKind::ordered().to_vec(),
            KindScope::Kind(kind) => vec![kind],
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            KindScope::All => "all",
            KindScope::Kind(kind) => kind.label(),
        }
    }
}

impl From<ApplicantKind> for KindScope {
    fn from(kind: ApplicantKind) -> Self {
        KindScope::Kind(kind)
    }
}

impl FromStr for KindScope {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().eq_ignore_ascii_case("all") {
            Ok(KindScope::All)
        } else {
            raw.parse().map(KindScope::Kind)
        }
    }
}

/// Lifecycle status of an applicant. No other value is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    UnderReview,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub const fn ordered() -> [VerificationStatus; 4] {
        [
            VerificationStatus::Pending,
            VerificationStatus::UnderReview,
            VerificationStatus::Verified,
            VerificationStatus::Rejected,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::UnderReview => "under_review",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// Whether reaching this status stamps `verified_at`.
    pub const fn is_decision(self) -> bool {
        matches!(
            self,
            VerificationStatus::Verified | VerificationStatus::Rejected
        )
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VerificationStatus {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        VerificationStatus::ordered()
            .into_iter()
            .find(|status| status.label() == raw.trim())
            .ok_or_else(|| ValidationError::InvalidStatus(raw.to_string()))
    }
}

/// Descriptive tenant verification category. Never affects the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    Identity,
    Income,
    Credit,
    Background,
    Employment,
    Reference,
}

impl VerificationType {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationType::Identity => "identity",
            VerificationType::Income => "income",
            VerificationType::Credit => "credit",
            VerificationType::Background => "background",
            VerificationType::Employment => "employment",
            VerificationType::Reference => "reference",
        }
    }
}

/// One audit trail entry. Appended on every transition, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationNote {
    pub actor_id: ActorId,
    pub note: String,
    pub status: VerificationStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Registration payload for a new applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplicant {
    pub id: ApplicantId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub verification_type: Option<VerificationType>,
}

/// Verification profile owned by one `(kind, id)` pair.
///
/// Lifecycle fields are only writable from inside the crate so every change flows through
/// [`VerificationStateMachine`](super::state_machine::VerificationStateMachine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantProfile {
    pub id: ApplicantId,
    pub kind: ApplicantKind,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub(crate) verification_status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_type: Option<VerificationType>,
    #[serde(default)]
    pub(crate) verification_notes: Vec<VerificationNote>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) verified_at: Option<DateTime<Utc>>,
    /// Concurrency token owned by the store. Never read from or written to the wire.
    #[serde(skip)]
    pub(crate) revision: u64,
}

/// Field rules shared by registration and profiles loaded from outside the service.
fn check_record_fields(
    kind: ApplicantKind,
    fields: [(&'static str, &str); 4],
    verification_type: Option<VerificationType>,
) -> Result<(), ValidationError> {
    if let Some((name, _)) = fields.into_iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ValidationError::BlankField(name));
    }
    if verification_type.is_some() && !kind.accepts_verification_type() {
        return Err(ValidationError::TypeNotAllowed(kind));
    }
    Ok(())
}

impl ApplicantProfile {
    /// Build a fresh `pending` profile with an empty audit trail.
    pub fn register(
        kind: ApplicantKind,
        applicant: NewApplicant,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let NewApplicant {
            id,
            first_name,
            last_name,
            email,
            phone,
            verification_type,
        } = applicant;

        check_record_fields(
            kind,
            [
                ("id", id.0.as_str()),
                ("firstName", first_name.as_str()),
                ("lastName", last_name.as_str()),
                ("email", email.as_str()),
            ],
            verification_type,
        )?;

        Ok(Self {
            id: ApplicantId(id.0.trim().to_string()),
            kind,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_string(),
            phone: phone.trim().to_string(),
            verification_status: VerificationStatus::Pending,
            verification_type,
            verification_notes: Vec::new(),
            created_at: now,
            verified_at: None,
            revision: 0,
        })
    }

    pub fn verification_status(&self) -> VerificationStatus {
        self.verification_status
    }

    pub fn verification_notes(&self) -> &[VerificationNote] {
        &self.verification_notes
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    /// Store revision the profile was read at; `0` means never persisted.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Apply the registration field rules to a profile that did not come through
    /// [`register`](Self::register), such as a seed file entry.
    pub fn check_fields(&self) -> Result<(), ValidationError> {
        check_record_fields(
            self.kind,
            [
                ("id", self.id.0.as_str()),
                ("firstName", self.first_name.as_str()),
                ("lastName", self.last_name.as_str()),
                ("email", self.email.as_str()),
            ],
            self.verification_type,
        )
    }

    /// `verified_at` is present exactly when a decision was reached at some point. Profiles
    /// loaded from outside the state machine (seed files) are checked against this.
    pub fn is_consistent(&self) -> bool {
        let decided = self.verification_status.is_decision()
            || self
                .verification_notes
                .iter()
                .any(|entry| entry.status.is_decision());
        decided == self.verified_at.is_some()
    }

    /// Case-insensitive substring match over first name, last name, and email.
    /// `needle` must already be lowercase.
    pub(crate) fn matches_search(&self, needle: &str) -> bool {
        [&self.first_name, &self.last_name, &self.email]
            .into_iter()
            .any(|field| field.to_lowercase().contains(needle))
    }

    pub(crate) fn record_transition(
        &mut self,
        status: VerificationStatus,
        actor_id: ActorId,
        note: String,
        now: DateTime<Utc>,
    ) {
        self.verification_notes.push(VerificationNote {
            actor_id,
            note,
            status,
            recorded_at: now,
        });
        self.verification_status = status;
        if status.is_decision() {
            self.verified_at = Some(now);
        }
    }
}
