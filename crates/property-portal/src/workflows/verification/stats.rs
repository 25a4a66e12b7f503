use std::sync::Arc;

use serde::Serialize;

use super::domain::{ApplicantKind, VerificationStatus};
use super::error::VerificationError;
use super::store::ApplicantStore;

/// Status counts for one kind, or summed across kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSummary {
    pub total: usize,
    pub pending: usize,
    pub verified: usize,
    pub rejected: usize,
    pub under_review: usize,
}

impl VerificationSummary {
    fn record(&mut self, status: VerificationStatus) {
        self.total += 1;
        match status {
            VerificationStatus::Pending => self.pending += 1,
            VerificationStatus::UnderReview => self.under_review += 1,
            VerificationStatus::Verified => self.verified += 1,
            VerificationStatus::Rejected => self.rejected += 1,
        }
    }

    pub fn merge(&mut self, other: &VerificationSummary) {
        self.total += other.total;
        self.pending += other.pending;
        self.verified += other.verified;
        self.rejected += other.rejected;
        self.under_review += other.under_review;
    }

    pub fn count(&self, status: VerificationStatus) -> usize {
        match status {
            VerificationStatus::Pending => self.pending,
            VerificationStatus::UnderReview => self.under_review,
            VerificationStatus::Verified => self.verified,
            VerificationStatus::Rejected => self.rejected,
        }
    }

    pub fn rated(self) -> RatedSummary {
        RatedSummary {
            verification_rate: verification_rate(&self),
            summary: self,
        }
    }
}

/// `round(100 * verified / total)`, or 0 for an empty summary.
pub fn verification_rate(summary: &VerificationSummary) -> u8 {
    if summary.total == 0 {
        return 0;
    }
    let verified = summary.verified as u64;
    let total = summary.total as u64;
    // Integer round-half-up of 100 * verified / total.
    ((200 * verified + total) / (2 * total)) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedSummary {
    #[serde(flatten)]
    pub summary: VerificationSummary,
    pub verification_rate: u8,
}

/// Per-kind summaries plus their field-wise sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationStatsReport {
    pub tenant: RatedSummary,
    pub landlord: RatedSummary,
    pub manager: RatedSummary,
    pub combined: RatedSummary,
}

impl VerificationStatsReport {
    pub fn for_kind(&self, kind: ApplicantKind) -> &RatedSummary {
        match kind {
            ApplicantKind::Tenant => &self.tenant,
            ApplicantKind::Landlord => &self.landlord,
            ApplicantKind::Manager => &self.manager,
        }
    }
}

/// Recomputes counts from the current store snapshot on every call; nothing is cached.
pub struct StatsAggregator<S> {
    store: Arc<S>,
}

impl<S> StatsAggregator<S>
where
    S: ApplicantStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn summarize(&self, kind: ApplicantKind) -> Result<VerificationSummary, VerificationError> {
        let mut summary = VerificationSummary::default();
        for profile in self.store.list(kind)? {
            summary.record(profile.verification_status());
        }
        Ok(summary)
    }

    /// All three kinds are counted from one store snapshot, so the combined row always equals the
    /// sum of the per-kind rows.
    pub fn summarize_all(&self) -> Result<VerificationStatsReport, VerificationError> {
        let mut tenant = VerificationSummary::default();
        let mut landlord = VerificationSummary::default();
        let mut manager = VerificationSummary::default();
        for profile in self.store.list_all()? {
            let summary = match profile.kind {
                ApplicantKind::Tenant => &mut tenant,
                ApplicantKind::Landlord => &mut landlord,
                ApplicantKind::Manager => &mut manager,
            };
            summary.record(profile.verification_status());
        }

        let mut combined = VerificationSummary::default();
        for summary in [&tenant, &landlord, &manager] {
            combined.merge(summary);
        }

        Ok(VerificationStatsReport {
            tenant: tenant.rated(),
            landlord: landlord.rated(),
            manager: manager.rated(),
            combined: combined.rated(),
        })
    }
}
