use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::authorization::{permission_for, AuthorizationGate, Capability, Principal};
use super::domain::{ApplicantId, ApplicantKind, ApplicantProfile, KindScope, NewApplicant};
use super::error::VerificationError;
use super::export::{ExportArtifact, ExportFormat, ExportGenerator};
use super::query::{
    PageRequest, QueryPage, SortSpec, VerificationFilter, VerificationQueryEngine,
};
use super::state_machine::{TransitionCommand, VerificationStateMachine};
use super::stats::{RatedSummary, StatsAggregator, VerificationStatsReport};
use super::store::ApplicantStore;

const REPORT_VIEW: &str = "report.view";

/// Source of "now" for audit timestamps and export filenames.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Page size bounds applied to interactive listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingLimits {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for ListingLimits {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl ListingLimits {
    /// Missing values fall back to page 1 and the default size; oversized pages are capped.
    pub fn page_request(&self, page: Option<usize>, page_size: Option<usize>) -> PageRequest {
        let page_size = page_size
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size);
        PageRequest::new(page.unwrap_or(1), page_size)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTransitionOutcome {
    pub updated: usize,
    pub items: Vec<ApplicantProfile>,
}

/// Facade the UI layer calls. Every operation checks the gate before touching the store.
pub struct VerificationService<S> {
    gate: Arc<AuthorizationGate>,
    store: Arc<S>,
    state_machine: VerificationStateMachine<S>,
    query: VerificationQueryEngine<S>,
    stats: StatsAggregator<S>,
    export: ExportGenerator<S>,
    clock: Arc<dyn Clock>,
    limits: ListingLimits,
}

impl<S> VerificationService<S>
where
    S: ApplicantStore + 'static,
{
    pub fn new(store: Arc<S>, gate: Arc<AuthorizationGate>) -> Self {
        Self::with_clock(store, gate, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<S>,
        gate: Arc<AuthorizationGate>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gate,
            state_machine: VerificationStateMachine::new(store.clone()),
            query: VerificationQueryEngine::new(store.clone()),
            stats: StatsAggregator::new(store.clone()),
            export: ExportGenerator::new(store.clone()),
            store,
            clock,
            limits: ListingLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ListingLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    pub fn limits(&self) -> ListingLimits {
        self.limits
    }

    pub fn register(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        applicant: NewApplicant,
    ) -> Result<ApplicantProfile, VerificationError> {
        self.require(principal, kind, Capability::Create)?;

        let profile = ApplicantProfile::register(kind, applicant, self.clock.now())?;
        let stored = self.store.save(profile)?;

        info!(
            %kind,
            applicant_id = %stored.id,
            actor_id = %principal.actor_id,
            "applicant registered for verification"
        );
        Ok(stored)
    }

    pub fn get(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<ApplicantProfile, VerificationError> {
        self.require(principal, kind, Capability::View)?;

        self.store
            .get(kind, id)?
            .ok_or_else(|| VerificationError::NotFound {
                kind,
                id: id.clone(),
            })
    }

    pub fn query(
        &self,
        principal: &Principal,
        scope: KindScope,
        filter: &VerificationFilter,
        sort: SortSpec,
        page: PageRequest,
    ) -> Result<QueryPage, VerificationError> {
        self.require_scope(principal, scope, Capability::View)?;
        self.query.query(scope, filter, sort, page)
    }

    /// The acting principal is recorded as the audit entry's actor.
    pub fn transition(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        id: &ApplicantId,
        status: &str,
        notes: Option<String>,
    ) -> Result<ApplicantProfile, VerificationError> {
        self.require(principal, kind, Capability::Manage)?;

        let command = TransitionCommand::new(status, principal.actor_id.clone(), notes);
        self.state_machine
            .transition_at(kind, id, command, self.clock.now())
    }

    pub fn bulk_transition(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        ids: &[ApplicantId],
        status: &str,
        notes: Option<String>,
    ) -> Result<BulkTransitionOutcome, VerificationError> {
        self.require(principal, kind, Capability::Manage)?;

        let command = TransitionCommand::new(status, principal.actor_id.clone(), notes);
        let items = self
            .state_machine
            .transition_many_at(kind, ids, command, self.clock.now())?;

        Ok(BulkTransitionOutcome {
            updated: items.len(),
            items,
        })
    }

    pub fn export(
        &self,
        principal: &Principal,
        scope: KindScope,
        filter: &VerificationFilter,
        format: ExportFormat,
    ) -> Result<ExportArtifact, VerificationError> {
        self.require_scope(principal, scope, Capability::View)?;
        self.export
            .export_on(scope, filter, format, self.clock.now().date_naive())
    }

    pub fn stats(
        &self,
        principal: &Principal,
    ) -> Result<VerificationStatsReport, VerificationError> {
        self.gate.require(principal, REPORT_VIEW)?;
        self.stats.summarize_all()
    }

    pub fn stats_for(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
    ) -> Result<RatedSummary, VerificationError> {
        self.gate.require(principal, REPORT_VIEW)?;
        Ok(self.stats.summarize(kind)?.rated())
    }

    fn require(
        &self,
        principal: &Principal,
        kind: ApplicantKind,
        capability: Capability,
    ) -> Result<(), VerificationError> {
        self.gate
            .require(principal, &permission_for(kind, capability))
    }

    fn require_scope(
        &self,
        principal: &Principal,
        scope: KindScope,
        capability: Capability,
    ) -> Result<(), VerificationError> {
        let required: BTreeSet<String> = scope
            .kinds()
            .into_iter()
            .map(|kind| permission_for(kind, capability))
            .collect();
        for permission in &required {
            self.gate.require(principal, permission)?;
        }
        Ok(())
    }
}
