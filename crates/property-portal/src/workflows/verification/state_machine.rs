use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::domain::{ActorId, ApplicantId, ApplicantKind, ApplicantProfile, VerificationStatus};
use super::error::{ValidationError, VerificationError};
use super::store::ApplicantStore;

/// Moderator request to move a profile to a new status.
///
/// `status` stays raw text until validated so that bad values surface as
/// [`ValidationError::InvalidStatus`] rather than a deserialization failure upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommand {
    pub status: String,
    pub actor_id: ActorId,
    pub notes: Option<String>,
}

impl TransitionCommand {
    pub fn new(status: impl Into<String>, actor_id: ActorId, notes: Option<String>) -> Self {
        Self {
            status: status.into(),
            actor_id,
            notes,
        }
    }

    fn validated_status(&self) -> Result<VerificationStatus, ValidationError> {
        self.status.parse()
    }

    fn note_text(&self) -> String {
        self.notes.clone().unwrap_or_default()
    }
}

/// Applies status transitions. Any status may move to any other status; authorization is the
/// only gatekeeper and there is no terminal state.
pub struct VerificationStateMachine<S> {
    store: Arc<S>,
}

impl<S> VerificationStateMachine<S>
where
    S: ApplicantStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn transition(
        &self,
        kind: ApplicantKind,
        id: &ApplicantId,
        command: TransitionCommand,
    ) -> Result<ApplicantProfile, VerificationError> {
        self.transition_at(kind, id, command, Utc::now())
    }

    /// Validate, append one audit entry, and commit. Replays are not deduplicated: resubmitting
    /// the current status still appends a new entry.
    pub fn transition_at(
        &self,
        kind: ApplicantKind,
        id: &ApplicantId,
        command: TransitionCommand,
        now: DateTime<Utc>,
    ) -> Result<ApplicantProfile, VerificationError> {
        let status = command.validated_status()?;
        let mut profile = self.fetch(kind, id)?;
        let previous = profile.verification_status();

        profile.record_transition(status, command.actor_id.clone(), command.note_text(), now);

        let stored = self.store.save(profile).map_err(|err| {
            warn!(
                %kind,
                applicant_id = %id,
                actor_id = %command.actor_id,
                error = %err,
                "verification transition rejected by store"
            );
            VerificationError::from(err)
        })?;

        info!(
            %kind,
            applicant_id = %id,
            actor_id = %command.actor_id,
            from = previous.label(),
            to = status.label(),
            audit_entries = stored.verification_notes().len(),
            "verification status updated"
        );

        Ok(stored)
    }

    /// Apply the same transition to every id in one atomic batch. Nothing is written unless every
    /// profile exists and every revision check passes.
    pub fn transition_many_at(
        &self,
        kind: ApplicantKind,
        ids: &[ApplicantId],
        command: TransitionCommand,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApplicantProfile>, VerificationError> {
        let status = command.validated_status()?;
        if ids.is_empty() {
            return Err(ValidationError::EmptyBatch.into());
        }

        let mut seen = HashSet::new();
        if let Some(repeated) = ids.iter().find(|id| !seen.insert(*id)) {
            return Err(ValidationError::DuplicateBatchEntry(repeated.0.clone()).into());
        }

        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            let mut profile = self.fetch(kind, id)?;
            profile.record_transition(status, command.actor_id.clone(), command.note_text(), now);
            updated.push(profile);
        }

        let stored = self.store.save_batch(updated).map_err(|err| {
            warn!(
                %kind,
                actor_id = %command.actor_id,
                error = %err,
                "bulk verification rejected by store"
            );
            VerificationError::from(err)
        })?;

        info!(
            %kind,
            actor_id = %command.actor_id,
            to = status.label(),
            updated = stored.len(),
            "bulk verification status updated"
        );

        Ok(stored)
    }

    fn fetch(
        &self,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<ApplicantProfile, VerificationError> {
        self.store
            .get(kind, id)?
            .ok_or_else(|| VerificationError::NotFound {
                kind,
                id: id.clone(),
            })
    }
}
