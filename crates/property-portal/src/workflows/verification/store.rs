use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{ApplicantId, ApplicantKind, ApplicantProfile};
use super::error::ValidationError;

/// Storage abstraction holding one profile per `(kind, id)`.
///
/// Writes are optimistic: a profile carries the revision it was read at and `save` only commits
/// when that revision is still current. A stale write fails with [`StoreError::Conflict`] and the
/// caller decides whether to re-fetch and retry.
pub trait ApplicantStore: Send + Sync {
    fn get(
        &self,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<Option<ApplicantProfile>, StoreError>;

    fn list(&self, kind: ApplicantKind) -> Result<Vec<ApplicantProfile>, StoreError>;

    /// Every profile of every kind, read as one consistent snapshot.
    fn list_all(&self) -> Result<Vec<ApplicantProfile>, StoreError>;

    /// Persist the full profile, audit trail included. Returns the stored copy with its new
    /// revision. A profile at revision `0` is an insert and conflicts with an existing record.
    fn save(&self, profile: ApplicantProfile) -> Result<ApplicantProfile, StoreError>;

    /// Persist several profiles as one unit: either every revision check passes and all are
    /// committed, or nothing is.
    fn save_batch(
        &self,
        profiles: Vec<ApplicantProfile>,
    ) -> Result<Vec<ApplicantProfile>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {id} changed underneath the write (read revision {expected}, stored revision {found})")]
    Conflict {
        kind: ApplicantKind,
        id: ApplicantId,
        expected: u64,
        found: u64,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

type ProfileKey = (ApplicantKind, ApplicantId);

/// Process-local store used by the API service, the CLI, and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryApplicantStore {
    records: Arc<Mutex<HashMap<ProfileKey, ApplicantProfile>>>,
}

impl InMemoryApplicantStore {
    /// Preload already-persisted profiles. Duplicate `(kind, id)` pairs are rejected.
    pub fn with_profiles<I>(profiles: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = ApplicantProfile>,
    {
        let store = Self::default();
        {
            let mut guard = store.lock()?;
            for mut profile in profiles {
                let key = (profile.kind, profile.id.clone());
                if let Some(existing) = guard.get(&key) {
                    return Err(StoreError::Conflict {
                        kind: profile.kind,
                        id: profile.id,
                        expected: 0,
                        found: existing.revision,
                    });
                }
                profile.revision = 1;
                guard.insert(key, profile);
            }
        }
        Ok(store)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ProfileKey, ApplicantProfile>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("applicant store mutex poisoned".to_string()))
    }
}

fn check_revision(
    records: &HashMap<ProfileKey, ApplicantProfile>,
    profile: &ApplicantProfile,
) -> Result<(), StoreError> {
    let found = records
        .get(&(profile.kind, profile.id.clone()))
        .map(|stored| stored.revision)
        .unwrap_or(0);

    if found == profile.revision {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            kind: profile.kind,
            id: profile.id.clone(),
            expected: profile.revision,
            found,
        })
    }
}

impl ApplicantStore for InMemoryApplicantStore {
    fn get(
        &self,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<Option<ApplicantProfile>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.get(&(kind, id.clone())).cloned())
    }

    fn list(&self, kind: ApplicantKind) -> Result<Vec<ApplicantProfile>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .values()
            .filter(|profile| profile.kind == kind)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<ApplicantProfile>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.values().cloned().collect())
    }

    fn save(&self, mut profile: ApplicantProfile) -> Result<ApplicantProfile, StoreError> {
        let mut guard = self.lock()?;
        check_revision(&guard, &profile)?;
        profile.revision += 1;
        guard.insert((profile.kind, profile.id.clone()), profile.clone());
        Ok(profile)
    }

    fn save_batch(
        &self,
        profiles: Vec<ApplicantProfile>,
    ) -> Result<Vec<ApplicantProfile>, StoreError> {
        let mut guard = self.lock()?;

        let mut seen = HashSet::new();
        for profile in &profiles {
            let key = (profile.kind, profile.id.clone());
            if !seen.insert(key) {
                // Second copy of the same record in one batch is necessarily stale.
                return Err(StoreError::Conflict {
                    kind: profile.kind,
                    id: profile.id.clone(),
                    expected: profile.revision,
                    found: profile.revision + 1,
                });
            }
            check_revision(&guard, profile)?;
        }

        let mut committed = Vec::with_capacity(profiles.len());
        for mut profile in profiles {
            profile.revision += 1;
            guard.insert((profile.kind, profile.id.clone()), profile.clone());
            committed.push(profile);
        }
        Ok(committed)
    }
}

/// Error raised while loading seed profiles.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("failed to read applicant seed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid applicant seed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("seed profile {kind} {id} has a verifiedAt that disagrees with its status history")]
    Inconsistent { kind: ApplicantKind, id: ApplicantId },
    #[error("seed profile {kind} {id} is invalid: {source}")]
    Invalid {
        kind: ApplicantKind,
        id: ApplicantId,
        source: ValidationError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parse a JSON array of profiles. Each must pass the same field rules as registration and
/// agree with the `verifiedAt` invariant.
pub fn load_seed<R: Read>(reader: R) -> Result<Vec<ApplicantProfile>, SeedError> {
    let profiles: Vec<ApplicantProfile> = serde_json::from_reader(reader)?;
    for profile in &profiles {
        profile
            .check_fields()
            .map_err(|source| SeedError::Invalid {
                kind: profile.kind,
                id: profile.id.clone(),
                source,
            })?;
        if !profile.is_consistent() {
            return Err(SeedError::Inconsistent {
                kind: profile.kind,
                id: profile.id.clone(),
            });
        }
    }
    Ok(profiles)
}

impl InMemoryApplicantStore {
    pub fn from_seed_path<P: AsRef<Path>>(path: P) -> Result<Self, SeedError> {
        let file = std::fs::File::open(path)?;
        let profiles = load_seed(std::io::BufReader::new(file))?;
        Ok(Self::with_profiles(profiles)?)
    }
}
