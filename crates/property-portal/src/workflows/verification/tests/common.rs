use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::verification::store::{ApplicantStore, InMemoryApplicantStore, StoreError};
use crate::workflows::verification::{
    verification_router, ActorId, ApplicantId, ApplicantKind, ApplicantProfile, AuthorizationGate,
    Clock, NewApplicant, Principal, VerificationService, VerificationStatus, VerificationType,
};

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn minutes_after_base(minutes: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minutes)
}

pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub(super) fn moderator() -> ActorId {
    ActorId("M1".to_string())
}

pub(super) fn new_applicant(id: &str, first: &str, last: &str) -> NewApplicant {
    NewApplicant {
        id: ApplicantId::from(id),
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!(
            "{}.{}@example.com",
            first.to_ascii_lowercase(),
            last.to_ascii_lowercase()
        ),
        phone: "555-0100".to_string(),
        verification_type: None,
    }
}

/// Pending profile created `minutes` after the base time.
pub(super) fn profile(
    kind: ApplicantKind,
    id: &str,
    first: &str,
    last: &str,
    minutes: i64,
) -> ApplicantProfile {
    let mut applicant = new_applicant(id, first, last);
    if kind == ApplicantKind::Tenant {
        applicant.verification_type = Some(VerificationType::Identity);
    }
    ApplicantProfile::register(kind, applicant, minutes_after_base(minutes))
        .expect("fixture profile is valid")
}

/// Profile already moved to `status` by a moderator.
pub(super) fn profile_with_status(
    kind: ApplicantKind,
    id: &str,
    first: &str,
    last: &str,
    minutes: i64,
    status: VerificationStatus,
) -> ApplicantProfile {
    let mut profile = profile(kind, id, first, last, minutes);
    if status != VerificationStatus::Pending {
        profile.record_transition(
            status,
            moderator(),
            "fixture".to_string(),
            minutes_after_base(minutes + 1),
        );
    }
    profile
}

/// Two pending tenants, one verified tenant, and landlords matching the reporting example.
pub(super) fn seeded_store() -> Arc<InMemoryApplicantStore> {
    use ApplicantKind::*;
    use VerificationStatus::*;

    let profiles = vec![
        profile(Tenant, "T1", "Avery", "Stone", 0),
        profile(Tenant, "T2", "Blake", "Rivera", 10),
        profile_with_status(Tenant, "T3", "Casey", "Nguyen", 20, Verified),
        profile_with_status(Landlord, "L1", "Dana", "Whitaker", 5, Verified),
        profile_with_status(Landlord, "L2", "Emerson", "Hale", 15, Verified),
        profile(Landlord, "L3", "Finley", "Ortiz", 25),
        profile_with_status(Landlord, "L4", "Gray", "Whitman", 35, Rejected),
        profile_with_status(Manager, "M-100", "Harper", "Lin", 30, UnderReview),
    ];
    Arc::new(InMemoryApplicantStore::with_profiles(profiles).expect("unique fixtures"))
}

pub(super) fn gate() -> Arc<AuthorizationGate> {
    Arc::new(AuthorizationGate::standard().expect("standard grants resolve"))
}

pub(super) fn principal(role: &str) -> Principal {
    gate().principal(ActorId(format!("{role}-1")), role)
}

pub(super) fn build_service<S>(store: Arc<S>) -> VerificationService<S>
where
    S: ApplicantStore + 'static,
{
    VerificationService::with_clock(store, gate(), Arc::new(FixedClock(minutes_after_base(60))))
}

pub(super) fn router_with_store(store: Arc<InMemoryApplicantStore>) -> axum::Router {
    verification_router(Arc::new(build_service(store)))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

pub(super) struct UnavailableStore;

impl ApplicantStore for UnavailableStore {
    fn get(
        &self,
        _kind: ApplicantKind,
        _id: &ApplicantId,
    ) -> Result<Option<ApplicantProfile>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _kind: ApplicantKind) -> Result<Vec<ApplicantProfile>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn list_all(&self) -> Result<Vec<ApplicantProfile>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn save(&self, _profile: ApplicantProfile) -> Result<ApplicantProfile, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn save_batch(
        &self,
        _profiles: Vec<ApplicantProfile>,
    ) -> Result<Vec<ApplicantProfile>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Holds the first `readers` reads at a barrier so concurrent writers all work from the same
/// revision before any of them commits.
pub(super) struct InterleavingStore {
    inner: InMemoryApplicantStore,
    barrier: Barrier,
    held_reads: AtomicUsize,
}

impl InterleavingStore {
    pub(super) fn new(inner: InMemoryApplicantStore, readers: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(readers),
            held_reads: AtomicUsize::new(readers),
        }
    }
}

impl ApplicantStore for InterleavingStore {
    fn get(
        &self,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<Option<ApplicantProfile>, StoreError> {
        let read = self.inner.get(kind, id);
        let hold = self
            .held_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if hold {
            self.barrier.wait();
        }
        read
    }

    fn list(&self, kind: ApplicantKind) -> Result<Vec<ApplicantProfile>, StoreError> {
        self.inner.list(kind)
    }

    fn list_all(&self) -> Result<Vec<ApplicantProfile>, StoreError> {
        self.inner.list_all()
    }

    fn save(&self, profile: ApplicantProfile) -> Result<ApplicantProfile, StoreError> {
        self.inner.save(profile)
    }

    fn save_batch(
        &self,
        profiles: Vec<ApplicantProfile>,
    ) -> Result<Vec<ApplicantProfile>, StoreError> {
        self.inner.save_batch(profiles)
    }
}

/// Serves cross-kind reads only through `list_all`; per-kind listing fails. Anything reporting on
/// `all` must therefore read a single snapshot.
pub(super) struct SnapshotOnlyStore(pub(super) Arc<InMemoryApplicantStore>);

impl ApplicantStore for SnapshotOnlyStore {
    fn get(
        &self,
        kind: ApplicantKind,
        id: &ApplicantId,
    ) -> Result<Option<ApplicantProfile>, StoreError> {
        self.0.get(kind, id)
    }

    fn list(&self, _kind: ApplicantKind) -> Result<Vec<ApplicantProfile>, StoreError> {
        Err(StoreError::Unavailable("per-kind listing disabled".to_string()))
    }

    fn list_all(&self) -> Result<Vec<ApplicantProfile>, StoreError> {
        self.0.list_all()
    }

    fn save(&self, profile: ApplicantProfile) -> Result<ApplicantProfile, StoreError> {
        self.0.save(profile)
    }

    fn save_batch(
        &self,
        profiles: Vec<ApplicantProfile>,
    ) -> Result<Vec<ApplicantProfile>, StoreError> {
        self.0.save_batch(profiles)
    }
}
