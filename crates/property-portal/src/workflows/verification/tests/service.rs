use std::sync::Arc;

use super::common::*;
use crate::workflows::verification::store::{ApplicantStore, InMemoryApplicantStore};
use crate::workflows::verification::{
    ActorId, ApplicantId, ApplicantKind, ExportFormat, KindScope, ListingLimits, PageRequest,
    PageSize, SortSpec, ValidationError, VerificationError, VerificationFilter,
    VerificationService, VerificationStatus, VerificationType,
};

#[test]
fn register_creates_pending_profile_with_empty_trail() {
    let store = Arc::new(InMemoryApplicantStore::default());
    let service = build_service(store.clone());
    let mut applicant = new_applicant(" T1 ", "Avery", "Stone");
    applicant.verification_type = Some(VerificationType::Income);

    let profile = service
        .register(&principal("leasing_specialist"), ApplicantKind::Tenant, applicant)
        .expect("registration succeeds");

    assert_eq!(profile.id, ApplicantId::from("T1"));
    assert_eq!(profile.verification_status(), VerificationStatus::Pending);
    assert!(profile.verification_notes().is_empty());
    assert_eq!(profile.verified_at(), None);
    assert_eq!(profile.created_at, minutes_after_base(60));
    assert_eq!(store.len().expect("readable"), 1);
}

#[test]
fn register_rejects_duplicates_blank_fields_and_misplaced_types() {
    let service = build_service(seeded_store());
    let admin = principal("company_admin");

    let duplicate = service
        .register(&admin, ApplicantKind::Tenant, new_applicant("T1", "Avery", "Stone"))
        .expect_err("T1 already registered");
    assert!(matches!(duplicate, VerificationError::Conflict { .. }));

    let mut blank = new_applicant("T50", "Avery", "Stone");
    blank.email = "  ".to_string();
    let err = service
        .register(&admin, ApplicantKind::Tenant, blank)
        .expect_err("blank email");
    assert!(matches!(
        err,
        VerificationError::Validation(ValidationError::BlankField("email"))
    ));

    let mut typed = new_applicant("L50", "Riley", "Chen");
    typed.verification_type = Some(VerificationType::Credit);
    let err = service
        .register(&admin, ApplicantKind::Landlord, typed)
        .expect_err("landlords carry no verification type");
    assert!(matches!(
        err,
        VerificationError::Validation(ValidationError::TypeNotAllowed(ApplicantKind::Landlord))
    ));
}

#[test]
fn denied_transition_leaves_the_store_untouched() {
    let store = seeded_store();
    let service = build_service(store.clone());
    let before = store
        .get(ApplicantKind::Tenant, &ApplicantId::from("T1"))
        .expect("readable")
        .expect("exists");

    let err = service
        .transition(
            &principal("leasing_specialist"),
            ApplicantKind::Tenant,
            &ApplicantId::from("T1"),
            "verified",
            Some("docs ok".to_string()),
        )
        .expect_err("leasing specialists cannot moderate");

    match err {
        VerificationError::Forbidden { permission } => assert_eq!(permission, "tenant.manage"),
        other => panic!("expected forbidden, got {other:?}"),
    }
    let after = store
        .get(ApplicantKind::Tenant, &ApplicantId::from("T1"))
        .expect("readable")
        .expect("exists");
    assert_eq!(before, after);
}

#[test]
fn denial_precedes_not_found() {
    let service = build_service(seeded_store());

    let err = service
        .transition(
            &principal("leasing_specialist"),
            ApplicantKind::Tenant,
            &ApplicantId::from("ghost"),
            "verified",
            None,
        )
        .expect_err("denied");
    assert_eq!(err.code(), "forbidden");

    let err = service
        .get(
            &principal("property_manager"),
            ApplicantKind::Tenant,
            &ApplicantId::from("ghost"),
        )
        .expect_err("missing");
    assert_eq!(err.code(), "not_found");
}

#[test]
fn transition_records_the_acting_principal() {
    let service = build_service(seeded_store());
    let manager = principal("property_manager");

    let updated = service
        .transition(
            &manager,
            ApplicantKind::Tenant,
            &ApplicantId::from("T1"),
            "verified",
            Some("docs ok".to_string()),
        )
        .expect("transition succeeds");

    let entry = &updated.verification_notes()[0];
    assert_eq!(entry.actor_id, ActorId("property_manager-1".to_string()));
    assert_eq!(entry.recorded_at, minutes_after_base(60));
    assert_eq!(updated.verified_at(), Some(minutes_after_base(60)));
}

#[test]
fn landlords_and_managers_require_user_permissions() {
    let service = build_service(seeded_store());

    let err = service
        .transition(
            &principal("property_manager"),
            ApplicantKind::Landlord,
            &ApplicantId::from("L3"),
            "verified",
            None,
        )
        .expect_err("property managers do not moderate landlords");
    assert_eq!(err.code(), "forbidden");

    let updated = service
        .transition(
            &principal("company_admin"),
            ApplicantKind::Landlord,
            &ApplicantId::from("L3"),
            "verified",
            None,
        )
        .expect("company admins hold user.manage");
    assert_eq!(updated.verification_status(), VerificationStatus::Verified);
}

#[test]
fn cross_kind_listing_needs_view_on_every_kind() {
    let service = build_service(seeded_store());
    let filter = VerificationFilter::default();
    let page = PageRequest::new(1, 20);

    let err = service
        .query(
            &principal("property_manager"),
            KindScope::All,
            &filter,
            SortSpec::default(),
            page,
        )
        .expect_err("user.view missing");
    assert!(matches!(
        err,
        VerificationError::Forbidden { ref permission } if permission == "user.view"
    ));

    let listing = service
        .query(
            &principal("compliance_officer"),
            KindScope::All,
            &filter,
            SortSpec::default(),
            page,
        )
        .expect("compliance officers see every kind");
    assert_eq!(listing.total_count, 8);
}

#[test]
fn bulk_transition_reports_updated_rows() {
    let service = build_service(seeded_store());

    let outcome = service
        .bulk_transition(
            &principal("property_manager"),
            ApplicantKind::Tenant,
            &[ApplicantId::from("T1"), ApplicantId::from("T2")],
            "rejected",
            Some("incomplete application".to_string()),
        )
        .expect("bulk succeeds");

    assert_eq!(outcome.updated, 2);
    assert!(outcome
        .items
        .iter()
        .all(|profile| profile.verification_status() == VerificationStatus::Rejected));
}

#[test]
fn stats_require_report_view() {
    let service = build_service(seeded_store());

    let err = service
        .stats(&principal("leasing_specialist"))
        .expect_err("no report.view");
    assert_eq!(err.code(), "forbidden");

    let report = service
        .stats(&principal("data_analyst"))
        .expect("analysts read reports");
    assert_eq!(report.landlord.verification_rate, 50);

    let managers = service
        .stats_for(&principal("data_analyst"), ApplicantKind::Manager)
        .expect("per-kind stats");
    assert_eq!(managers.summary.under_review, 1);
}

#[test]
fn export_uses_clock_date_and_view_permission() {
    let service = build_service(seeded_store());

    let artifact = service
        .export(
            &principal("compliance_officer"),
            KindScope::Kind(ApplicantKind::Landlord),
            &VerificationFilter::default(),
            ExportFormat::Csv,
        )
        .expect("export succeeds");
    assert_eq!(artifact.filename, "landlord-verification-2024-03-14.csv");
    assert_eq!(artifact.row_count, 4);

    let err = service
        .export(
            &principal("data_analyst"),
            KindScope::Kind(ApplicantKind::Tenant),
            &VerificationFilter::default(),
            ExportFormat::Csv,
        )
        .expect_err("analysts lack tenant.view");
    assert_eq!(err.code(), "forbidden");
}

#[test]
fn listing_limits_fill_defaults_and_cap_page_size() {
    let limits = ListingLimits {
        default_page_size: 10,
        max_page_size: 25,
    };

    assert_eq!(limits.page_request(None, None), PageRequest::new(1, 10));
    assert_eq!(
        limits.page_request(Some(3), Some(500)).page_size,
        PageSize::Limited(25)
    );

    let service = VerificationService::new(seeded_store(), gate()).with_limits(limits);
    assert_eq!(service.limits(), limits);
}

#[test]
fn store_outage_surfaces_as_store_error() {
    let service = build_service(Arc::new(UnavailableStore));

    let err = service
        .get(
            &principal("property_manager"),
            ApplicantKind::Tenant,
            &ApplicantId::from("T1"),
        )
        .expect_err("store offline");
    assert!(matches!(err, VerificationError::Store(_)));
}
