//! Integration specifications for the applicant verification workflow.
//!
//! Scenarios drive the public service facade and HTTP router end to end: registration, moderation,
//! listing, reporting, and export across tenants, landlords, and managers.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use property_portal::workflows::verification::{
        ActorId, ApplicantId, ApplicantKind, AuthorizationGate, Clock, InMemoryApplicantStore,
        NewApplicant, Principal, VerificationService,
    };

    pub(super) struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0)
                .single()
                .expect("valid timestamp")
        }
    }

    pub(super) fn service() -> (
        VerificationService<InMemoryApplicantStore>,
        Arc<InMemoryApplicantStore>,
    ) {
        let store = Arc::new(InMemoryApplicantStore::default());
        let gate = Arc::new(AuthorizationGate::standard().expect("standard grants"));
        let service = VerificationService::with_clock(store.clone(), gate, Arc::new(FixedClock));
        (service, store)
    }

    pub(super) fn principal(
        service: &VerificationService<InMemoryApplicantStore>,
        role: &str,
    ) -> Principal {
        service.gate().principal(ActorId(format!("{role}-7")), role)
    }

    pub(super) fn applicant(id: &str, first: &str, last: &str) -> NewApplicant {
        NewApplicant {
            id: ApplicantId::from(id),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_ascii_lowercase()),
            phone: String::new(),
            verification_type: None,
        }
    }

    /// Registers the reporting fixture: three tenants, four landlords, one manager.
    pub(super) fn register_portfolio(service: &VerificationService<InMemoryApplicantStore>) {
        let admin = principal(service, "company_admin");
        let applicants = [
            (ApplicantKind::Tenant, "T1", "Avery", "Stone"),
            (ApplicantKind::Tenant, "T2", "Blake", "Rivera"),
            (ApplicantKind::Tenant, "T3", "Casey", "Nguyen"),
            (ApplicantKind::Landlord, "L1", "Dana", "Whitaker"),
            (ApplicantKind::Landlord, "L2", "Emerson", "Hale"),
            (ApplicantKind::Landlord, "L3", "Finley", "Ortiz"),
            (ApplicantKind::Landlord, "L4", "Gray", "Whitman"),
            (ApplicantKind::Manager, "M-100", "Harper", "Lin"),
        ];
        for (kind, id, first, last) in applicants {
            service
                .register(&admin, kind, applicant(id, first, last))
                .expect("registration succeeds");
        }

        let decisions = [
            (ApplicantKind::Tenant, "T3", "verified"),
            (ApplicantKind::Landlord, "L1", "verified"),
            (ApplicantKind::Landlord, "L2", "verified"),
            (ApplicantKind::Landlord, "L4", "rejected"),
            (ApplicantKind::Manager, "M-100", "under_review"),
        ];
        for (kind, id, status) in decisions {
            service
                .transition(&admin, kind, &ApplicantId::from(id), status, None)
                .expect("transition succeeds");
        }
    }
}

mod lifecycle {
    use super::common::*;

    use property_portal::workflows::verification::{
        ApplicantId, ApplicantKind, ExportFormat, KindScope, PageRequest, SortSpec,
        VerificationError, VerificationFilter, VerificationStatus,
    };

    #[test]
    fn moderator_verifies_a_new_tenant() {
        let (service, _) = service();
        let manager = principal(&service, "property_manager");

        service
            .register(&manager, ApplicantKind::Tenant, applicant("T1", "Avery", "Stone"))
            .expect("registered");
        let verified = service
            .transition(
                &manager,
                ApplicantKind::Tenant,
                &ApplicantId::from("T1"),
                "verified",
                Some("docs ok".to_string()),
            )
            .expect("verified");

        assert_eq!(verified.verification_status(), VerificationStatus::Verified);
        assert_eq!(verified.verification_notes().len(), 1);
        assert!(verified.verified_at().is_some());
        assert!(verified.is_consistent());
    }

    #[test]
    fn reporting_and_listing_agree_on_the_portfolio() {
        let (service, _) = service();
        register_portfolio(&service);
        let officer = principal(&service, "compliance_officer");

        let pending_tenants = service
            .query(
                &officer,
                KindScope::Kind(ApplicantKind::Tenant),
                &VerificationFilter::with_status(VerificationStatus::Pending),
                SortSpec::default(),
                PageRequest::new(1, 20),
            )
            .expect("listing");
        assert_eq!(pending_tenants.total_count, 2);

        let report = service.stats(&officer).expect("report");
        assert_eq!(report.landlord.summary.total, 4);
        assert_eq!(report.landlord.summary.verified, 2);
        assert_eq!(report.landlord.summary.pending, 1);
        assert_eq!(report.landlord.summary.rejected, 1);
        assert_eq!(report.landlord.verification_rate, 50);
        assert_eq!(report.combined.summary.total, 8);

        let export = service
            .export(
                &officer,
                KindScope::All,
                &VerificationFilter::with_search("whit"),
                ExportFormat::Csv,
            )
            .expect("export");
        let listing = service
            .query(
                &officer,
                KindScope::All,
                &VerificationFilter::with_search("whit"),
                SortSpec::default(),
                PageRequest::unbounded(),
            )
            .expect("listing");
        assert_eq!(export.row_count, listing.total_count);
        assert_eq!(export.filename, "all-verification-2024-06-03.csv");
    }

    #[test]
    fn missing_manager_is_not_found() {
        let (service, _) = service();
        let admin = principal(&service, "system_admin");

        let err = service
            .transition(
                &admin,
                ApplicantKind::Manager,
                &ApplicantId::from("missing-id"),
                "verified",
                None,
            )
            .expect_err("nothing registered");
        assert!(matches!(err, VerificationError::NotFound { .. }));
    }

    #[test]
    fn denied_moderator_changes_nothing() {
        let (service, _) = service();
        register_portfolio(&service);
        let leasing = principal(&service, "leasing_specialist");
        let admin = principal(&service, "system_admin");

        let err = service
            .transition(
                &leasing,
                ApplicantKind::Tenant,
                &ApplicantId::from("T1"),
                "verified",
                None,
            )
            .expect_err("no tenant.manage");
        assert_eq!(err.code(), "forbidden");

        let profile = service
            .get(&admin, ApplicantKind::Tenant, &ApplicantId::from("T1"))
            .expect("readable");
        assert_eq!(profile.verification_status(), VerificationStatus::Pending);
        assert!(profile.verification_notes().is_empty());
    }
}

mod http {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::common::*;
    use property_portal::workflows::verification::verification_router;

    #[tokio::test]
    async fn stats_endpoint_reports_combined_totals() {
        let (service, _) = service();
        register_portfolio(&service);
        let router = verification_router(Arc::new(service));

        let response = router
            .oneshot(
                Request::get("/api/v1/verification/stats/all")
                    .header("x-actor-id", "analyst-1")
                    .header("x-actor-role", "data_analyst")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .expect("read body");
        let payload: Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(payload["combined"]["total"], 8);
        assert_eq!(payload["combined"]["verified"], 3);
        assert_eq!(payload["manager"]["underReview"], 1);
    }
}
