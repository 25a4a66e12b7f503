use crate::infra::{build_service, cli_principal, PortalService};
use clap::Args;
use property_portal::config::{AppConfig, VerificationConfig};
use property_portal::error::AppError;
use property_portal::workflows::verification::{
    ActorId, ApplicantId, ApplicantKind, ExportArtifact, ExportFormat, KindScope, NewApplicant,
    PageRequest, Principal, RatedSummary, SortSpec, VerificationError, VerificationFilter,
    VerificationStatsReport, VerificationStatus, VerificationType,
};
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the CSV export preview at the end of the demo.
    #[arg(long)]
    pub(crate) skip_export: bool,
}

#[derive(Args, Debug)]
pub(crate) struct StatsArgs {
    /// Applicant kind to report on (tenant, landlord, manager, or all)
    #[arg(long, default_value = "all")]
    pub(crate) kind: String,
    /// Role whose grants the report runs under
    #[arg(long, default_value = "data_analyst")]
    pub(crate) role: String,
    /// Seed file with applicant profiles (overrides APP_SEED_PATH)
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Applicant kind to export (tenant, landlord, manager, or all)
    #[arg(long, default_value = "all")]
    pub(crate) kind: String,
    /// Only export applicants with this status
    #[arg(long)]
    pub(crate) status: Option<String>,
    /// Case-insensitive match against first name, last name, or email
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// csv or json
    #[arg(long, default_value = "csv")]
    pub(crate) format: String,
    /// Role whose grants the export runs under
    #[arg(long, default_value = "compliance_officer")]
    pub(crate) role: String,
    /// Destination file. Defaults to the conventional export filename in the working directory.
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Seed file with applicant profiles (overrides APP_SEED_PATH)
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

pub(crate) fn run_stats(args: StatsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config.verification, args.seed.as_deref())?;
    let principal = cli_principal(&service, &args.role);

    match args.kind.parse::<KindScope>().map_err(VerificationError::from)? {
        KindScope::All => {
            let report = service.stats(&principal)?;
            render_stats_report(&report);
        }
        KindScope::Kind(kind) => {
            let summary = service.stats_for(&principal, kind)?;
            print_stats_header();
            print_stats_row(kind.label(), &summary);
        }
    }

    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config.verification, args.seed.as_deref())?;
    let principal = cli_principal(&service, &args.role);

    let scope = args
        .kind
        .parse::<KindScope>()
        .map_err(VerificationError::from)?;
    let format = args
        .format
        .parse::<ExportFormat>()
        .map_err(VerificationError::from)?;
    let status = args
        .status
        .as_deref()
        .map(str::parse::<VerificationStatus>)
        .transpose()
        .map_err(VerificationError::from)?;
    let filter = VerificationFilter {
        status,
        search_text: args.search,
    };

    let artifact = service.export(&principal, scope, &filter, format)?;
    let destination = args
        .output
        .unwrap_or_else(|| PathBuf::from(&artifact.filename));
    std::fs::write(&destination, &artifact.bytes)?;

    println!(
        "Wrote {} {} rows to {}",
        artifact.row_count,
        scope.label(),
        destination.display()
    );
    Ok(())
}

/// One sample applicant: kind, id, first name, last name, email, phone, and target status.
type RosterEntry = (
    ApplicantKind,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    VerificationStatus,
);

/// Sample roster mirroring the verification dashboards: five applicants per kind, each moved to
/// the status the dashboard shows for them.
const DEMO_ROSTER: [RosterEntry; 15] = [
    (
        ApplicantKind::Tenant,
        "tenant-1",
        "John",
        "Doe",
        "john@example.com",
        "",
        VerificationStatus::Pending,
    ),
    (
        ApplicantKind::Tenant,
        "tenant-2",
        "Jane",
        "Smith",
        "jane@example.com",
        "",
        VerificationStatus::Verified,
    ),
    (
        ApplicantKind::Tenant,
        "tenant-3",
        "Mike",
        "Johnson",
        "mike@example.com",
        "",
        VerificationStatus::UnderReview,
    ),
    (
        ApplicantKind::Tenant,
        "tenant-4",
        "Sarah",
        "Williams",
        "sarah@example.com",
        "",
        VerificationStatus::Rejected,
    ),
    (
        ApplicantKind::Tenant,
        "tenant-5",
        "Tom",
        "Brown",
        "tom@example.com",
        "",
        VerificationStatus::Pending,
    ),
    (
        ApplicantKind::Landlord,
        "landlord-1",
        "Robert",
        "Johnson",
        "robert@example.com",
        "555-0101",
        VerificationStatus::Pending,
    ),
    (
        ApplicantKind::Landlord,
        "landlord-2",
        "Patricia",
        "Williams",
        "patricia@example.com",
        "555-0102",
        VerificationStatus::Verified,
    ),
    (
        ApplicantKind::Landlord,
        "landlord-3",
        "Michael",
        "Brown",
        "michael@example.com",
        "555-0103",
        VerificationStatus::UnderReview,
    ),
    (
        ApplicantKind::Landlord,
        "landlord-4",
        "Jennifer",
        "Davis",
        "jennifer@example.com",
        "555-0104",
        VerificationStatus::Rejected,
    ),
    (
        ApplicantKind::Landlord,
        "landlord-5",
        "David",
        "Miller",
        "david@example.com",
        "555-0105",
        VerificationStatus::Pending,
    ),
    (
        ApplicantKind::Manager,
        "manager-1",
        "James",
        "Anderson",
        "james@example.com",
        "555-0201",
        VerificationStatus::Pending,
    ),
    (
        ApplicantKind::Manager,
        "manager-2",
        "Lisa",
        "Taylor",
        "lisa@example.com",
        "555-0202",
        VerificationStatus::Verified,
    ),
    (
        ApplicantKind::Manager,
        "manager-3",
        "Christopher",
        "Thomas",
        "chris@example.com",
        "555-0203",
        VerificationStatus::UnderReview,
    ),
    (
        ApplicantKind::Manager,
        "manager-4",
        "Maria",
        "Garcia",
        "maria@example.com",
        "555-0204",
        VerificationStatus::Rejected,
    ),
    (
        ApplicantKind::Manager,
        "manager-5",
        "Daniel",
        "Martinez",
        "daniel@example.com",
        "555-0205",
        VerificationStatus::Pending,
    ),
];

const TENANT_TYPES: [VerificationType; 5] = [
    VerificationType::Identity,
    VerificationType::Income,
    VerificationType::Credit,
    VerificationType::Background,
    VerificationType::Employment,
];

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = build_service(&VerificationConfig::default(), None)?;
    let admin = service
        .gate()
        .principal(ActorId("demo.admin".to_string()), "company_admin");

    println!("Applicant verification demo");
    seed_demo_roster(&service, &admin)?;
    println!("- Registered {} applicants", DEMO_ROSTER.len());

    let pending = service.query(
        &admin,
        KindScope::Kind(ApplicantKind::Tenant),
        &VerificationFilter::with_status(VerificationStatus::Pending),
        SortSpec::default(),
        PageRequest::new(1, 10),
    )?;
    println!("\nPending tenants ({} total)", pending.total_count);
    for profile in &pending.items {
        println!("  - {} <{}>", profile.full_name(), profile.email);
    }

    println!("\nModeration");
    let tenant = ApplicantId::from("tenant-1");
    let verified = service.transition(
        &admin,
        ApplicantKind::Tenant,
        &tenant,
        "verified",
        Some("ID and pay stubs match".to_string()),
    )?;
    println!(
        "- {} -> {} ({} audit entries)",
        verified.full_name(),
        verified.verification_status(),
        verified.verification_notes().len()
    );

    let reopened = service.transition(
        &admin,
        ApplicantKind::Tenant,
        &tenant,
        "under_review",
        Some("Employer callback pending".to_string()),
    )?;
    println!(
        "- Reopened {} -> {} (decision timestamp kept: {})",
        reopened.full_name(),
        reopened.verification_status(),
        reopened.verified_at().is_some()
    );

    let leasing = service
        .gate()
        .principal(ActorId("demo.leasing".to_string()), "leasing_specialist");
    match service.transition(&leasing, ApplicantKind::Tenant, &tenant, "verified", None) {
        Ok(_) => println!("- Leasing specialist unexpectedly moderated {}", tenant),
        Err(err) => println!(
            "- Leasing specialist attempt refused: {} ({})",
            err,
            err.code()
        ),
    }

    match service.transition(
        &admin,
        ApplicantKind::Manager,
        &ApplicantId::from("manager-404"),
        "verified",
        None,
    ) {
        Ok(_) => println!("- Unknown manager was unexpectedly updated"),
        Err(err) => println!("- Unknown manager: {} ({})", err, err.code()),
    }

    println!();
    let report = service.stats(&admin)?;
    render_stats_report(&report);

    if args.skip_export {
        return Ok(());
    }

    let artifact = service.export(
        &admin,
        KindScope::All,
        &VerificationFilter::default(),
        ExportFormat::Csv,
    )?;
    render_export_preview(&artifact);
    Ok(())
}

fn seed_demo_roster(service: &PortalService, admin: &Principal) -> Result<(), AppError> {
    let mut tenant_types = TENANT_TYPES.iter().copied().cycle();

    for (kind, id, first, last, email, phone, status) in DEMO_ROSTER {
        let verification_type = if kind == ApplicantKind::Tenant {
            tenant_types.next()
        } else {
            None
        };
        service.register(
            admin,
            kind,
            NewApplicant {
                id: ApplicantId::from(id),
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                verification_type,
            },
        )?;

        if status != VerificationStatus::Pending {
            service.transition(
                admin,
                kind,
                &ApplicantId::from(id),
                status.label(),
                Some("demo roster".to_string()),
            )?;
        }
    }

    Ok(())
}

fn print_stats_header() {
    println!(
        "{:<10} {:>6} {:>8} {:>7} {:>9} {:>9} {:>5}",
        "kind", "total", "pending", "review", "verified", "rejected", "rate"
    );
}

fn print_stats_row(label: &str, rated: &RatedSummary) {
    let summary = &rated.summary;
    println!(
        "{:<10} {:>6} {:>8} {:>7} {:>9} {:>9} {:>4}%",
        label,
        summary.total,
        summary.pending,
        summary.under_review,
        summary.verified,
        summary.rejected,
        rated.verification_rate
    );
}

fn render_stats_report(report: &VerificationStatsReport) {
    println!("Verification summary");
    print_stats_header();
    for kind in ApplicantKind::ordered() {
        print_stats_row(kind.label(), report.for_kind(kind));
    }
    print_stats_row("combined", &report.combined);
}

fn render_export_preview(artifact: &ExportArtifact) {
    println!(
        "\nExport {} ({} rows, {})",
        artifact.filename,
        artifact.row_count,
        artifact.content_type()
    );
    for line in String::from_utf8_lossy(&artifact.bytes).lines().take(4) {
        println!("  {line}");
    }
    if artifact.row_count > 3 {
        println!("  ...");
    }
}
