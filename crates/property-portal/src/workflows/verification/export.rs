use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use tracing::info;

use super::domain::{ApplicantKind, ApplicantProfile, KindScope};
use super::error::{ValidationError, VerificationError};
use super::query::{PageRequest, SortSpec, VerificationFilter, VerificationQueryEngine};
use super::store::ApplicantStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> mime::Mime {
        match self {
            ExportFormat::Csv => mime::TEXT_CSV_UTF_8,
            ExportFormat::Json => mime::APPLICATION_JSON,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ValidationError::UnsupportedFormat(raw.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV export: {0}")]
    Flush(#[from] std::io::Error),
    #[error("failed to encode JSON export: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fully rendered export. Only produced when every row was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub format: ExportFormat,
    pub row_count: usize,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn content_type(&self) -> mime::Mime {
        self.format.content_type()
    }
}

/// `<kind>-verification-<YYYY-MM-DD>.<ext>`
pub fn export_filename(scope: KindScope, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{}-verification-{}.{}",
        scope.label(),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportColumn {
    Id,
    Kind,
    FirstName,
    LastName,
    Email,
    Phone,
    Status,
    Type,
    CreatedAt,
    VerifiedAt,
}

impl ExportColumn {
    const fn header(self) -> &'static str {
        match self {
            ExportColumn::Id => "id",
            ExportColumn::Kind => "kind",
            ExportColumn::FirstName => "first_name",
            ExportColumn::LastName => "last_name",
            ExportColumn::Email => "email",
            ExportColumn::Phone => "phone",
            ExportColumn::Status => "status",
            ExportColumn::Type => "type",
            ExportColumn::CreatedAt => "created_at",
            ExportColumn::VerifiedAt => "verified_at",
        }
    }

    fn value(self, profile: &ApplicantProfile) -> String {
        match self {
            ExportColumn::Id => profile.id.0.clone(),
            ExportColumn::Kind => profile.kind.label().to_string(),
            ExportColumn::FirstName => profile.first_name.clone(),
            ExportColumn::LastName => profile.last_name.clone(),
            ExportColumn::Email => profile.email.clone(),
            ExportColumn::Phone => profile.phone.clone(),
            ExportColumn::Status => profile.verification_status().label().to_string(),
            ExportColumn::Type => profile
                .verification_type
                .map(|kind| kind.label().to_string())
                .unwrap_or_default(),
            ExportColumn::CreatedAt => profile.created_at.to_rfc3339(),
            ExportColumn::VerifiedAt => profile
                .verified_at()
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

/// Column set is fixed per scope: `type` only appears where tenants can be present and `kind`
/// only on cross-kind exports.
fn columns_for(scope: KindScope) -> Vec<ExportColumn> {
    let mut columns = vec![ExportColumn::Id];
    if scope == KindScope::All {
        columns.push(ExportColumn::Kind);
    }
    columns.extend([
        ExportColumn::FirstName,
        ExportColumn::LastName,
        ExportColumn::Email,
        ExportColumn::Phone,
        ExportColumn::Status,
    ]);
    if matches!(scope, KindScope::All | KindScope::Kind(ApplicantKind::Tenant)) {
        columns.push(ExportColumn::Type);
    }
    columns.extend([ExportColumn::CreatedAt, ExportColumn::VerifiedAt]);
    columns
}

/// Serializes the same row set an unbounded interactive query returns.
pub struct ExportGenerator<S> {
    query: VerificationQueryEngine<S>,
}

impl<S> ExportGenerator<S>
where
    S: ApplicantStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            query: VerificationQueryEngine::new(store),
        }
    }

    pub fn export(
        &self,
        scope: KindScope,
        filter: &VerificationFilter,
        format: ExportFormat,
    ) -> Result<ExportArtifact, VerificationError> {
        self.export_on(scope, filter, format, Utc::now().date_naive())
    }

    pub fn export_on(
        &self,
        scope: KindScope,
        filter: &VerificationFilter,
        format: ExportFormat,
        date: NaiveDate,
    ) -> Result<ExportArtifact, VerificationError> {
        let page = self
            .query
            .query(scope, filter, SortSpec::default(), PageRequest::unbounded())?;
        let columns = columns_for(scope);

        let bytes = match format {
            ExportFormat::Csv => render_csv(&columns, &page.items)?,
            ExportFormat::Json => render_json(&columns, &page.items)?,
        };

        let artifact = ExportArtifact {
            filename: export_filename(scope, format, date),
            format,
            row_count: page.total_count,
            bytes,
        };

        info!(
            scope = scope.label(),
            format = format.extension(),
            rows = artifact.row_count,
            filename = %artifact.filename,
            "verification export rendered"
        );

        Ok(artifact)
    }
}

fn render_csv(
    columns: &[ExportColumn],
    rows: &[ApplicantProfile],
) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter().map(|column| column.header()))?;
    for profile in rows {
        writer.write_record(columns.iter().map(|column| column.value(profile)))?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.into_error()))
}

fn render_json(
    columns: &[ExportColumn],
    rows: &[ApplicantProfile],
) -> Result<Vec<u8>, ExportError> {
    let records: Vec<Value> = rows
        .iter()
        .map(|profile| {
            let record: Map<String, Value> = columns
                .iter()
                .map(|column| {
                    (
                        column.header().to_string(),
                        Value::String(column.value(profile)),
                    )
                })
                .collect();
            Value::Object(record)
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&records)?)
}
