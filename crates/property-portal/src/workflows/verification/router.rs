use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::authorization::Principal;
use super::domain::{ActorId, ApplicantId, ApplicantKind, KindScope, NewApplicant};
use super::error::{ValidationError, VerificationError};
use super::export::{ExportArtifact, ExportFormat};
use super::query::{QueryPage, SortField, SortOrder, SortSpec, VerificationFilter};
use super::service::VerificationService;
use super::store::ApplicantStore;

pub(crate) const ACTOR_ID_HEADER: &str = "x-actor-id";
pub(crate) const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Router builder exposing verification listing, moderation, export, and stats endpoints.
pub fn verification_router<S>(service: Arc<VerificationService<S>>) -> Router
where
    S: ApplicantStore + 'static,
{
    Router::new()
        .route("/api/v1/verification/stats", get(stats_handler::<S>))
        .route("/api/v1/verification/stats/:kind", get(kind_stats_handler::<S>))
        .route(
            "/api/v1/verification/:kind",
            get(list_handler::<S>).post(register_handler::<S>),
        )
        .route("/api/v1/verification/:kind/export", get(export_handler::<S>))
        .route("/api/v1/verification/:kind/bulk", post(bulk_handler::<S>))
        .route("/api/v1/verification/:kind/:id", get(detail_handler::<S>))
        .route(
            "/api/v1/verification/:kind/:id/status",
            put(transition_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListParams {
    pub(crate) status: Option<String>,
    pub(crate) search: Option<String>,
    pub(crate) page: Option<usize>,
    pub(crate) page_size: Option<usize>,
    pub(crate) sort_by: Option<String>,
    pub(crate) sort_order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportParams {
    pub(crate) status: Option<String>,
    pub(crate) search: Option<String>,
    pub(crate) format: Option<String>,
}

/// `status` is taken as any JSON value so that a missing or non-string status is reported as
/// `invalid_status` by the state machine rather than as a body decoding failure.
#[derive(Debug, Deserialize)]
pub(crate) struct TransitionBody {
    #[serde(default)]
    pub(crate) status: Value,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkTransitionBody {
    pub(crate) ids: Vec<ApplicantId>,
    #[serde(default)]
    pub(crate) status: Value,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

fn status_text(status: &Value) -> String {
    match status {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<VerificationService<S>>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Response
where
    S: ApplicantStore + 'static,
{
    let principal = match principal_from_headers(&service, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    match run_query(&service, &principal, &kind, params) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn detail_handler<S>(
    State(service): State<Arc<VerificationService<S>>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicantStore + 'static,
{
    let principal = match principal_from_headers(&service, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let result = kind
        .parse::<ApplicantKind>()
        .map_err(VerificationError::from)
        .and_then(|kind| service.get(&principal, kind, &ApplicantId(id)));

    match result {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn register_handler<S>(
    State(service): State<Arc<VerificationService<S>>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    applicant: Result<Json<NewApplicant>, JsonRejection>,
) -> Response
where
    S: ApplicantStore + 'static,
{
    let principal = match principal_from_headers(&service, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let Json(applicant) = match applicant {
        Ok(applicant) => applicant,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    let result = kind
        .parse::<ApplicantKind>()
        .map_err(VerificationError::from)
        .and_then(|kind| service.register(&principal, kind, applicant));

    match result {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<S>(
    State(service): State<Arc<VerificationService<S>>>,
    Path((kind, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Json<TransitionBody>, JsonRejection>,
) -> Response
where
    S: ApplicantStore + 'static,
{
    let principal = match principal_from_headers(&service, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    let result = kind
        .parse::<ApplicantKind>()
        .map_err(VerificationError::from)
        .and_then(|kind| {
            let status = status_text(&body.status);
            service.transition(&principal, kind, &ApplicantId(id), &status, body.notes)
        });

    match result {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn bulk_handler<S>(
    State(service): State<Arc<VerificationService<S>>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    body: Result<Json<BulkTransitionBody>, JsonRejection>,
) -> Response
where
    S: ApplicantStore + 'static,
{
    let principal = match principal_from_headers(&service, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    let result = kind
        .parse::<ApplicantKind>()
        .map_err(VerificationError::from)
        .and_then(|kind| {
            let status = status_text(&body.status);
            service.bulk_transition(&principal, kind, &body.ids, &status, body.notes)
        });

    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn export_handler<S>(
    State(service): State<Arc<VerificationService<S>>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    params: Result<Query<ExportParams>, QueryRejection>,
) -> Response
where
    S: ApplicantStore + 'static,
{
    let principal = match principal_from_headers(&service, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    match run_export(&service, &principal, &kind, params) {
        Ok(artifact) => {
            let disposition = format!("attachment; filename=\"{}\"", artifact.filename);
            let content_type = artifact.content_type().to_string();
            let mut response = (StatusCode::OK, artifact.bytes).into_response();
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&content_type) {
                headers.insert(header::CONTENT_TYPE, value);
            }
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
            response
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stats_handler<S>(
    State(service): State<Arc<VerificationService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicantStore + 'static,
{
    let principal = match principal_from_headers(&service, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    match service.stats(&principal) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn kind_stats_handler<S>(
    State(service): State<Arc<VerificationService<S>>>,
    Path(kind): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ApplicantStore + 'static,
{
    let principal = match principal_from_headers(&service, &headers) {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let result = kind
        .parse::<KindScope>()
        .map_err(VerificationError::from)
        .and_then(|scope| match scope {
            KindScope::All => service.stats(&principal).map(|report| json!(report)),
            KindScope::Kind(kind) => service
                .stats_for(&principal, kind)
                .map(|summary| json!(summary)),
        });

    match result {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Authentication happens upstream; the transport forwards the actor and role it verified.
fn principal_from_headers<S>(
    service: &VerificationService<S>,
    headers: &HeaderMap,
) -> Result<Principal, Response>
where
    S: ApplicantStore + 'static,
{
    let header_text = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    match (header_text(ACTOR_ID_HEADER), header_text(ACTOR_ROLE_HEADER)) {
        (Some(actor_id), Some(role)) => Ok(service
            .gate()
            .principal(ActorId(actor_id.to_string()), role)),
        _ => {
            let payload = json!({
                "error": format!("{ACTOR_ID_HEADER} and {ACTOR_ROLE_HEADER} headers are required"),
                "code": "unauthenticated",
            });
            Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response())
        }
    }
}

fn run_query<S>(
    service: &VerificationService<S>,
    principal: &Principal,
    kind: &str,
    params: ListParams,
) -> Result<QueryPage, VerificationError>
where
    S: ApplicantStore + 'static,
{
    let scope: KindScope = kind.parse()?;
    let filter = filter_from(params.status.as_deref(), params.search)?;
    let sort = sort_from(params.sort_by.as_deref(), params.sort_order.as_deref())?;
    let page = service
        .limits()
        .page_request(params.page, params.page_size);
    service.query(principal, scope, &filter, sort, page)
}

fn run_export<S>(
    service: &VerificationService<S>,
    principal: &Principal,
    kind: &str,
    params: ExportParams,
) -> Result<ExportArtifact, VerificationError>
where
    S: ApplicantStore + 'static,
{
    let scope: KindScope = kind.parse()?;
    let filter = filter_from(params.status.as_deref(), params.search)?;
    let format = match params.format.as_deref() {
        Some(raw) => raw.parse()?,
        None => ExportFormat::default(),
    };
    service.export(principal, scope, &filter, format)
}

fn filter_from(
    status: Option<&str>,
    search: Option<String>,
) -> Result<VerificationFilter, ValidationError> {
    let status = status
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(str::parse)
        .transpose()?;
    Ok(VerificationFilter {
        status,
        search_text: search,
    })
}

fn sort_from(
    sort_by: Option<&str>,
    sort_order: Option<&str>,
) -> Result<SortSpec, ValidationError> {
    let field = sort_by
        .map(str::parse::<SortField>)
        .transpose()?
        .unwrap_or_default();
    let order = sort_order
        .map(str::parse::<SortOrder>)
        .transpose()?
        .unwrap_or_default();
    Ok(SortSpec { field, order })
}

/// Extractor rejections use the same `{error, code}` envelope as domain errors.
fn malformed(message: String) -> Response {
    error_response(ValidationError::MalformedRequest(message).into())
}

pub(crate) fn error_response(err: VerificationError) -> Response {
    let status = match &err {
        VerificationError::NotFound { .. } => StatusCode::NOT_FOUND,
        VerificationError::Validation(ValidationError::UnknownPermission(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        VerificationError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VerificationError::Conflict { .. } => StatusCode::CONFLICT,
        VerificationError::Forbidden { .. } => StatusCode::FORBIDDEN,
        VerificationError::Store(_) | VerificationError::Export(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": err.to_string(),
        "code": err.code(),
    });
    (status, Json(payload)).into_response()
}
