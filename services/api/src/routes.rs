use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use property_portal::workflows::verification::{
    verification_router, ApplicantStore, VerificationService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_verification_routes<S>(service: Arc<VerificationService<S>>) -> axum::Router
where
    S: ApplicantStore + 'static,
{
    verification_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use property_portal::workflows::verification::{AuthorizationGate, InMemoryApplicantStore};
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let gate = AuthorizationGate::standard().expect("standard grants");
        let service = VerificationService::new(
            Arc::new(InMemoryApplicantStore::default()),
            Arc::new(gate),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_verification_routes(Arc::new(service)).layer(Extension(state))
    }

    async fn status_of(router: axum::Router, uri: &str) -> StatusCode {
        router
            .oneshot(
                Request::get(uri)
                    .header("x-actor-id", "ops-1")
                    .header("x-actor-role", "system_admin")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes")
            .status()
    }

    #[tokio::test]
    async fn readiness_reflects_startup_flag() {
        assert_eq!(
            status_of(app(false), "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_of(app(true), "/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_and_verification_routes_share_one_router() {
        assert_eq!(status_of(app(true), "/health").await, StatusCode::OK);
        assert_eq!(
            status_of(app(true), "/api/v1/verification/all").await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(app(true), "/api/v1/verification/stats").await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn metrics_are_exposed_as_prometheus_text() {
        let response = app(true)
            .oneshot(
                Request::get("/metrics")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
